#![deny(missing_docs)]
//! Wire-message types for the batch RPC protocol.
//!
//! This crate groups the strongly-typed protobuf messages exchanged with the
//! game servers, vendored from the upstream schema as hand-maintained
//! [`prost`] structs:
//!
//! * The request/response envelopes and their auth blocks (see
//!   [`envelopes`]).
//! * The sensor/location signal log attached to every request as an
//!   encrypted platform extension (see [`signal`]).
//! * The subrequest catalogue: the [`requests::RequestType`] enum, the
//!   per-type message payloads, and their responses (see [`requests`] and
//!   [`responses`]).
//! * A type table mapping a request tag to its payload builder and response
//!   parser, in place of runtime by-name descriptor lookup (see
//!   [`registry`]).
//!
//! Only the subset of the upstream schema that the client pipeline touches
//! is vendored; everything decodes permissively, so unknown payloads are
//! surfaced as raw bytes rather than errors.

pub mod envelopes;
pub mod registry;
pub mod requests;
pub mod responses;
pub mod signal;

pub use envelopes::{RequestEnvelope, ResponseEnvelope};
pub use requests::RequestType;
pub use signal::SignalLog;
