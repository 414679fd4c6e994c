//! Request and response envelopes.
//!
//! One envelope carries one batch RPC: an ordered list of subrequests plus
//! either a session ticket or an OAuth auth block, and the platform
//! extensions (type 6: encrypted signal log, type 8: opaque state echo).

use prost::Message;

/// Top-level message POSTed to the RPC endpoint.
#[derive(Clone, PartialEq, Message)]
pub struct RequestEnvelope {
    /// Always 2 for client-initiated requests.
    #[prost(int32, tag = "1")]
    pub status_code: i32,
    /// `(lehmer << 32) | counter`; the low half must be monotone.
    #[prost(uint64, tag = "3")]
    pub request_id: u64,
    /// Subrequests, in caller order.
    #[prost(message, repeated, tag = "4")]
    pub requests: Vec<Request>,
    /// Platform extensions (types 6 and 8).
    #[prost(message, repeated, tag = "6")]
    pub platform_requests: Vec<PlatformRequest>,
    /// Player latitude in degrees.
    #[prost(double, tag = "7")]
    pub latitude: f64,
    /// Player longitude in degrees.
    #[prost(double, tag = "8")]
    pub longitude: f64,
    /// Reported horizontal accuracy in meters.
    #[prost(double, tag = "9")]
    pub accuracy: f64,
    /// OAuth auth block; present iff no valid session ticket is held.
    #[prost(message, optional, tag = "10")]
    pub auth_info: Option<AuthInfo>,
    /// Session ticket; present iff one is held and still valid.
    #[prost(message, optional, tag = "11")]
    pub auth_ticket: Option<AuthTicket>,
    /// Milliseconds between the reported location fix and now.
    #[prost(int64, tag = "12")]
    pub ms_since_last_locationfix: i64,
}

/// One typed operation inside an envelope.
#[derive(Clone, PartialEq, Message)]
pub struct Request {
    /// Numeric tag from [`crate::requests::RequestType`].
    #[prost(int32, tag = "1")]
    pub request_type: i32,
    /// Serialized `<type>_message` payload; empty for bare requests.
    #[prost(bytes = "vec", tag = "2")]
    pub request_message: Vec<u8>,
}

/// A platform extension attached to a request envelope.
#[derive(Clone, PartialEq, Message)]
pub struct PlatformRequest {
    /// Extension type (6: encrypted signature, 8: state echo).
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    /// Serialized extension payload.
    #[prost(bytes = "vec", tag = "2")]
    pub request_message: Vec<u8>,
}

/// OAuth bearer-token auth block.
#[derive(Clone, PartialEq, Message)]
pub struct AuthInfo {
    /// Identity provider tag (`"ptc"` or `"google"`).
    #[prost(string, tag = "1")]
    pub provider: String,
    /// The bearer token itself.
    #[prost(message, optional, tag = "2")]
    pub token: Option<Jwt>,
}

/// Bearer token wrapper inside [`AuthInfo`].
#[derive(Clone, PartialEq, Message)]
pub struct Jwt {
    /// Access-token contents as returned by the provider.
    #[prost(string, tag = "1")]
    pub contents: String,
    /// Undeciphered client constant; drawn from a fixed weighted set.
    #[prost(int32, tag = "2")]
    pub unknown2: i32,
}

/// Server-issued rolling session ticket.
#[derive(Clone, PartialEq, Message)]
pub struct AuthTicket {
    /// Opaque ticket prefix.
    #[prost(bytes = "vec", tag = "1")]
    pub start: Vec<u8>,
    /// Opaque ticket suffix.
    #[prost(bytes = "vec", tag = "2")]
    pub end: Vec<u8>,
    /// Expiry as epoch milliseconds.
    #[prost(uint64, tag = "3")]
    pub expire_timestamp_ms: u64,
}

/// Top-level message returned by the RPC endpoint.
#[derive(Clone, PartialEq, Message)]
pub struct ResponseEnvelope {
    /// Protocol status code; see the engine's state machine.
    #[prost(int32, tag = "1")]
    pub status_code: i32,
    /// Echo of the request id.
    #[prost(uint64, tag = "2")]
    pub request_id: u64,
    /// Replacement endpoint, set with status 53.
    #[prost(string, tag = "3")]
    pub api_url: String,
    /// Platform extension returns, mirroring `platform_requests`.
    #[prost(message, repeated, tag = "6")]
    pub platform_returns: Vec<PlatformReturn>,
    /// Fresh session ticket, when the server rolls one.
    #[prost(message, optional, tag = "7")]
    pub auth_ticket: Option<AuthTicket>,
    /// Serialized `<type>_response` payloads, one per subrequest.
    #[prost(bytes = "vec", repeated, tag = "100")]
    pub returns: Vec<Vec<u8>>,
    /// Human-readable error carried by some failure statuses.
    #[prost(string, tag = "101")]
    pub error: String,
}

/// A platform extension return inside a response envelope.
#[derive(Clone, PartialEq, Message)]
pub struct PlatformReturn {
    /// Extension type this entry answers.
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    /// Serialized extension response.
    #[prost(bytes = "vec", tag = "2")]
    pub response: Vec<u8>,
}

/// Body of a type-6 platform request.
#[derive(Clone, PartialEq, Message)]
pub struct SendEncryptedSignatureRequest {
    /// The encrypted, serialized [`crate::SignalLog`].
    #[prost(bytes = "vec", tag = "2")]
    pub encrypted_signature: Vec<u8>,
}

/// Body of a type-8 platform request: echoes whatever the server last sent.
#[derive(Clone, PartialEq, Message)]
pub struct PlatEightRequest {
    /// Last server-provided state blob, unset on the first probe.
    #[prost(string, optional, tag = "1")]
    pub field1: Option<String>,
}

/// Body of a type-8 platform return.
#[derive(Clone, PartialEq, Message)]
pub struct PlatEightResponse {
    /// Opaque state blob to cache and echo on later probes.
    #[prost(string, tag = "1")]
    pub message: String,
}
