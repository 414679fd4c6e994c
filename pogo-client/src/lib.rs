#![deny(missing_docs, clippy::unwrap_used)]
//! Async client for the batch RPC protocol of a location-based mobile game.
//!
//! The library impersonates a phone client well enough to issue
//! authenticated, signed batch RPCs from a server, and is designed for many
//! concurrent logical clients running as tasks on one runtime. The pipeline
//! for every [`Client::call`]:
//!
//! 1. Compose a request envelope from the caller's [`Subrequest`] list.
//! 2. Attach the cached session [`auth::Ticket`] or, on cold starts, a
//!    bearer token from the [`auth::AuthProvider`].
//! 3. Ask the remote [`HashServer`] for the three request hashes
//!    (rate-limited, quota-managed, multi-key).
//! 4. Synthesize a plausible sensor/location signal log, encrypt it through
//!    the caller-supplied [`SignalEncryptor`], and attach it as a platform
//!    request.
//! 5. POST through the shared connection pools (optionally via an HTTP or
//!    SOCKS proxy) and demultiplex the typed response envelope.
//!
//! Token expiry (status 102) and endpoint redirects (status 53) are
//! recovered once per call; every other protocol condition surfaces as an
//! [`Error`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::instrument;

pub mod auth;
mod clock;
pub mod error;
pub mod hash_server;
mod rpc;
mod sample;
mod session;
mod signal;
mod state;

pub use error::{AuthError, Error, HashError};
pub use hash_server::{DEFAULT_HASH_ENDPOINT, HashInput, HashServer, Hashes, KeyStatus};
pub use pogo_types::registry::ArgMap;
pub use pogo_types::requests::RequestType;
pub use pogo_types::responses::ResponseMessage;
pub use rpc::{CallResponse, Position, Subrequest};
pub use session::ProxyConfig;
pub use state::RpcState;

use auth::AuthProvider;
use session::SessionManager;

/// Default RPC endpoint; replaced on the fly by status-53 redirects.
pub const DEFAULT_API_ENDPOINT: &str = "https://pgorelease.nianticlabs.com/plfe/rpc";

/// Cipher revision passed to the [`SignalEncryptor`].
const ENCRYPT_VERSION: u8 = 3;

/// Device identity profile copied verbatim into the signal log.
pub type DeviceProfile = std::collections::HashMap<String, String>;

/// External collaborator that encrypts serialized signal logs.
///
/// The protocol cipher itself is out of scope for this crate; callers
/// provide an implementation of `encrypt(plain, timestamp_ms, version)`.
pub trait SignalEncryptor: Send + Sync {
    /// Encrypts `plain` keyed on the signal's `timestamp_ms_since_start`.
    fn encrypt(&self, plain: &[u8], timestamp_ms: u64, version: u8) -> Vec<u8>;
}

/// One logical game client.
///
/// Cheap to share behind an [`Arc`]; all mutable state lives in interior
/// cells, and concurrent `call`s are safe.
pub struct Client {
    endpoint: Mutex<String>,
    position: Mutex<Option<Position>>,
    rpc: rpc::RpcApi,
}

impl Client {
    /// Starts building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sets the player position used by subsequent calls.
    pub fn set_position(&self, latitude: f64, longitude: f64, altitude: Option<f64>) {
        tracing::debug!("set position lat: {latitude} lon: {longitude} alt: {altitude:?}");
        *self.position.lock() = Some(Position {
            latitude,
            longitude,
            altitude,
        });
    }

    /// The current player position.
    pub fn position(&self) -> Option<Position> {
        *self.position.lock()
    }

    /// The current RPC endpoint.
    pub fn endpoint(&self) -> String {
        self.endpoint.lock().clone()
    }

    /// Replaces the RPC endpoint; bare `host/path` targets get a scheme.
    pub fn set_endpoint(&self, api_url: &str) {
        *self.endpoint.lock() = parse_api_endpoint(api_url);
    }

    /// The per-client RPC state.
    pub fn state(&self) -> &RpcState {
        &self.rpc.state
    }

    /// The configured auth provider.
    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.rpc.auth
    }

    /// The hash oracle client (useful for quota introspection).
    pub fn hash_server(&self) -> &Arc<HashServer> {
        &self.rpc.hash
    }

    /// Issues one batch call.
    ///
    /// Recovers locally from a single token rejection and a single
    /// endpoint redirect; a second occurrence of either propagates to
    /// avoid livelock.
    #[instrument(level = "debug", skip_all)]
    pub async fn call(&self, subrequests: &[Subrequest]) -> Result<CallResponse, Error> {
        let position = (*self.position.lock()).ok_or(Error::NoPlayerPosition)?;
        let mut refreshed = false;
        let mut redirected = false;
        loop {
            let endpoint = self.endpoint.lock().clone();
            match self.rpc.request(&endpoint, subrequests, position).await {
                Err(Error::AuthTokenExpired) if !refreshed => {
                    tracing::info!("access token rejected, requesting a new one");
                    refreshed = true;
                    self.rpc.auth.access_token(true).await?;
                }
                Err(Error::Redirect(api_url)) if !redirected => {
                    tracing::debug!("API endpoint redirect, re-executing call");
                    redirected = true;
                    self.set_endpoint(&api_url);
                }
                other => return other,
            }
        }
    }
}

/// Normalizes a redirect target into a full endpoint URL.
fn parse_api_endpoint(api_url: &str) -> String {
    if api_url.starts_with("http") {
        api_url.to_owned()
    } else {
        format!("https://{api_url}")
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    auth: Option<Arc<dyn AuthProvider>>,
    encryptor: Option<Arc<dyn SignalEncryptor>>,
    hash_keys: Vec<String>,
    hash_endpoint: String,
    endpoint: String,
    conn_limit: usize,
    proxy: Option<ProxyConfig>,
    device_info: Option<DeviceProfile>,
    position: Option<Position>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a builder with production endpoints and no credentials.
    pub fn new() -> Self {
        Self {
            auth: None,
            encryptor: None,
            hash_keys: Vec::new(),
            hash_endpoint: DEFAULT_HASH_ENDPOINT.to_owned(),
            endpoint: DEFAULT_API_ENDPOINT.to_owned(),
            conn_limit: hash_server::DEFAULT_CONN_LIMIT,
            proxy: None,
            device_info: None,
            position: None,
        }
    }

    /// The auth provider to authenticate with. Required.
    pub fn auth(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    /// The signal-log cipher. Required.
    pub fn encryptor(mut self, encryptor: Arc<dyn SignalEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Adds one hash key.
    pub fn hash_key(mut self, key: impl Into<String>) -> Self {
        self.hash_keys.push(key.into());
        self
    }

    /// Adds several hash keys, enabling rotation.
    pub fn hash_keys(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.hash_keys.extend(keys);
        self
    }

    /// Overrides the hashing endpoint (the version path tracks protocol
    /// revisions).
    pub fn hash_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.hash_endpoint = endpoint.into();
        self
    }

    /// Overrides the RPC endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Caps concurrent hashing connections.
    pub fn conn_limit(mut self, limit: usize) -> Self {
        self.conn_limit = limit;
        self
    }

    /// Routes all outbound HTTP through a proxy.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Device identity copied verbatim into every signal log.
    pub fn device_info(mut self, profile: DeviceProfile) -> Self {
        self.device_info = Some(profile);
        self
    }

    /// Initial player position.
    pub fn position(mut self, latitude: f64, longitude: f64, altitude: Option<f64>) -> Self {
        self.position = Some(Position {
            latitude,
            longitude,
            altitude,
        });
        self
    }

    /// Builds the client.
    ///
    /// # Panics
    ///
    /// If no auth provider or no encryptor was configured; both are
    /// programming errors, not runtime conditions.
    pub fn build(self) -> Result<Client, Error> {
        let Some(auth) = self.auth else {
            panic!("an auth provider is required");
        };
        let Some(encryptor) = self.encryptor else {
            panic!("a signal encryptor is required");
        };
        let sessions = SessionManager::new();
        let rpc_session = sessions
            .rpc(self.proxy.as_ref())
            .map_err(|err| Error::UnexpectedResponse(err.to_string()))?;
        let hash_session = sessions
            .hash(self.proxy.as_ref(), self.conn_limit)
            .map_err(|err| Error::UnexpectedResponse(err.to_string()))?;
        let hash = HashServer::with_session(self.hash_keys, self.hash_endpoint, hash_session)?;
        Ok(Client {
            endpoint: Mutex::new(parse_api_endpoint(&self.endpoint)),
            position: Mutex::new(self.position),
            rpc: rpc::RpcApi {
                session: rpc_session,
                auth,
                state: Arc::new(RpcState::new()),
                hash: Arc::new(hash),
                encryptor,
                device_info: self.device_info,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalization() {
        assert_eq!(
            parse_api_endpoint("foo.example/rpc"),
            "https://foo.example/rpc"
        );
        assert_eq!(
            parse_api_endpoint("https://bar.example/plfe/rpc"),
            "https://bar.example/plfe/rpc"
        );
        assert_eq!(
            parse_api_endpoint("http://127.0.0.1:8080/rpc"),
            "http://127.0.0.1:8080/rpc"
        );
    }
}
