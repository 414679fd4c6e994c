//! Error taxonomy of the RPC pipeline.
//!
//! Three shallow enums: [`Error`] for everything `call()` can surface,
//! [`AuthError`] for the auth providers, and [`HashError`] for the hash
//! oracle client. Protocol conditions the engine recovers from locally
//! (a single token refresh, a single endpoint redirect) only surface when
//! recovery is exhausted.

/// Errors returned by the RPC pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `call()` was issued without latitude/longitude set.
    #[error("no player position set")]
    NoPlayerPosition,
    /// Proxy connection failure during an RPC request.
    #[error("proxy connection error during RPC request: {0}")]
    Proxy(String),
    /// The RPC endpoint is unreachable or returned a server error.
    #[error("API server unavailable: {0}")]
    NianticOffline(String),
    /// The RPC request timed out.
    #[error("RPC request timed out")]
    NianticTimeout,
    /// HTTP 403 from the RPC endpoint.
    #[error("IP address appears to be banned by the API server")]
    NianticIpBanned,
    /// HTTP 400 from the RPC endpoint.
    #[error("400: bad RPC request")]
    BadRequest,
    /// Protocol status 3.
    #[error("bad RPC on {0} request")]
    BadRpc(&'static str),
    /// Protocol statuses 52 (invalid platform request) and 100 (session
    /// invalidated).
    #[error("invalid RPC on {0} request")]
    InvalidRpc(&'static str),
    /// Unknown protocol status code.
    #[error("unexpected RPC status code {0}")]
    Unexpected(i32),
    /// Unknown HTTP status or transport oddity from the RPC endpoint.
    #[error("unexpected RPC response: {0}")]
    UnexpectedResponse(String),
    /// The response body was empty or failed to decode.
    #[error("malformed RPC response: {0}")]
    MalformedResponse(String),
    /// Protocol status 102, observed after the one allowed refresh.
    #[error("access token rejected by the API server")]
    AuthTokenExpired,
    /// Protocol status 53, observed after the one allowed redirect.
    /// Carries the replacement endpoint.
    #[error("API endpoint redirected to {0}")]
    Redirect(String),
    /// Auth provider failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Hash oracle failure.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Errors returned by the auth providers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Username or password missing/empty.
    #[error("username/password not correctly specified")]
    InvalidCredentials,
    /// The account still needs email verification.
    #[error("account email not verified")]
    ActivationRequired,
    /// Login rejected or response undecipherable.
    #[error("auth failed: {0}")]
    Auth(String),
    /// Connection-level failure while talking to the provider.
    #[error("connection error during auth: {0}")]
    Connection(String),
    /// The auth request timed out.
    #[error("auth request timed out")]
    Timeout,
    /// The provider reported an unexpected internal error.
    #[error("unexpected auth error: {0}")]
    Unexpected(String),
}

/// Errors returned by the hash oracle client.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// No hash key was configured.
    #[error("no hash key provided")]
    NoKey,
    /// HTTP 400 from the hashing service, below the expiry threshold.
    #[error("bad hash request: {0}")]
    BadRequest(String),
    /// The (last remaining) key is considered expired by the service.
    #[error("hash key appears to have expired: {0}")]
    ExpiredKey(String),
    /// HTTP 403: the IP is temporarily banned for invalid-key traffic.
    #[error("IP temporarily banned by the hashing service")]
    TempBan,
    /// HTTP 429 on a single-key setup.
    #[error("hashing quota exceeded")]
    QuotaExceeded,
    /// The hashing service is unreachable or erroring.
    #[error("hashing service unavailable: {0}")]
    Offline(String),
    /// The hashing request timed out after retries.
    #[error("hashing request timed out")]
    Timeout,
    /// The response JSON did not parse or carried out-of-range values.
    #[error("malformed hash response: {0}")]
    Malformed(String),
    /// Unhandled HTTP status from the hashing service.
    #[error("unexpected hash response: {0}")]
    Unexpected(String),
}
