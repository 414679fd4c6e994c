//! Client for the remote hashing service.
//!
//! The service is a paid, rate-limited oracle: given a canonical request
//! fingerprint it returns the three hashes the signal log must carry. Keys
//! come with a per-period quota; this client rotates through a ring of
//! keys, evicts keys the service reports as expired, and sleeps out quota
//! windows only when every key is exhausted.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::clock;
use crate::error::HashError;
use crate::session::{HttpSession, ProxyConfig, SessionManager, TransportError};

/// Default hashing endpoint; the version path tracks the protocol revision.
pub const DEFAULT_HASH_ENDPOINT: &str = "https://pokehash.buddyauth.com/api/v127_4/hash";

/// Default cap on concurrent hashing connections.
pub const DEFAULT_CONN_LIMIT: usize = 300;

const IO_RETRIES: u32 = 2;
const IO_BACKOFF: Duration = Duration::from_millis(1500);
const BAD_REQUEST_RETRIES: u32 = 2;
const KEY_EXPIRY_FAILURES: u32 = 10;
const LOW_QUOTA: u32 = 3;

/// Quota bookkeeping for one hash key, harvested from response headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyStatus {
    /// Requests left in the current period.
    pub remaining: u32,
    /// End of the current period, epoch seconds.
    pub period_end: u64,
    /// Requests allowed per period.
    pub maximum: u32,
    /// Key expiry, epoch seconds.
    pub expiration: u64,
    /// Consecutive 400s observed on this key.
    pub failures: u32,
}

struct KeyEntry {
    token: String,
    status: KeyStatus,
}

struct KeyRing {
    entries: Vec<KeyEntry>,
    cursor: usize,
}

impl KeyRing {
    fn multi(&self) -> bool {
        self.entries.len() > 1
    }

    fn advance(&mut self) {
        if !self.entries.is_empty() {
            self.cursor = (self.cursor + 1) % self.entries.len();
        }
    }

    fn find(&mut self, token: &str) -> Option<&mut KeyEntry> {
        self.entries.iter_mut().find(|entry| entry.token == token)
    }

    fn evict(&mut self, token: &str) {
        self.entries.retain(|entry| entry.token != token);
        if !self.entries.is_empty() {
            self.cursor %= self.entries.len();
        }
    }
}

/// Hash oracle inputs for one envelope.
pub struct HashInput<'a> {
    /// Envelope timestamp, epoch milliseconds.
    pub timestamp_ms: u64,
    /// Envelope latitude.
    pub latitude: f64,
    /// Envelope longitude.
    pub longitude: f64,
    /// Envelope accuracy.
    pub accuracy: f64,
    /// Serialized auth block (ticket or auth-info).
    pub auth_ticket: &'a [u8],
    /// Per-session 16-byte hash.
    pub session_hash: &'a [u8],
    /// Serialized subrequests, in envelope order.
    pub requests: &'a [Vec<u8>],
}

/// The three hashes returned by the oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hashes {
    /// Location hash seeded by the auth ticket.
    pub location_auth_hash: i32,
    /// Location hash.
    pub location_hash: i32,
    /// One hash per subrequest, in request order.
    pub request_hashes: Vec<i64>,
}

// The service wants the three binary fields base64-encoded and, matching
// the remote API, the accuracy value in the `Altitude` slot.
#[derive(Serialize)]
struct HashPayload<'a> {
    #[serde(rename = "Timestamp")]
    timestamp: u64,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Altitude")]
    altitude: f64,
    #[serde(rename = "AuthTicket", serialize_with = "base64_bytes")]
    auth_ticket: &'a [u8],
    #[serde(rename = "SessionData", serialize_with = "base64_bytes")]
    session_data: &'a [u8],
    #[serde(rename = "Requests", serialize_with = "base64_list")]
    requests: &'a [Vec<u8>],
}

fn base64_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

fn base64_list<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(items.iter().map(|item| BASE64.encode(item)))
}

#[derive(Deserialize)]
struct HashResponse {
    #[serde(rename = "locationAuthHash")]
    location_auth_hash: serde_json::Number,
    #[serde(rename = "locationHash")]
    location_hash: serde_json::Number,
    #[serde(rename = "requestHashes", default)]
    request_hashes: Vec<serde_json::Number>,
}

/// Client for the hashing service.
pub struct HashServer {
    session: HttpSession,
    endpoint: String,
    ring: Mutex<KeyRing>,
}

impl HashServer {
    /// Creates a client with the default endpoint and connection limit,
    /// using the process-wide connection pool.
    pub fn new(keys: impl IntoIterator<Item = String>) -> Result<Self, HashError> {
        Self::with_options(keys, DEFAULT_HASH_ENDPOINT, DEFAULT_CONN_LIMIT, None)
    }

    /// Creates a client against a custom endpoint, connection limit, and
    /// optional proxy.
    pub fn with_options(
        keys: impl IntoIterator<Item = String>,
        endpoint: impl Into<String>,
        conn_limit: usize,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, HashError> {
        let session = SessionManager::global()
            .hash(proxy, conn_limit)
            .map_err(|err| HashError::Unexpected(err.to_string()))?;
        Self::with_session(keys, endpoint, session)
    }

    pub(crate) fn with_session(
        keys: impl IntoIterator<Item = String>,
        endpoint: impl Into<String>,
        session: HttpSession,
    ) -> Result<Self, HashError> {
        let entries: Vec<KeyEntry> = keys
            .into_iter()
            .map(|token| KeyEntry {
                token,
                status: KeyStatus::default(),
            })
            .collect();
        if entries.is_empty() {
            return Err(HashError::NoKey);
        }
        Ok(Self {
            session,
            endpoint: endpoint.into(),
            ring: Mutex::new(KeyRing { entries, cursor: 0 }),
        })
    }

    /// Snapshot of every key's quota status.
    pub fn statuses(&self) -> Vec<(String, KeyStatus)> {
        self.ring
            .lock()
            .entries
            .iter()
            .map(|entry| (entry.token.clone(), entry.status.clone()))
            .collect()
    }

    /// Requests the three hashes for one envelope.
    ///
    /// Key rotation, eviction of expired keys, and quota sleeps happen
    /// internally; only terminal conditions surface as [`HashError`].
    #[instrument(level = "debug", skip_all)]
    pub async fn hash(&self, input: &HashInput<'_>) -> Result<Hashes, HashError> {
        let payload = HashPayload {
            timestamp: input.timestamp_ms,
            latitude: input.latitude,
            longitude: input.longitude,
            altitude: input.accuracy,
            auth_ticket: input.auth_ticket,
            session_data: input.session_hash,
            requests: input.requests,
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|err| HashError::Unexpected(err.to_string()))?;

        let mut io_retries = 0u32;
        let mut bad_request_retries = 0u32;
        let mut slept_for_quota = false;
        loop {
            let token = self.usable_token().await?;
            let mut headers = HeaderMap::new();
            headers.insert(
                "X-AuthToken",
                HeaderValue::from_str(&token)
                    .map_err(|_| HashError::Unexpected("hash key is not a valid header".into()))?,
            );

            let response = match self.session.post(&self.endpoint, headers, body.clone()).await {
                Ok(response) => response,
                Err(TransportError::Timeout) => {
                    io_retries += 1;
                    if io_retries <= IO_RETRIES {
                        tokio::time::sleep(IO_BACKOFF).await;
                        continue;
                    }
                    return Err(HashError::Timeout);
                }
                Err(TransportError::Proxy(err) | TransportError::Network(err)) => {
                    io_retries += 1;
                    if io_retries <= IO_RETRIES {
                        tokio::time::sleep(IO_BACKOFF).await;
                        continue;
                    }
                    return Err(HashError::Offline(err));
                }
                Err(TransportError::Unexpected(err)) => {
                    return Err(HashError::Unexpected(err));
                }
            };

            match response.status.as_u16() {
                200 => {
                    self.harvest(&token, &response.headers);
                    return parse_hashes(&response.body);
                }
                400 => {
                    let failures = self.record_failure(&token);
                    let detail = String::from_utf8_lossy(&response.body).into_owned();
                    if failures < KEY_EXPIRY_FAILURES {
                        if bad_request_retries < BAD_REQUEST_RETRIES {
                            bad_request_retries += 1;
                            continue;
                        }
                        return Err(HashError::BadRequest(detail));
                    }
                    if self.evict(&token) {
                        tracing::warn!("hash key expired, removing it from rotation");
                        continue;
                    }
                    return Err(HashError::ExpiredKey(detail));
                }
                403 => return Err(HashError::TempBan),
                429 => {
                    let (multi, period_end) = self.exhaust(&token);
                    if multi {
                        tracing::debug!("quota exhausted on the active key, rotating");
                        self.rotate_from(&token);
                        continue;
                    }
                    let now = clock::epoch_s();
                    if period_end > now && !slept_for_quota {
                        slept_for_quota = true;
                        let wait = period_end - now + 1;
                        tracing::info!("out of hashes, waiting {wait}s for the new period");
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                        continue;
                    }
                    return Err(HashError::QuotaExceeded);
                }
                404 => {
                    return Err(HashError::Offline("404 from hashing endpoint".into()));
                }
                code if code >= 500 => {
                    return Err(HashError::Offline(format!("hashing server error {code}")));
                }
                code => {
                    return Err(HashError::Unexpected(format!("hash status code {code}")));
                }
            }
        }
    }

    /// Picks the active key, rotating past low-quota keys; sleeps until the
    /// nearest period end when every key is exhausted.
    async fn usable_token(&self) -> Result<String, HashError> {
        loop {
            let wait_until = {
                let mut ring = self.ring.lock();
                if ring.entries.is_empty() {
                    return Err(HashError::NoKey);
                }
                let now = clock::epoch_s();
                let mut selected = None;
                for _ in 0..ring.entries.len() {
                    let entry = &ring.entries[ring.cursor];
                    if entry.status.remaining >= LOW_QUOTA || now >= entry.status.period_end {
                        selected = Some(entry.token.clone());
                        break;
                    }
                    ring.advance();
                }
                match selected {
                    Some(token) => return Ok(token),
                    None => {
                        ring.entries
                            .iter()
                            .map(|entry| entry.status.period_end)
                            .min()
                            .unwrap_or(now)
                            + 1
                    }
                }
            };
            let now = clock::epoch_s();
            if wait_until > now {
                tracing::info!("all hash keys exhausted, waiting for the nearest period end");
                tokio::time::sleep(Duration::from_secs(wait_until - now)).await;
            }
        }
    }

    fn harvest(&self, token: &str, headers: &HeaderMap) {
        let mut ring = self.ring.lock();
        let Some(entry) = ring.find(token) else {
            return;
        };
        entry.status.failures = 0;
        if let Some(remaining) = header_number(headers, "X-RateRequestsRemaining") {
            entry.status.remaining = remaining as u32;
        }
        if let Some(period_end) = header_number(headers, "X-RatePeriodEnd") {
            entry.status.period_end = period_end;
        }
        if let Some(maximum) = header_number(headers, "X-MaxRequestCount") {
            entry.status.maximum = maximum as u32;
        }
        if let Some(expiration) = header_number(headers, "X-AuthTokenExpiration") {
            entry.status.expiration = expiration;
        }
    }

    fn record_failure(&self, token: &str) -> u32 {
        let mut ring = self.ring.lock();
        match ring.find(token) {
            Some(entry) => {
                entry.status.failures += 1;
                entry.status.failures
            }
            None => 0,
        }
    }

    /// Removes `token` when other keys remain; returns whether it did.
    fn evict(&self, token: &str) -> bool {
        let mut ring = self.ring.lock();
        if !ring.multi() {
            return false;
        }
        ring.evict(token);
        true
    }

    /// Zeroes the key's remaining quota; returns (multi, period_end).
    fn exhaust(&self, token: &str) -> (bool, u64) {
        let mut ring = self.ring.lock();
        let multi = ring.multi();
        match ring.find(token) {
            Some(entry) => {
                entry.status.remaining = 0;
                (multi, entry.status.period_end)
            }
            None => (multi, 0),
        }
    }

    fn rotate_from(&self, token: &str) {
        let mut ring = self.ring.lock();
        if ring
            .entries
            .get(ring.cursor)
            .is_some_and(|entry| entry.token == token)
        {
            ring.advance();
        }
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

fn parse_hashes(body: &[u8]) -> Result<Hashes, HashError> {
    let response: HashResponse = serde_json::from_slice(body)
        .map_err(|err| HashError::Malformed(err.to_string()))?;
    Ok(Hashes {
        location_auth_hash: signed32(&response.location_auth_hash)
            .ok_or_else(|| HashError::Malformed("locationAuthHash out of range".into()))?,
        location_hash: signed32(&response.location_hash)
            .ok_or_else(|| HashError::Malformed("locationHash out of range".into()))?,
        request_hashes: response
            .request_hashes
            .iter()
            .map(signed64)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| HashError::Malformed("requestHashes out of range".into()))?,
    })
}

// The service serializes its hashes as unsigned decimals; reinterpret them
// as two's-complement signed values.
fn signed32(number: &serde_json::Number) -> Option<i32> {
    number
        .as_i64()
        .map(|value| value as i32)
        .or_else(|| number.as_u64().map(|value| value as u32 as i32))
}

fn signed64(number: &serde_json::Number) -> Option<i64> {
    number
        .as_i64()
        .or_else(|| number.as_u64().map(|value| value as i64))
}
