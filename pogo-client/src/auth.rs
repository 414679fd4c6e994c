//! Auth providers and the session-ticket cache.
//!
//! Two providers implement one contract: produce a bearer access token on
//! demand, and share a [`TicketCache`] the engine fills from server
//! responses. While the cache holds a valid ticket the engine sends it
//! instead of the token, so providers are only consulted on cold starts
//! and after a status-102 rejection.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::clock;
use crate::error::AuthError;

pub mod google;
pub mod ptc;

/// Grace subtracted from the ticket expiry when judging validity.
const TICKET_EXPIRY_MARGIN_MS: u64 = 10_000;

/// Identity provider tag carried in the envelope's auth block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// The web-OAuth CAS flow.
    Ptc,
    /// Google device login.
    Google,
}

impl Provider {
    /// Wire form of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Ptc => "ptc",
            Provider::Google => "google",
        }
    }
}

/// Server-issued rolling session ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// Expiry as epoch milliseconds.
    pub expire_timestamp_ms: u64,
    /// Opaque ticket prefix.
    pub start: Vec<u8>,
    /// Opaque ticket suffix.
    pub end: Vec<u8>,
}

/// Rolling session-ticket cache shared between a provider and the engine.
#[derive(Default)]
pub struct TicketCache {
    inner: Mutex<Option<Ticket>>,
}

impl TicketCache {
    /// True while any ticket is cached, regardless of validity.
    pub fn has_ticket(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// True while the cached ticket is inside its validity window; an
    /// expired ticket is cleared.
    pub fn check_ticket(&self) -> bool {
        self.check_ticket_at(clock::epoch_ms())
    }

    pub(crate) fn check_ticket_at(&self, now_ms: u64) -> bool {
        let mut slot = self.inner.lock();
        match &*slot {
            Some(ticket)
                if now_ms < ticket.expire_timestamp_ms.saturating_sub(TICKET_EXPIRY_MARGIN_MS) =>
            {
                true
            }
            Some(_) => {
                tracing::debug!("removing expired session ticket");
                *slot = None;
                false
            }
            None => false,
        }
    }

    /// Returns the ticket while valid.
    pub fn ticket(&self) -> Option<Ticket> {
        if self.check_ticket() {
            self.inner.lock().clone()
        } else {
            None
        }
    }

    /// True when `expire_timestamp_ms` is later than the cached ticket's,
    /// or no ticket is cached. The cache only ever moves forward.
    pub fn is_new_ticket(&self, expire_timestamp_ms: u64) -> bool {
        match &*self.inner.lock() {
            Some(ticket) => expire_timestamp_ms > ticket.expire_timestamp_ms,
            None => true,
        }
    }

    /// Replaces the cached ticket.
    pub fn set_ticket(&self, ticket: Ticket) {
        *self.inner.lock() = Some(ticket);
    }
}

/// Contract shared by the auth providers.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Tag copied into `auth_info.provider`.
    fn provider(&self) -> Provider;

    /// The session-ticket cache shared with the engine.
    fn tickets(&self) -> &TicketCache;

    /// Performs the provider-specific login dance and caches an access
    /// token; credentials are stored for later re-login.
    async fn user_login(&self, username: &str, password: &str) -> Result<(), AuthError>;

    /// Returns the cached access token while valid; otherwise re-logs in
    /// (or refreshes). Concurrent refreshes are serialized per provider.
    async fn access_token(&self, force_refresh: bool) -> Result<String, AuthError>;
}

/// Cached bearer token with its expiry.
#[derive(Default)]
pub(crate) struct TokenCell {
    access_token: Option<String>,
    expires_at_s: u64,
}

impl TokenCell {
    pub(crate) fn valid(&self) -> Option<String> {
        self.access_token
            .clone()
            .filter(|_| clock::epoch_s() < self.expires_at_s)
    }

    pub(crate) fn store(&mut self, token: String, expires_at_s: u64) {
        self.access_token = Some(token);
        self.expires_at_s = expires_at_s;
    }

    pub(crate) fn clear(&mut self) {
        self.access_token = None;
        self.expires_at_s = 0;
    }
}

pub(crate) fn classify(err: &reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(expire_ms: u64) -> Ticket {
        Ticket {
            expire_timestamp_ms: expire_ms,
            start: vec![1],
            end: vec![2],
        }
    }

    #[test]
    fn ticket_window_boundary() {
        let cache = TicketCache::default();
        cache.set_ticket(ticket(1_000_000));
        assert!(cache.check_ticket_at(989_999));
        assert!(!cache.check_ticket_at(990_000));
        // the expired ticket was cleared by the failed check
        assert!(!cache.has_ticket());
    }

    #[test]
    fn only_newer_tickets_replace() {
        let cache = TicketCache::default();
        assert!(cache.is_new_ticket(5_000));
        cache.set_ticket(ticket(5_000));
        assert!(!cache.is_new_ticket(5_000));
        assert!(!cache.is_new_ticket(4_000));
        assert!(cache.is_new_ticket(6_000));
    }

    #[test]
    fn token_cell_expiry() {
        let mut cell = TokenCell::default();
        assert!(cell.valid().is_none());
        cell.store("token".to_owned(), clock::epoch_s() + 60);
        assert_eq!(cell.valid().as_deref(), Some("token"));
        cell.store("token".to_owned(), clock::epoch_s().saturating_sub(1));
        assert!(cell.valid().is_none());
        cell.clear();
        assert!(cell.valid().is_none());
    }
}
