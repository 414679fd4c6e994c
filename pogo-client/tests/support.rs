//! Shared fixtures for the integration suites: a static auth provider, an
//! identity cipher, and helpers to run in-process mock endpoints.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use pogo_client::SignalEncryptor;
use pogo_client::auth::{AuthProvider, Provider, TicketCache};
use pogo_client::error::AuthError;

/// Provider that hands out a fixed token and counts refreshes.
pub struct StaticAuth {
    token: String,
    tickets: TicketCache,
    pub forced_refreshes: AtomicUsize,
    pub token_requests: AtomicUsize,
}

impl StaticAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tickets: TicketCache::default(),
            forced_refreshes: AtomicUsize::new(0),
            token_requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    fn provider(&self) -> Provider {
        Provider::Ptc
    }

    fn tickets(&self) -> &TicketCache {
        &self.tickets
    }

    async fn user_login(&self, _username: &str, _password: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn access_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if force_refresh {
            self.forced_refreshes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(self.token.clone())
    }
}

/// Identity cipher, so tests can decode the attached signal log.
pub struct NoopEncryptor;

impl SignalEncryptor for NoopEncryptor {
    fn encrypt(&self, plain: &[u8], _timestamp_ms: u64, _version: u8) -> Vec<u8> {
        plain.to_vec()
    }
}

/// Serves `router` on an ephemeral localhost port.
pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("can bind");
    let addr = listener.local_addr().expect("has local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serves");
    });
    addr
}

/// Response body + rate headers of a well-behaved hash endpoint.
pub fn hash_ok_response() -> impl axum::response::IntoResponse {
    (
        [
            ("X-RateRequestsRemaining", "42"),
            ("X-RatePeriodEnd", "1999999999"),
            ("X-MaxRequestCount", "150"),
            ("X-AuthTokenExpiration", "1999999999"),
        ],
        axum::Json(serde_json::json!({
            "locationHash": 1,
            "locationAuthHash": -2,
            "requestHashes": [42u64],
        })),
    )
}
