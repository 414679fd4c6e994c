//! Google device-login flow.
//!
//! Mirrors the gpsoauth protocol: a "master login" exchanges credentials
//! for a long-lived refresh token tied to fixed device constants, then an
//! oauth exchange turns the refresh token into a short-lived access token.
//! Both calls are plain form POSTs answered with `key=value` lines. The
//! exchange is synchronous by contract, so it runs on the blocking pool.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret as _, SecretString};
use tracing::instrument;

use crate::auth::{AuthProvider, Provider, TicketCache, TokenCell};
use crate::clock;
use crate::error::AuthError;
use crate::session::ProxyConfig;

const DEFAULT_AUTH_BASE: &str = "https://android.clients.google.com";
const ANDROID_ID: &str = "9774d56d682e549c";
const SERVICE: &str = "audience:server:client_id:848232511240-7so421jotr2609rmqakceuu1luuq0ptb.apps.googleusercontent.com";
const APP: &str = "com.nianticlabs.pokemongo";
const CLIENT_SIG: &str = "321187995bc7cdc2b5fc91b11a96e2baa8602c62";

const FALLBACK_TTL_S: u64 = 7200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Google device-login auth provider.
pub struct GoogleAuth {
    email: Mutex<Option<String>>,
    refresh_token: Mutex<Option<SecretString>>,
    token: Mutex<TokenCell>,
    refresh_lock: tokio::sync::Mutex<()>,
    tickets: TicketCache,
    proxy: Option<ProxyConfig>,
    auth_base: String,
}

impl Default for GoogleAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleAuth {
    /// Creates a provider; call [`AuthProvider::user_login`] or
    /// [`GoogleAuth::set_refresh_token`] before requesting tokens.
    pub fn new() -> Self {
        Self {
            email: Mutex::new(None),
            refresh_token: Mutex::new(None),
            token: Mutex::new(TokenCell::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            tickets: TicketCache::default(),
            proxy: None,
            auth_base: DEFAULT_AUTH_BASE.to_owned(),
        }
    }

    /// Routes login traffic through a proxy.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Overrides the auth base URL; the default points at production.
    pub fn with_auth_base(mut self, base: impl Into<String>) -> Self {
        self.auth_base = base.into();
        self
    }

    /// Installs a refresh token obtained elsewhere, skipping master login.
    pub fn set_refresh_token(&self, email: impl Into<String>, refresh_token: SecretString) {
        tracing::info!("refresh token provided by the caller");
        *self.email.lock() = Some(email.into());
        *self.refresh_token.lock() = Some(refresh_token);
    }

    // Runs one form POST against the auth endpoint on the blocking pool.
    async fn android_post(
        &self,
        form: Vec<(&'static str, String)>,
    ) -> Result<HashMap<String, String>, AuthError> {
        let url = format!("{}/auth", self.auth_base);
        let proxy = self.proxy.clone();
        tokio::task::spawn_blocking(move || {
            let mut builder = reqwest::blocking::Client::builder()
                .danger_accept_invalid_certs(true)
                .timeout(REQUEST_TIMEOUT);
            if let Some(proxy) = proxy {
                builder = builder.proxy(
                    proxy
                        .to_reqwest()
                        .map_err(|err| AuthError::Connection(err.to_string()))?,
                );
            }
            let client = builder
                .build()
                .map_err(|err| AuthError::Unexpected(err.to_string()))?;
            let response = client
                .post(&url)
                .form(&form)
                .send()
                .map_err(|err| super::classify(&err))?;
            let text = response.text().map_err(|err| super::classify(&err))?;
            Ok(parse_key_values(&text))
        })
        .await
        .map_err(|_| AuthError::Unexpected("login task failed".into()))?
    }

    #[instrument(level = "debug", skip_all)]
    async fn fetch_access_token(&self) -> Result<String, AuthError> {
        let email = self
            .email
            .lock()
            .clone()
            .ok_or(AuthError::InvalidCredentials)?;
        let refresh_token = self
            .refresh_token
            .lock()
            .as_ref()
            .map(|token| token.expose_secret().to_owned())
            .ok_or_else(|| AuthError::Auth("no refresh token available".into()))?;
        let form = vec![
            ("accountType", "HOSTED_OR_GOOGLE".to_owned()),
            ("Email", email),
            ("has_permission", "1".to_owned()),
            ("EncryptedPasswd", refresh_token),
            ("service", SERVICE.to_owned()),
            ("source", "android".to_owned()),
            ("androidId", ANDROID_ID.to_owned()),
            ("app", APP.to_owned()),
            ("client_sig", CLIENT_SIG.to_owned()),
            ("device_country", "us".to_owned()),
            ("operatorCountry", "us".to_owned()),
            ("lang", "en".to_owned()),
            ("sdk_version", "17".to_owned()),
        ];
        let fields = self.android_post(form).await?;
        let Some(access_token) = fields.get("Auth") else {
            return Err(AuthError::Auth("could not receive an access token".into()));
        };
        let expires_at = fields
            .get("Expiry")
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| clock::epoch_s() + FALLBACK_TTL_S);
        self.token.lock().store(access_token.clone(), expires_at);
        tracing::info!("access token successfully received");
        Ok(access_token.clone())
    }
}

fn parse_key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
        })
        .collect()
}

#[async_trait]
impl AuthProvider for GoogleAuth {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn tickets(&self) -> &TicketCache {
        &self.tickets
    }

    async fn user_login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        tracing::info!("google user login for {username}");
        let _guard = self.refresh_lock.lock().await;
        let form = vec![
            ("accountType", "HOSTED_OR_GOOGLE".to_owned()),
            ("Email", username.to_owned()),
            ("has_permission", "1".to_owned()),
            ("add_account", "1".to_owned()),
            ("Passwd", password.to_owned()),
            ("service", "ac2dm".to_owned()),
            ("source", "android".to_owned()),
            ("androidId", ANDROID_ID.to_owned()),
            ("device_country", "us".to_owned()),
            ("operatorCountry", "us".to_owned()),
            ("lang", "en".to_owned()),
            ("sdk_version", "17".to_owned()),
        ];
        let fields = self.android_post(form).await?;
        let Some(refresh_token) = fields.get("Token") else {
            return Err(AuthError::Auth("invalid Google username/password".into()));
        };
        *self.email.lock() = Some(username.to_owned());
        *self.refresh_token.lock() = Some(SecretString::from(refresh_token.clone()));
        tracing::info!("google user login successful");
        self.fetch_access_token().await?;
        Ok(())
    }

    async fn access_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        if !force_refresh && let Some(token) = self.token.lock().valid() {
            tracing::debug!("using cached access token");
            return Ok(token);
        }
        let _guard = self.refresh_lock.lock().await;
        if !force_refresh && let Some(token) = self.token.lock().valid() {
            return Ok(token);
        }
        if force_refresh {
            tracing::info!("forced access-token refresh");
        }
        self.fetch_access_token().await
    }
}
