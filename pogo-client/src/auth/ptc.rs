//! Web-OAuth CAS login flow.
//!
//! The dance: GET the authorize URL, which answers a JSON object holding
//! the CAS form state (`lt`, `execution`, ...); POST that object back as a
//! form augmented with the credentials; success is signaled by a `CASTGC`
//! cookie on the (unfollowed) redirect response. The resulting access
//! token is valid for a fixed 7195 seconds.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::Value;
use tracing::instrument;

use crate::auth::{AuthProvider, Provider, TicketCache, TokenCell, classify};
use crate::clock;
use crate::error::AuthError;
use crate::session::ProxyConfig;

const DEFAULT_SSO_BASE: &str = "https://sso.pokemon.com/sso";
const CLIENT_ID: &str = "mobile-app_pokemon-go";
const REDIRECT_URI: &str = "https://www.nianticlabs.com/pokemongo/error";
const CALLBACK_SERVICE: &str = "https://sso.pokemon.com/sso/oauth2.0/callbackAuthorize";
// wanted by the oauth token endpoint, not by the CAS dance itself
#[allow(dead_code)]
const CLIENT_SECRET: &str = "w8ScCUXJQc6kXKw8FiOhd8Fixzht18Dq3PEVkUCP5ZPxtgyWsbTvWHFLm2wNY0JR";
const USER_AGENT: &str = "pokemongo/0 CFNetwork/758.5.3 Darwin/15.6.0";

const ACCESS_TOKEN_TTL_S: u64 = 7195;
const GET_TIMEOUT: Duration = Duration::from_secs(10);
const POST_TIMEOUT: Duration = Duration::from_secs(8);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

struct Credentials {
    username: String,
    password: SecretString,
}

/// CAS-flow auth provider.
pub struct PtcAuth {
    credentials: Mutex<Option<Credentials>>,
    token: Mutex<TokenCell>,
    refresh_lock: tokio::sync::Mutex<()>,
    tickets: TicketCache,
    locale: String,
    timeout: Duration,
    proxy: Option<ProxyConfig>,
    sso_base: String,
}

impl PtcAuth {
    /// Creates a provider with the given credentials.
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            credentials: Mutex::new(Some(Credentials {
                username: username.into(),
                password,
            })),
            token: Mutex::new(TokenCell::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            tickets: TicketCache::default(),
            locale: "en_US".to_owned(),
            timeout: GET_TIMEOUT,
            proxy: None,
            sso_base: DEFAULT_SSO_BASE.to_owned(),
        }
    }

    /// Sets the locale sent as a form/query parameter.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Overrides the read timeout of the authorize GET.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Routes login traffic through a proxy.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Overrides the SSO base URL; the defaults point at production.
    pub fn with_sso_base(mut self, base: impl Into<String>) -> Self {
        self.sso_base = base.into();
        self
    }

    // One client per login, so each dance starts with a fresh cookie jar.
    fn build_client(&self) -> Result<reqwest::Client, AuthError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT);
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(
                proxy
                    .to_reqwest()
                    .map_err(|err| AuthError::Connection(err.to_string()))?,
            );
        }
        builder
            .build()
            .map_err(|err| AuthError::Unexpected(err.to_string()))
    }

    #[instrument(level = "debug", skip_all)]
    async fn login_with_stored(&self) -> Result<String, AuthError> {
        let (username, password) = {
            let credentials = self.credentials.lock();
            let Some(credentials) = credentials.as_ref() else {
                return Err(AuthError::InvalidCredentials);
            };
            (
                credentials.username.clone(),
                credentials.password.expose_secret().to_owned(),
            )
        };
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        tracing::info!("CAS user login for {username}");
        self.token.lock().clear();
        let client = self.build_client()?;
        let now = clock::epoch_s();

        let authorize_url = format!("{}/oauth2.0/authorize", self.sso_base);
        let response = client
            .get(&authorize_url)
            .query(&[
                ("client_id", CLIENT_ID),
                ("redirect_uri", REDIRECT_URI),
                ("locale", self.locale.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| classify(&err))?;
        if !response.status().is_success() {
            return Err(AuthError::Connection(format!(
                "HTTP {} from the authorize endpoint",
                response.status()
            )));
        }
        let state: serde_json::Map<String, Value> = response
            .json()
            .await
            .map_err(|_| AuthError::Auth("unable to parse the authorize response".into()))?;

        let mut form: Vec<(String, String)> = state
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                Value::Number(number) => Some((key, number.to_string())),
                Value::Bool(flag) => Some((key, flag.to_string())),
                _ => None,
            })
            .collect();
        form.push(("_eventId".to_owned(), "submit".to_owned()));
        form.push(("username".to_owned(), username));
        form.push(("password".to_owned(), password));
        form.push(("locale".to_owned(), self.locale.clone()));

        let login_url = format!("{}/login", self.sso_base);
        let response = client
            .post(&login_url)
            .query(&[("service", CALLBACK_SERVICE), ("locale", self.locale.as_str())])
            .form(&form)
            .timeout(POST_TIMEOUT)
            .send()
            .await
            .map_err(|err| classify(&err))?;

        if let Some(ticket) = response
            .cookies()
            .find(|cookie| cookie.name() == "CASTGC")
        {
            let access_token = ticket.value().to_owned();
            self.token
                .lock()
                .store(access_token.clone(), now + ACCESS_TOKEN_TTL_S);
            tracing::info!("CAS user login successful");
            return Ok(access_token);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| AuthError::Auth("unable to decode the login response".into()))?;
        Err(login_failure(&body))
    }
}

fn login_failure(body: &Value) -> AuthError {
    if body.get("error_code").and_then(Value::as_str)
        == Some("users.login.activation_required")
    {
        return AuthError::ActivationRequired;
    }
    match body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str)
    {
        Some(error) if error.contains("unexpected error") => {
            AuthError::Unexpected(error.to_owned())
        }
        Some(error) => AuthError::Auth(error.to_owned()),
        None => AuthError::Auth("unable to log in or get error information".into()),
    }
}

#[async_trait]
impl AuthProvider for PtcAuth {
    fn provider(&self) -> Provider {
        Provider::Ptc
    }

    fn tickets(&self) -> &TicketCache {
        &self.tickets
    }

    async fn user_login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        *self.credentials.lock() = Some(Credentials {
            username: username.to_owned(),
            password: SecretString::from(password.to_owned()),
        });
        let _guard = self.refresh_lock.lock().await;
        self.login_with_stored().await?;
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
        self.login_with_stored().await
    }
}
