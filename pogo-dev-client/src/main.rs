use std::sync::Arc;

use clap::Parser;
use eyre::Context as _;
use secrecy::ExposeSecret as _;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use pogo_client::auth::AuthProvider;
use pogo_client::auth::google::GoogleAuth;
use pogo_client::auth::ptc::PtcAuth;
use pogo_client::{
    ArgMap, Client, ProxyConfig, RequestType, ResponseMessage, SignalEncryptor, Subrequest,
};

use crate::config::{Command, DevClientConfig, MapCommand, ProfileCommand, ProviderKind};

mod config;

/// Identity "cipher" for driving stub services during development; the
/// production cipher lives outside this workspace.
struct PassthroughEncryptor;

impl SignalEncryptor for PassthroughEncryptor {
    fn encrypt(&self, plain: &[u8], _timestamp_ms: u64, _version: u8) -> Vec<u8> {
        plain.to_vec()
    }
}

fn args(value: serde_json::Value) -> ArgMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => ArgMap::new(),
    }
}

async fn profile(client: &Client, cmd: ProfileCommand) -> eyre::Result<()> {
    let subrequests = [Subrequest::WithArgs(
        RequestType::GetPlayer,
        args(json!({
            "player_locale": {
                "country": cmd.country,
                "language": cmd.language,
                "timezone": cmd.timezone,
            }
        })),
    )];
    let response = client.call(&subrequests).await?;
    match response.responses.get("GetPlayer") {
        Some(ResponseMessage::GetPlayer(profile)) => {
            let username = profile
                .player_data
                .as_ref()
                .map(|data| data.username.as_str())
                .unwrap_or("<unset>");
            tracing::info!(
                "profile: username={username} banned={} warn={}",
                profile.banned,
                profile.warn
            );
        }
        other => tracing::warn!("unexpected profile response: {other:?}"),
    }
    // a second call should ride the session ticket instead of oauth
    let response = client.call(&[RequestType::GetHatchedEggs.into()]).await?;
    tracing::info!(
        "follow-up call ok (status {}), ticket reuse exercised",
        response.status_code
    );
    Ok(())
}

async fn map(client: &Client, cmd: MapCommand) -> eyre::Result<()> {
    let Some(position) = client.position() else {
        eyre::bail!("map command needs a position");
    };
    for run in 0..cmd.runs {
        let subrequests = [Subrequest::WithArgs(
            RequestType::GetMapObjects,
            args(json!({
                "cell_id": cmd.cells,
                "since_timestamp_ms": vec![0i64; cmd.cells.len()],
                "latitude": position.latitude,
                "longitude": position.longitude,
            })),
        )];
        let response = client.call(&subrequests).await?;
        match response.responses.get("GetMapObjects") {
            Some(ResponseMessage::GetMapObjects(map)) => {
                tracing::info!(
                    "run {run}: status {} with {} cells",
                    map.status,
                    map.map_cells.len()
                );
            }
            other => tracing::warn!("run {run}: unexpected map response: {other:?}"),
        }
    }
    for (key, status) in client.hash_server().statuses() {
        tracing::info!(
            "hash key {key}: {}/{} left in period ending {}",
            status.remaining,
            status.maximum,
            status.period_end
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pogo_dev_client=debug,pogo_client=debug,warn")),
        )
        .init();
    let config = DevClientConfig::parse();
    tracing::info!("starting pogo-dev-client");

    let auth: Arc<dyn AuthProvider> = match config.provider {
        ProviderKind::Ptc => {
            let mut ptc = PtcAuth::new(config.username.clone(), config.password.clone())
                .with_locale(config.locale.clone())
                .with_timeout(config.auth_timeout);
            if let Some(proxy) = &config.proxy {
                ptc = ptc.with_proxy(ProxyConfig::parse(proxy)?);
            }
            Arc::new(ptc)
        }
        ProviderKind::Google => {
            let mut google = GoogleAuth::new();
            if let Some(proxy) = &config.proxy {
                google = google.with_proxy(ProxyConfig::parse(proxy)?);
            }
            google
                .user_login(&config.username, config.password.expose_secret())
                .await
                .context("while logging in to google")?;
            Arc::new(google)
        }
    };

    let mut builder = Client::builder()
        .auth(auth)
        .encryptor(Arc::new(PassthroughEncryptor))
        .hash_keys(config.hash_keys.clone())
        .hash_endpoint(config.hash_endpoint.clone())
        .endpoint(config.endpoint.clone())
        .conn_limit(config.conn_limit)
        .position(config.latitude, config.longitude, config.altitude);
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(ProxyConfig::parse(proxy)?);
    }
    let client = builder.build().context("while building the client")?;

    match config.command.clone() {
        Command::Profile(cmd) => profile(&client, cmd).await?,
        Command::Map(cmd) => map(&client, cmd).await?,
    }

    Ok(())
}
