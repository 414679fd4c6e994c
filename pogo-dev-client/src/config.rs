use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;

/// Which identity provider to log in with.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProviderKind {
    /// Web-OAuth CAS flow.
    Ptc,
    /// Google device login.
    Google,
}

#[derive(Clone, Debug, Parser)]
pub struct ProfileCommand {
    /// ISO country code for the profile locale
    #[clap(long, env = "POGO_DEV_CLIENT_COUNTRY", default_value = "US")]
    pub country: String,

    /// ISO language code for the profile locale
    #[clap(long, env = "POGO_DEV_CLIENT_LANGUAGE", default_value = "en")]
    pub language: String,

    /// IANA timezone for the profile locale
    #[clap(
        long,
        env = "POGO_DEV_CLIENT_TIMEZONE",
        default_value = "America/Chicago"
    )]
    pub timezone: String,
}

#[derive(Clone, Debug, Parser)]
pub struct MapCommand {
    /// S2 cells to fetch
    #[clap(long, env = "POGO_DEV_CLIENT_CELLS", value_delimiter = ',')]
    pub cells: Vec<u64>,

    /// Number of map fetches to issue back to back
    #[clap(long, env = "POGO_DEV_CLIENT_RUNS", default_value = "1")]
    pub runs: usize,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Fetch the player profile (also exercises ticket reuse).
    Profile(ProfileCommand),
    /// Fetch map cells around the configured position.
    Map(MapCommand),
}

/// Configuration for the dev client.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Debug, Parser)]
pub struct DevClientConfig {
    /// The identity provider to authenticate against
    #[clap(long, env = "POGO_DEV_CLIENT_PROVIDER", default_value = "ptc")]
    pub provider: ProviderKind,

    /// Account username
    #[clap(long, env = "POGO_DEV_CLIENT_USERNAME")]
    pub username: String,

    /// Account password
    #[clap(long, env = "POGO_DEV_CLIENT_PASSWORD")]
    pub password: SecretString,

    /// Hash keys; several enable rotation
    #[clap(long, env = "POGO_DEV_CLIENT_HASH_KEYS", value_delimiter = ',')]
    pub hash_keys: Vec<String>,

    /// The RPC endpoint
    #[clap(
        long,
        env = "POGO_DEV_CLIENT_ENDPOINT",
        default_value = pogo_client::DEFAULT_API_ENDPOINT
    )]
    pub endpoint: String,

    /// The hashing endpoint
    #[clap(
        long,
        env = "POGO_DEV_CLIENT_HASH_ENDPOINT",
        default_value = pogo_client::DEFAULT_HASH_ENDPOINT
    )]
    pub hash_endpoint: String,

    /// Player latitude
    #[clap(long, env = "POGO_DEV_CLIENT_LAT", allow_hyphen_values = true)]
    pub latitude: f64,

    /// Player longitude
    #[clap(long, env = "POGO_DEV_CLIENT_LON", allow_hyphen_values = true)]
    pub longitude: f64,

    /// Player altitude in meters; synthesized when omitted
    #[clap(long, env = "POGO_DEV_CLIENT_ALT", allow_hyphen_values = true)]
    pub altitude: Option<f64>,

    /// Proxy URL (http://, socks4://, socks5://)
    #[clap(long, env = "POGO_DEV_CLIENT_PROXY")]
    pub proxy: Option<String>,

    /// Locale passed to the auth provider
    #[clap(long, env = "POGO_DEV_CLIENT_LOCALE", default_value = "en_US")]
    pub locale: String,

    /// Auth read timeout
    #[clap(
        long,
        env = "POGO_DEV_CLIENT_AUTH_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub auth_timeout: Duration,

    /// Max concurrent hashing connections
    #[clap(long, env = "POGO_DEV_CLIENT_CONN_LIMIT", default_value = "300")]
    pub conn_limit: usize,

    /// Command
    #[command(subcommand)]
    pub command: Command,
}
