//! Subrequest catalogue: the request-type enum and the per-type message
//! payloads (`<type>_message` in the upstream schema).

use prost::Message;

/// Numeric tags of the supported batch operations.
///
/// Only the subset the pipeline exercises is vendored; tags match the
/// upstream schema so bare integers observed on the wire map cleanly.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum RequestType {
    /// Placeholder zero value; never sent.
    MethodUnset = 0,
    /// Push the player's position.
    PlayerUpdate = 1,
    /// Fetch the player profile.
    GetPlayer = 2,
    /// Fetch the player inventory delta.
    GetInventory = 4,
    /// Fetch remote settings.
    DownloadSettings = 5,
    /// Fetch the item template catalogue.
    DownloadItemTemplates = 6,
    /// Spin a fort.
    FortSearch = 101,
    /// Start an encounter.
    Encounter = 102,
    /// Throw at an encountered target.
    CatchPokemon = 103,
    /// Fetch fort details.
    FortDetails = 104,
    /// Fetch map cells around the player.
    GetMapObjects = 106,
    /// Poll for newly awarded badges.
    CheckAwardedBadges = 110,
    /// Poll for hatched eggs.
    GetHatchedEggs = 126,
}

impl RequestType {
    /// Camel-case name keying the per-subrequest response map.
    pub fn name(self) -> &'static str {
        match self {
            RequestType::MethodUnset => "MethodUnset",
            RequestType::PlayerUpdate => "PlayerUpdate",
            RequestType::GetPlayer => "GetPlayer",
            RequestType::GetInventory => "GetInventory",
            RequestType::DownloadSettings => "DownloadSettings",
            RequestType::DownloadItemTemplates => "DownloadItemTemplates",
            RequestType::FortSearch => "FortSearch",
            RequestType::Encounter => "Encounter",
            RequestType::CatchPokemon => "CatchPokemon",
            RequestType::FortDetails => "FortDetails",
            RequestType::GetMapObjects => "GetMapObjects",
            RequestType::CheckAwardedBadges => "CheckAwardedBadges",
            RequestType::GetHatchedEggs => "GetHatchedEggs",
        }
    }
}

/// Payload of [`RequestType::PlayerUpdate`].
#[derive(Clone, PartialEq, Message)]
pub struct PlayerUpdateMessage {
    /// Player latitude.
    #[prost(double, tag = "1")]
    pub latitude: f64,
    /// Player longitude.
    #[prost(double, tag = "2")]
    pub longitude: f64,
}

/// Payload of [`RequestType::GetPlayer`].
#[derive(Clone, PartialEq, Message)]
pub struct GetPlayerMessage {
    /// Locale preferences for localized profile fields.
    #[prost(message, optional, tag = "1")]
    pub player_locale: Option<PlayerLocale>,
}

/// Locale block inside [`GetPlayerMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct PlayerLocale {
    /// ISO country code.
    #[prost(string, tag = "1")]
    pub country: String,
    /// ISO language code.
    #[prost(string, tag = "2")]
    pub language: String,
    /// IANA timezone name.
    #[prost(string, tag = "3")]
    pub timezone: String,
}

/// Payload of [`RequestType::GetInventory`].
#[derive(Clone, PartialEq, Message)]
pub struct GetInventoryMessage {
    /// Timestamp of the last delta the client holds.
    #[prost(int64, tag = "1")]
    pub last_timestamp_ms: i64,
}

/// Payload of [`RequestType::DownloadSettings`].
#[derive(Clone, PartialEq, Message)]
pub struct DownloadSettingsMessage {
    /// Hash of the settings version the client holds.
    #[prost(string, tag = "1")]
    pub hash: String,
}

/// Payload of [`RequestType::DownloadItemTemplates`].
#[derive(Clone, PartialEq, Message)]
pub struct DownloadItemTemplatesMessage {
    /// Request a single page instead of the full catalogue.
    #[prost(bool, tag = "1")]
    pub paginate: bool,
    /// Page offset when paginating.
    #[prost(int32, tag = "2")]
    pub page_offset: i32,
    /// Timestamp of the page the client holds.
    #[prost(uint64, tag = "3")]
    pub page_timestamp: u64,
}

/// Payload of [`RequestType::FortSearch`].
#[derive(Clone, PartialEq, Message)]
pub struct FortSearchMessage {
    /// Identifier of the fort to spin.
    #[prost(string, tag = "1")]
    pub fort_id: String,
    /// Player latitude at spin time.
    #[prost(double, tag = "2")]
    pub player_latitude: f64,
    /// Player longitude at spin time.
    #[prost(double, tag = "3")]
    pub player_longitude: f64,
    /// Fort latitude.
    #[prost(double, tag = "4")]
    pub fort_latitude: f64,
    /// Fort longitude.
    #[prost(double, tag = "5")]
    pub fort_longitude: f64,
}

/// Payload of [`RequestType::Encounter`].
#[derive(Clone, PartialEq, Message)]
pub struct EncounterMessage {
    /// Identifier of the spawn to encounter.
    #[prost(fixed64, tag = "1")]
    pub encounter_id: u64,
    /// Spawn point the encounter belongs to.
    #[prost(string, tag = "2")]
    pub spawn_point_id: String,
    /// Player latitude.
    #[prost(double, tag = "3")]
    pub player_latitude: f64,
    /// Player longitude.
    #[prost(double, tag = "4")]
    pub player_longitude: f64,
}

/// Payload of [`RequestType::CatchPokemon`].
#[derive(Clone, PartialEq, Message)]
pub struct CatchPokemonMessage {
    /// Identifier of the encountered target.
    #[prost(fixed64, tag = "1")]
    pub encounter_id: u64,
    /// Item id of the ball thrown.
    #[prost(int32, tag = "2")]
    pub pokeball: i32,
    /// Reticle size at throw time.
    #[prost(double, tag = "3")]
    pub normalized_reticle_size: f64,
    /// Spawn point the encounter belongs to.
    #[prost(string, tag = "4")]
    pub spawn_point_id: String,
    /// Whether the throw hit.
    #[prost(bool, tag = "5")]
    pub hit_pokemon: bool,
    /// Spin modifier of the throw.
    #[prost(double, tag = "6")]
    pub spin_modifier: f64,
    /// Hit position inside the reticle.
    #[prost(double, tag = "7")]
    pub normalized_hit_position: f64,
}

/// Payload of [`RequestType::FortDetails`].
#[derive(Clone, PartialEq, Message)]
pub struct FortDetailsMessage {
    /// Identifier of the fort.
    #[prost(string, tag = "1")]
    pub fort_id: String,
    /// Fort latitude.
    #[prost(double, tag = "2")]
    pub latitude: f64,
    /// Fort longitude.
    #[prost(double, tag = "3")]
    pub longitude: f64,
}

/// Payload of [`RequestType::GetMapObjects`].
#[derive(Clone, PartialEq, Message)]
pub struct GetMapObjectsMessage {
    /// S2 cells to fetch.
    #[prost(uint64, repeated, tag = "1")]
    pub cell_id: Vec<u64>,
    /// Per-cell timestamps of data the client holds; zeros for a full fetch.
    #[prost(int64, repeated, tag = "2")]
    pub since_timestamp_ms: Vec<i64>,
    /// Player latitude.
    #[prost(double, tag = "3")]
    pub latitude: f64,
    /// Player longitude.
    #[prost(double, tag = "4")]
    pub longitude: f64,
}

/// Payload of [`RequestType::CheckAwardedBadges`]; carries no fields.
#[derive(Clone, PartialEq, Message)]
pub struct CheckAwardedBadgesMessage {}

/// Payload of [`RequestType::GetHatchedEggs`]; carries no fields.
#[derive(Clone, PartialEq, Message)]
pub struct GetHatchedEggsMessage {}
