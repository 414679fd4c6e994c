//! Subrequest responses (`<type>_response` in the upstream schema) and the
//! decoded-response sum type handed back to callers.

use prost::Message;

/// A decoded per-subrequest response.
///
/// Undecodable or unsupported payloads are preserved as [`Raw`] bytes
/// instead of failing the whole batch.
///
/// [`Raw`]: ResponseMessage::Raw
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseMessage {
    /// Response to a player-position push.
    PlayerUpdate(PlayerUpdateResponse),
    /// Response to a profile fetch.
    GetPlayer(GetPlayerResponse),
    /// Response to an inventory delta fetch.
    GetInventory(GetInventoryResponse),
    /// Response to a settings fetch.
    DownloadSettings(DownloadSettingsResponse),
    /// Response to an item-template fetch.
    DownloadItemTemplates(DownloadItemTemplatesResponse),
    /// Response to a fort spin.
    FortSearch(FortSearchResponse),
    /// Response to an encounter start.
    Encounter(EncounterResponse),
    /// Response to a throw.
    CatchPokemon(CatchPokemonResponse),
    /// Response to a fort-details fetch.
    FortDetails(FortDetailsResponse),
    /// Response to a map fetch.
    GetMapObjects(GetMapObjectsResponse),
    /// Response to a badge poll.
    CheckAwardedBadges(CheckAwardedBadgesResponse),
    /// Response to an egg poll.
    GetHatchedEggs(GetHatchedEggsResponse),
    /// Payload that did not decode against the vendored schema.
    Raw(Vec<u8>),
}

/// Response to [`crate::requests::PlayerUpdateMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct PlayerUpdateResponse {
    /// Whether the update was accepted.
    #[prost(bool, tag = "1")]
    pub success: bool,
}

/// Response to [`crate::requests::GetPlayerMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct GetPlayerResponse {
    /// Whether the profile fetch succeeded.
    #[prost(bool, tag = "1")]
    pub success: bool,
    /// The profile, on success.
    #[prost(message, optional, tag = "2")]
    pub player_data: Option<PlayerData>,
    /// The account carries a ban.
    #[prost(bool, tag = "3")]
    pub banned: bool,
    /// The account carries a warning.
    #[prost(bool, tag = "4")]
    pub warn: bool,
}

/// Player profile inside [`GetPlayerResponse`].
#[derive(Clone, PartialEq, Message)]
pub struct PlayerData {
    /// Account creation time, epoch milliseconds.
    #[prost(int64, tag = "1")]
    pub creation_timestamp_ms: i64,
    /// Display name.
    #[prost(string, tag = "2")]
    pub username: String,
    /// Team id, 0 before choosing.
    #[prost(int32, tag = "5")]
    pub team: i32,
}

/// Response to [`crate::requests::GetInventoryMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct GetInventoryResponse {
    /// Whether the delta fetch succeeded.
    #[prost(bool, tag = "1")]
    pub success: bool,
}

/// Response to [`crate::requests::DownloadSettingsMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct DownloadSettingsResponse {
    /// Error string, empty on success.
    #[prost(string, tag = "1")]
    pub error: String,
    /// Hash of the returned settings version.
    #[prost(string, tag = "2")]
    pub hash: String,
}

/// Response to [`crate::requests::DownloadItemTemplatesMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct DownloadItemTemplatesResponse {
    /// Result code; 1 is success.
    #[prost(int32, tag = "1")]
    pub result: i32,
    /// Page offset to request next when paginating.
    #[prost(int32, tag = "2")]
    pub page_offset: i32,
    /// Timestamp of the returned page.
    #[prost(int64, tag = "3")]
    pub timestamp_ms: i64,
}

/// Response to [`crate::requests::FortSearchMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct FortSearchResponse {
    /// Result code; 1 is success.
    #[prost(int32, tag = "1")]
    pub result: i32,
    /// When the fort can be spun again, epoch milliseconds.
    #[prost(int64, tag = "2")]
    pub cooldown_complete_timestamp_ms: i64,
    /// Experience granted by the spin.
    #[prost(int32, tag = "3")]
    pub experience_awarded: i32,
}

/// Response to [`crate::requests::EncounterMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct EncounterResponse {
    /// Encounter status code; 1 is success.
    #[prost(int32, tag = "1")]
    pub status: i32,
}

/// Response to [`crate::requests::CatchPokemonMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct CatchPokemonResponse {
    /// Catch status code.
    #[prost(int32, tag = "1")]
    pub status: i32,
    /// Miss probability reported by the server.
    #[prost(double, tag = "2")]
    pub miss_percent: f64,
    /// Captured entity id when the throw stuck.
    #[prost(fixed64, tag = "3")]
    pub captured_pokemon_id: u64,
}

/// Response to [`crate::requests::FortDetailsMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct FortDetailsResponse {
    /// Identifier of the fort.
    #[prost(string, tag = "1")]
    pub fort_id: String,
    /// Display name of the fort.
    #[prost(string, tag = "2")]
    pub name: String,
}

/// Response to [`crate::requests::GetMapObjectsMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct GetMapObjectsResponse {
    /// Returned cells.
    #[prost(message, repeated, tag = "1")]
    pub map_cells: Vec<MapCell>,
    /// Map status code; 1 is success.
    #[prost(int32, tag = "2")]
    pub status: i32,
}

/// One map cell inside [`GetMapObjectsResponse`].
#[derive(Clone, PartialEq, Message)]
pub struct MapCell {
    /// S2 cell id.
    #[prost(uint64, tag = "1")]
    pub s2_cell_id: u64,
    /// Server timestamp of the cell contents.
    #[prost(int64, tag = "2")]
    pub current_timestamp_ms: i64,
}

/// Response to [`crate::requests::CheckAwardedBadgesMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct CheckAwardedBadgesResponse {
    /// Whether the poll succeeded.
    #[prost(bool, tag = "1")]
    pub success: bool,
}

/// Response to [`crate::requests::GetHatchedEggsMessage`].
#[derive(Clone, PartialEq, Message)]
pub struct GetHatchedEggsResponse {
    /// Whether the poll succeeded.
    #[prost(bool, tag = "1")]
    pub success: bool,
    /// Experience granted per hatched egg.
    #[prost(int32, repeated, tag = "3")]
    pub experience_awarded: Vec<i32>,
}
