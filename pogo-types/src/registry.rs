//! Type table mapping a [`RequestType`] to its payload builder and response
//! parser.
//!
//! A static table over the vendored types stands in for runtime
//! descriptor lookup. Builders take an untyped argument map and apply it
//! permissively: scalars assign fields, arrays extend repeated fields,
//! objects fill nested messages, and anything unknown or mismatched is
//! logged and skipped rather than failing the batch.

use prost::Message;
use serde_json::Value;

use crate::requests::*;
use crate::responses::*;

/// Untyped subrequest arguments, as accepted by the payload builders.
pub type ArgMap = serde_json::Map<String, Value>;

/// Build/parse pair for one request type.
#[derive(Clone, Copy)]
pub struct MessageDescriptor {
    /// Encodes the `<type>_message` payload from an argument map.
    pub build: fn(&ArgMap) -> Vec<u8>,
    /// Decodes the `<type>_response` payload.
    pub parse: fn(&[u8]) -> ResponseMessage,
}

/// Looks up the descriptor for a request type.
pub fn descriptor(request_type: RequestType) -> MessageDescriptor {
    match request_type {
        RequestType::MethodUnset => MessageDescriptor {
            build: |_| Vec::new(),
            parse: |bytes| ResponseMessage::Raw(bytes.to_vec()),
        },
        RequestType::PlayerUpdate => MessageDescriptor {
            build: build_player_update,
            parse: parse_player_update,
        },
        RequestType::GetPlayer => MessageDescriptor {
            build: build_get_player,
            parse: parse_get_player,
        },
        RequestType::GetInventory => MessageDescriptor {
            build: build_get_inventory,
            parse: parse_get_inventory,
        },
        RequestType::DownloadSettings => MessageDescriptor {
            build: build_download_settings,
            parse: parse_download_settings,
        },
        RequestType::DownloadItemTemplates => MessageDescriptor {
            build: build_download_item_templates,
            parse: parse_download_item_templates,
        },
        RequestType::FortSearch => MessageDescriptor {
            build: build_fort_search,
            parse: parse_fort_search,
        },
        RequestType::Encounter => MessageDescriptor {
            build: build_encounter,
            parse: parse_encounter,
        },
        RequestType::CatchPokemon => MessageDescriptor {
            build: build_catch_pokemon,
            parse: parse_catch_pokemon,
        },
        RequestType::FortDetails => MessageDescriptor {
            build: build_fort_details,
            parse: parse_fort_details,
        },
        RequestType::GetMapObjects => MessageDescriptor {
            build: build_get_map_objects,
            parse: parse_get_map_objects,
        },
        RequestType::CheckAwardedBadges => MessageDescriptor {
            build: |_| CheckAwardedBadgesMessage {}.encode_to_vec(),
            parse: parse_check_awarded_badges,
        },
        RequestType::GetHatchedEggs => MessageDescriptor {
            build: |_| GetHatchedEggsMessage {}.encode_to_vec(),
            parse: parse_get_hatched_eggs,
        },
    }
}

macro_rules! parse_fns {
    ($($name:ident => $msg:ty, $variant:ident, $proto:literal;)*) => {
        $(fn $name(bytes: &[u8]) -> ResponseMessage {
            match <$msg>::decode(bytes) {
                Ok(msg) => ResponseMessage::$variant(msg),
                Err(err) => {
                    tracing::warn!(
                        "protobuf definition for {} does not match: {err}",
                        $proto
                    );
                    ResponseMessage::Raw(bytes.to_vec())
                }
            }
        })*
    };
}

parse_fns! {
    parse_player_update => PlayerUpdateResponse, PlayerUpdate, "player_update_response";
    parse_get_player => GetPlayerResponse, GetPlayer, "get_player_response";
    parse_get_inventory => GetInventoryResponse, GetInventory, "get_inventory_response";
    parse_download_settings => DownloadSettingsResponse, DownloadSettings, "download_settings_response";
    parse_download_item_templates => DownloadItemTemplatesResponse, DownloadItemTemplates, "download_item_templates_response";
    parse_fort_search => FortSearchResponse, FortSearch, "fort_search_response";
    parse_encounter => EncounterResponse, Encounter, "encounter_response";
    parse_catch_pokemon => CatchPokemonResponse, CatchPokemon, "catch_pokemon_response";
    parse_fort_details => FortDetailsResponse, FortDetails, "fort_details_response";
    parse_get_map_objects => GetMapObjectsResponse, GetMapObjects, "get_map_objects_response";
    parse_check_awarded_badges => CheckAwardedBadgesResponse, CheckAwardedBadges, "check_awarded_badges_response";
    parse_get_hatched_eggs => GetHatchedEggsResponse, GetHatchedEggs, "get_hatched_eggs_response";
}

fn build_player_update(args: &ArgMap) -> Vec<u8> {
    let mut msg = PlayerUpdateMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "latitude" => set_f64(&mut msg.latitude, "player_update_message", key, value),
            "longitude" => set_f64(&mut msg.longitude, "player_update_message", key, value),
            _ => unknown_field("player_update_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_get_player(args: &ArgMap) -> Vec<u8> {
    let mut msg = GetPlayerMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "player_locale" => {
                let Some(fields) = value.as_object() else {
                    mismatch("get_player_message", key, value);
                    continue;
                };
                let locale = msg.player_locale.get_or_insert_with(PlayerLocale::default);
                for (k, v) in fields {
                    match k.as_str() {
                        "country" => set_string(&mut locale.country, "player_locale", k, v),
                        "language" => set_string(&mut locale.language, "player_locale", k, v),
                        "timezone" => set_string(&mut locale.timezone, "player_locale", k, v),
                        _ => unknown_field("player_locale", k),
                    }
                }
            }
            _ => unknown_field("get_player_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_get_inventory(args: &ArgMap) -> Vec<u8> {
    let mut msg = GetInventoryMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "last_timestamp_ms" => {
                set_i64(&mut msg.last_timestamp_ms, "get_inventory_message", key, value)
            }
            _ => unknown_field("get_inventory_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_download_settings(args: &ArgMap) -> Vec<u8> {
    let mut msg = DownloadSettingsMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "hash" => set_string(&mut msg.hash, "download_settings_message", key, value),
            _ => unknown_field("download_settings_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_download_item_templates(args: &ArgMap) -> Vec<u8> {
    let mut msg = DownloadItemTemplatesMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "paginate" => set_bool(&mut msg.paginate, "download_item_templates_message", key, value),
            "page_offset" => {
                set_i32(&mut msg.page_offset, "download_item_templates_message", key, value)
            }
            "page_timestamp" => {
                set_u64(&mut msg.page_timestamp, "download_item_templates_message", key, value)
            }
            _ => unknown_field("download_item_templates_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_fort_search(args: &ArgMap) -> Vec<u8> {
    let mut msg = FortSearchMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "fort_id" => set_string(&mut msg.fort_id, "fort_search_message", key, value),
            "player_latitude" => {
                set_f64(&mut msg.player_latitude, "fort_search_message", key, value)
            }
            "player_longitude" => {
                set_f64(&mut msg.player_longitude, "fort_search_message", key, value)
            }
            "fort_latitude" => set_f64(&mut msg.fort_latitude, "fort_search_message", key, value),
            "fort_longitude" => set_f64(&mut msg.fort_longitude, "fort_search_message", key, value),
            _ => unknown_field("fort_search_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_encounter(args: &ArgMap) -> Vec<u8> {
    let mut msg = EncounterMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "encounter_id" => set_u64(&mut msg.encounter_id, "encounter_message", key, value),
            "spawn_point_id" => set_string(&mut msg.spawn_point_id, "encounter_message", key, value),
            "player_latitude" => set_f64(&mut msg.player_latitude, "encounter_message", key, value),
            "player_longitude" => {
                set_f64(&mut msg.player_longitude, "encounter_message", key, value)
            }
            _ => unknown_field("encounter_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_catch_pokemon(args: &ArgMap) -> Vec<u8> {
    let mut msg = CatchPokemonMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "encounter_id" => set_u64(&mut msg.encounter_id, "catch_pokemon_message", key, value),
            "pokeball" => set_i32(&mut msg.pokeball, "catch_pokemon_message", key, value),
            "normalized_reticle_size" => {
                set_f64(&mut msg.normalized_reticle_size, "catch_pokemon_message", key, value)
            }
            "spawn_point_id" => {
                set_string(&mut msg.spawn_point_id, "catch_pokemon_message", key, value)
            }
            "hit_pokemon" => set_bool(&mut msg.hit_pokemon, "catch_pokemon_message", key, value),
            "spin_modifier" => {
                set_f64(&mut msg.spin_modifier, "catch_pokemon_message", key, value)
            }
            "normalized_hit_position" => {
                set_f64(&mut msg.normalized_hit_position, "catch_pokemon_message", key, value)
            }
            _ => unknown_field("catch_pokemon_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_fort_details(args: &ArgMap) -> Vec<u8> {
    let mut msg = FortDetailsMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "fort_id" => set_string(&mut msg.fort_id, "fort_details_message", key, value),
            "latitude" => set_f64(&mut msg.latitude, "fort_details_message", key, value),
            "longitude" => set_f64(&mut msg.longitude, "fort_details_message", key, value),
            _ => unknown_field("fort_details_message", key),
        }
    }
    msg.encode_to_vec()
}

fn build_get_map_objects(args: &ArgMap) -> Vec<u8> {
    let mut msg = GetMapObjectsMessage::default();
    for (key, value) in args {
        match key.as_str() {
            "cell_id" => extend_u64(&mut msg.cell_id, "get_map_objects_message", key, value),
            "since_timestamp_ms" => {
                extend_i64(&mut msg.since_timestamp_ms, "get_map_objects_message", key, value)
            }
            "latitude" => set_f64(&mut msg.latitude, "get_map_objects_message", key, value),
            "longitude" => set_f64(&mut msg.longitude, "get_map_objects_message", key, value),
            _ => unknown_field("get_map_objects_message", key),
        }
    }
    msg.encode_to_vec()
}

fn unknown_field(proto_name: &str, key: &str) {
    tracing::warn!("argument {key} unknown inside {proto_name}");
}

fn mismatch(proto_name: &str, key: &str, value: &Value) {
    tracing::warn!("argument {key} with value {value} does not fit {proto_name}");
}

fn set_f64(field: &mut f64, proto_name: &str, key: &str, value: &Value) {
    match value.as_f64() {
        Some(v) => *field = v,
        None => mismatch(proto_name, key, value),
    }
}

fn set_i64(field: &mut i64, proto_name: &str, key: &str, value: &Value) {
    match value.as_i64() {
        Some(v) => *field = v,
        None => mismatch(proto_name, key, value),
    }
}

fn set_i32(field: &mut i32, proto_name: &str, key: &str, value: &Value) {
    match value.as_i64().and_then(|v| i32::try_from(v).ok()) {
        Some(v) => *field = v,
        None => mismatch(proto_name, key, value),
    }
}

fn set_u64(field: &mut u64, proto_name: &str, key: &str, value: &Value) {
    match value.as_u64() {
        Some(v) => *field = v,
        None => mismatch(proto_name, key, value),
    }
}

fn set_bool(field: &mut bool, proto_name: &str, key: &str, value: &Value) {
    match value.as_bool() {
        Some(v) => *field = v,
        None => mismatch(proto_name, key, value),
    }
}

fn set_string(field: &mut String, proto_name: &str, key: &str, value: &Value) {
    match value.as_str() {
        Some(v) => *field = v.to_owned(),
        None => mismatch(proto_name, key, value),
    }
}

// Repeated fields accept either an array or a single scalar, which is
// appended.
fn extend_u64(field: &mut Vec<u64>, proto_name: &str, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                match item.as_u64() {
                    Some(v) => field.push(v),
                    None => mismatch(proto_name, key, item),
                }
            }
        }
        other => match other.as_u64() {
            Some(v) => field.push(v),
            None => mismatch(proto_name, key, other),
        },
    }
}

fn extend_i64(field: &mut Vec<i64>, proto_name: &str, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                match item.as_i64() {
                    Some(v) => field.push(v),
                    None => mismatch(proto_name, key, item),
                }
            }
        }
        other => match other.as_i64() {
            Some(v) => field.push(v),
            None => mismatch(proto_name, key, other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{GetMapObjectsMessage, GetPlayerMessage};
    use crate::responses::GetPlayerResponse;

    fn args(value: Value) -> ArgMap {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn scalar_repeated_and_unknown_arguments() {
        let args = args(serde_json::json!({
            "cell_id": [1u64, 2, 3],
            "since_timestamp_ms": 0,
            "latitude": 47.5,
            "longitude": 19.05,
            "bogus": "ignored",
        }));
        let bytes = (descriptor(RequestType::GetMapObjects).build)(&args);
        let msg = GetMapObjectsMessage::decode(bytes.as_slice()).expect("decodes");
        assert_eq!(msg.cell_id, vec![1, 2, 3]);
        // a scalar offered to a repeated field is appended
        assert_eq!(msg.since_timestamp_ms, vec![0]);
        assert_eq!(msg.latitude, 47.5);
        assert_eq!(msg.longitude, 19.05);
    }

    #[test]
    fn nested_object_fills_the_locale() {
        let args = args(serde_json::json!({
            "player_locale": {
                "country": "US",
                "language": "en",
                "timezone": "America/Chicago",
                "dialect": "ignored",
            }
        }));
        let bytes = (descriptor(RequestType::GetPlayer).build)(&args);
        let msg = GetPlayerMessage::decode(bytes.as_slice()).expect("decodes");
        let locale = msg.player_locale.expect("locale set");
        assert_eq!(locale.country, "US");
        assert_eq!(locale.language, "en");
        assert_eq!(locale.timezone, "America/Chicago");
    }

    #[test]
    fn bare_messages_encode_empty() {
        let bytes = (descriptor(RequestType::GetHatchedEggs).build)(&ArgMap::new());
        assert!(bytes.is_empty());
    }

    #[test]
    fn responses_decode_by_type() {
        let bytes = GetPlayerResponse {
            success: true,
            ..Default::default()
        }
        .encode_to_vec();
        match (descriptor(RequestType::GetPlayer).parse)(&bytes) {
            ResponseMessage::GetPlayer(profile) => assert!(profile.success),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn undecodable_response_falls_back_to_raw() {
        // a lone field header with no value is not a valid message
        match (descriptor(RequestType::GetPlayer).parse)(&[0x08]) {
            ResponseMessage::Raw(bytes) => assert_eq!(bytes, vec![0x08]),
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
