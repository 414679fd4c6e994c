//! Signal-log synthesis: the sensor/location plausibility record attached
//! to every envelope.
//!
//! Every distribution here matches observed client traffic; the shapes
//! are part of the wire contract, so resist the urge to tidy them.

use rand::Rng;

use pogo_types::signal::{DeviceInfo, IosDeviceInfo, LocationUpdate, SensorUpdate, SignalLog};

use crate::DeviceProfile;
use crate::sample::{self, Accuracy};
use crate::state::RpcState;

/// Fixed per protocol version.
const VERSION_HASH: i64 = 0x4AE2_2D46_61C8_3701;

pub(crate) struct SignalParams<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: Accuracy,
    pub device_info: Option<&'a DeviceProfile>,
}

/// Builds the signal log for one envelope; the three oracle hashes are
/// filled in by the engine once the hash task joins.
pub(crate) fn build_signal(
    state: &RpcState,
    rng: &mut impl Rng,
    now_ms: u64,
    params: &SignalParams<'_>,
) -> SignalLog {
    let start = state.start_time_ms(now_ms, rng);
    let timestamp_ms_since_start = (now_ms - start) as i64;

    let mut location = LocationUpdate {
        name: "fused".to_owned(),
        timestamp_ms: timestamp_ms_since_start - sample::triangular_int(rng, 320, 3000, 1000),
        latitude: params.latitude,
        longitude: params.longitude,
        altitude: params
            .altitude
            .unwrap_or_else(|| sample::uniform(rng, 150.0, 250.0)),
        provider_status: 3,
        location_type: 1,
        ..Default::default()
    };
    if rng.gen_bool(0.15) {
        // no reading for roughly 1 in 7 updates
        location.device_course = -1.0;
        location.device_speed = -1.0;
    } else {
        location.device_course = state.next_course(rng);
        location.device_speed = sample::triangular(rng, 0.25, 9.7, 8.2);
    }
    match params.accuracy {
        Accuracy::Float(value) => {
            location.horizontal_accuracy =
                sample::weighted(rng, &[(value, 50), (65.0, 40), (200.0, 10)]);
            location.vertical_accuracy = match rng.gen_range(0u32..100) {
                0..=49 => sample::uniform(rng, 10.0, 96.0),
                50..=72 => 10.0,
                73..=85 => 12.0,
                86..=92 => 16.0,
                93..=97 => 24.0,
                _ => 32.0,
            };
        }
        Accuracy::Fixed(value) => {
            location.horizontal_accuracy = f64::from(value);
            location.vertical_accuracy = if value >= 10 {
                sample::weighted(
                    rng,
                    &[
                        (6.0, 4),
                        (8.0, 34),
                        (10.0, 35),
                        (12.0, 11),
                        (16.0, 4),
                        (24.0, 8),
                        (32.0, 3),
                        (48.0, 1),
                    ],
                )
            } else {
                sample::weighted(
                    rng,
                    &[
                        (3.0, 15),
                        (4.0, 39),
                        (6.0, 14),
                        (8.0, 13),
                        (10.0, 14),
                        (12.0, 5),
                    ],
                )
            };
        }
    }

    let mut sensor = SensorUpdate {
        timestamp: timestamp_ms_since_start - sample::triangular_int(rng, 93, 4900, 3000),
        acceleration_x: sample::triangular(rng, -1.7, 1.2, 0.0),
        acceleration_y: sample::triangular(rng, -1.4, 1.9, 0.0),
        acceleration_z: sample::triangular(rng, -1.4, 0.9, 0.0),
        attitude_pitch: sample::triangular(rng, -1.5, 1.5, 0.4),
        attitude_yaw: sample::triangular(rng, -3.1, 3.1, 0.198),
        attitude_roll: sample::triangular(rng, -2.8, 3.04, 0.0),
        rotation_rate_x: sample::triangular(rng, -4.7, 3.9, 0.0),
        rotation_rate_y: sample::triangular(rng, -4.7, 4.3, 0.0),
        rotation_rate_z: sample::triangular(rng, -4.7, 6.5, 0.0),
        gravity_x: sample::triangular(rng, -1.0, 1.0, 0.0),
        gravity_y: sample::triangular(rng, -1.0, 1.0, -0.2),
        gravity_z: sample::triangular(rng, -1.0, 0.7, -0.7),
        status: 3,
        ..Default::default()
    };
    sensor.magnetic_field_accuracy =
        sample::weighted(rng, &[(-1, 8), (0, 2), (1, 42), (2, 48)]);
    if sensor.magnetic_field_accuracy >= 0 {
        let (x, y, z) = state.magnetic_field(rng);
        sensor.magnetic_field_x = x;
        sensor.magnetic_field_y = y;
        sensor.magnetic_field_z = z;
    }

    SignalLog {
        timestamp_ms_since_start,
        location_updates: vec![location],
        sensor_updates: vec![sensor],
        device_info: params.device_info.map(apply_device_profile),
        ios_device_info: Some(IosDeviceInfo { bool5: true }),
        session_hash: state.session_hash().to_vec(),
        epoch_timestamp_ms: now_ms as i64,
        version_hash: VERSION_HASH,
        ..Default::default()
    }
}

fn apply_device_profile(profile: &DeviceProfile) -> DeviceInfo {
    let mut info = DeviceInfo::default();
    for (key, value) in profile {
        let field = match key.as_str() {
            "device_id" => &mut info.device_id,
            "android_board_name" => &mut info.android_board_name,
            "android_bootloader" => &mut info.android_bootloader,
            "device_brand" => &mut info.device_brand,
            "device_model" => &mut info.device_model,
            "device_model_identifier" => &mut info.device_model_identifier,
            "device_model_boot" => &mut info.device_model_boot,
            "hardware_manufacturer" => &mut info.hardware_manufacturer,
            "hardware_model" => &mut info.hardware_model,
            "firmware_brand" => &mut info.firmware_brand,
            "firmware_tags" => &mut info.firmware_tags,
            "firmware_type" => &mut info.firmware_type,
            "firmware_fingerprint" => &mut info.firmware_fingerprint,
            _ => {
                tracing::warn!("device profile key {key} unknown inside device_info");
                continue;
            }
        };
        *field = value.clone();
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params(accuracy: Accuracy) -> SignalParams<'static> {
        SignalParams {
            latitude: 47.5,
            longitude: 19.05,
            altitude: None,
            accuracy,
            device_info: None,
        }
    }

    #[test]
    fn fresh_session_timestamps() {
        let state = RpcState::new();
        let mut rng = StdRng::seed_from_u64(41);
        let now = 1_700_000_000_000u64;
        let signal = build_signal(&state, &mut rng, now, &params(Accuracy::Fixed(10)));
        assert_eq!(
            signal.timestamp_ms_since_start,
            signal.epoch_timestamp_ms - state.start_time_ms(now, &mut rng) as i64
        );
        assert!((6000..=10_000).contains(&signal.timestamp_ms_since_start));
        let location = &signal.location_updates[0];
        let offset = signal.timestamp_ms_since_start - location.timestamp_ms;
        assert!((320..=3000).contains(&offset), "location offset {offset}");
        let sensor = &signal.sensor_updates[0];
        let offset = signal.timestamp_ms_since_start - sensor.timestamp;
        assert!((93..=4900).contains(&offset), "sensor offset {offset}");
    }

    #[test]
    fn fixed_accuracy_echoes_into_horizontal() {
        let state = RpcState::new();
        let mut rng = StdRng::seed_from_u64(43);
        for _ in 0..200 {
            let signal = build_signal(&state, &mut rng, 1_700_000_000_000, &params(Accuracy::Fixed(5)));
            let location = &signal.location_updates[0];
            assert_eq!(location.horizontal_accuracy, 5.0);
            assert!([3.0, 4.0, 6.0, 8.0, 10.0, 12.0].contains(&location.vertical_accuracy));
        }
    }

    #[test]
    fn magnetic_components_zeroed_without_reading() {
        let state = RpcState::new();
        let mut rng = StdRng::seed_from_u64(47);
        let mut saw_unread = false;
        for _ in 0..500 {
            let signal =
                build_signal(&state, &mut rng, 1_700_000_000_000, &params(Accuracy::Fixed(30)));
            let sensor = &signal.sensor_updates[0];
            if sensor.magnetic_field_accuracy == -1 {
                saw_unread = true;
                assert_eq!(sensor.magnetic_field_x, 0.0);
                assert_eq!(sensor.magnetic_field_y, 0.0);
                assert_eq!(sensor.magnetic_field_z, 0.0);
            }
        }
        assert!(saw_unread, "8% bucket never hit in 500 draws");
    }

    #[test]
    fn given_altitude_is_echoed() {
        let state = RpcState::new();
        let mut rng = StdRng::seed_from_u64(53);
        let signal = build_signal(
            &state,
            &mut rng,
            1_700_000_000_000,
            &SignalParams {
                altitude: Some(100.0),
                ..params(Accuracy::Fixed(10))
            },
        );
        assert_eq!(signal.location_updates[0].altitude, 100.0);
    }

    #[test]
    fn device_profile_population_skips_unknown_keys() {
        let mut profile = DeviceProfile::new();
        profile.insert("device_brand".to_owned(), "Apple".to_owned());
        profile.insert("firmware_type".to_owned(), "10.3.1".to_owned());
        profile.insert("bogus_key".to_owned(), "ignored".to_owned());
        let info = apply_device_profile(&profile);
        assert_eq!(info.device_brand, "Apple");
        assert_eq!(info.firmware_type, "10.3.1");
        assert_eq!(info.device_id, "");
    }
}
