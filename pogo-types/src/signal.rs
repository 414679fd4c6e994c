//! The signal log: the sensor/location plausibility record that accompanies
//! every RPC as an encrypted type-6 platform extension.

use prost::Message;

/// Sensor/location record serialized, encrypted, and attached to each
/// envelope.
#[derive(Clone, PartialEq, Message)]
pub struct SignalLog {
    /// Milliseconds since the simulated app start.
    #[prost(int64, tag = "2")]
    pub timestamp_ms_since_start: i64,
    /// Recent location fixes; the client sends exactly one.
    #[prost(message, repeated, tag = "4")]
    pub location_updates: Vec<LocationUpdate>,
    /// Recent sensor snapshots; the client sends exactly one.
    #[prost(message, repeated, tag = "7")]
    pub sensor_updates: Vec<SensorUpdate>,
    /// Device identity as configured by the caller.
    #[prost(message, optional, tag = "8")]
    pub device_info: Option<DeviceInfo>,
    /// iOS-specific flags.
    #[prost(message, optional, tag = "9")]
    pub ios_device_info: Option<IosDeviceInfo>,
    /// Hash of the location keyed by the auth ticket.
    #[prost(sfixed32, tag = "10")]
    pub location_hash_by_token_seed: i32,
    /// Hash of the location alone.
    #[prost(sfixed32, tag = "20")]
    pub location_hash: i32,
    /// Per-client random 16-byte session hash.
    #[prost(bytes = "vec", tag = "22")]
    pub session_hash: Vec<u8>,
    /// Wall-clock timestamp of this record, epoch milliseconds.
    #[prost(int64, tag = "23")]
    pub epoch_timestamp_ms: i64,
    /// One hash per subrequest, in envelope order.
    #[prost(sfixed64, repeated, tag = "24")]
    pub request_hashes: Vec<i64>,
    /// Fixed per protocol version.
    #[prost(int64, tag = "25")]
    pub version_hash: i64,
}

/// One location fix inside the signal log.
#[derive(Clone, PartialEq, Message)]
pub struct LocationUpdate {
    /// Fix provider; always `"fused"`.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Fix timestamp, milliseconds since app start.
    #[prost(int64, tag = "2")]
    pub timestamp_ms: i64,
    /// Latitude echoing the envelope.
    #[prost(double, tag = "13")]
    pub latitude: f64,
    /// Longitude echoing the envelope.
    #[prost(double, tag = "14")]
    pub longitude: f64,
    /// Reported altitude in meters.
    #[prost(double, tag = "18")]
    pub altitude: f64,
    /// Horizontal accuracy in meters.
    #[prost(double, tag = "20")]
    pub horizontal_accuracy: f64,
    /// Vertical accuracy in meters.
    #[prost(double, tag = "21")]
    pub vertical_accuracy: f64,
    /// Heading in degrees, or -1 when no reading is available.
    #[prost(double, tag = "22")]
    pub device_course: f64,
    /// Speed in m/s, or -1 when no reading is available.
    #[prost(double, tag = "23")]
    pub device_speed: f64,
    /// Always 3.
    #[prost(int64, tag = "26")]
    pub provider_status: i64,
    /// Always 1.
    #[prost(int64, tag = "28")]
    pub location_type: i64,
}

/// One sensor snapshot inside the signal log.
#[derive(Clone, PartialEq, Message)]
pub struct SensorUpdate {
    /// Snapshot timestamp, milliseconds since app start.
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    /// Accelerometer X.
    #[prost(double, tag = "3")]
    pub acceleration_x: f64,
    /// Accelerometer Y.
    #[prost(double, tag = "4")]
    pub acceleration_y: f64,
    /// Accelerometer Z.
    #[prost(double, tag = "5")]
    pub acceleration_z: f64,
    /// Magnetometer X; zero when no reading.
    #[prost(double, tag = "6")]
    pub magnetic_field_x: f64,
    /// Magnetometer Y; zero when no reading.
    #[prost(double, tag = "7")]
    pub magnetic_field_y: f64,
    /// Magnetometer Z; zero when no reading.
    #[prost(double, tag = "8")]
    pub magnetic_field_z: f64,
    /// Magnetometer accuracy class, -1 when no reading.
    #[prost(int32, tag = "9")]
    pub magnetic_field_accuracy: i32,
    /// Attitude pitch in radians.
    #[prost(double, tag = "10")]
    pub attitude_pitch: f64,
    /// Attitude yaw in radians.
    #[prost(double, tag = "11")]
    pub attitude_yaw: f64,
    /// Attitude roll in radians.
    #[prost(double, tag = "12")]
    pub attitude_roll: f64,
    /// Gyroscope X.
    #[prost(double, tag = "13")]
    pub rotation_rate_x: f64,
    /// Gyroscope Y.
    #[prost(double, tag = "14")]
    pub rotation_rate_y: f64,
    /// Gyroscope Z.
    #[prost(double, tag = "15")]
    pub rotation_rate_z: f64,
    /// Gravity vector X.
    #[prost(double, tag = "16")]
    pub gravity_x: f64,
    /// Gravity vector Y.
    #[prost(double, tag = "17")]
    pub gravity_y: f64,
    /// Gravity vector Z.
    #[prost(double, tag = "18")]
    pub gravity_z: f64,
    /// Always 3.
    #[prost(int32, tag = "19")]
    pub status: i32,
}

/// Device identity block, populated verbatim from the caller's profile.
#[derive(Clone, PartialEq, Message)]
pub struct DeviceInfo {
    /// Vendor device identifier.
    #[prost(string, tag = "1")]
    pub device_id: String,
    /// Android board name; empty on iOS profiles.
    #[prost(string, tag = "2")]
    pub android_board_name: String,
    /// Android bootloader; empty on iOS profiles.
    #[prost(string, tag = "3")]
    pub android_bootloader: String,
    /// Device brand, e.g. `"Apple"`.
    #[prost(string, tag = "4")]
    pub device_brand: String,
    /// Marketing model, e.g. `"iPhone"`.
    #[prost(string, tag = "5")]
    pub device_model: String,
    /// Internal model identifier, e.g. `"iPhone8,1"`.
    #[prost(string, tag = "6")]
    pub device_model_identifier: String,
    /// Boot model string.
    #[prost(string, tag = "7")]
    pub device_model_boot: String,
    /// Hardware manufacturer.
    #[prost(string, tag = "8")]
    pub hardware_manufacturer: String,
    /// Hardware model.
    #[prost(string, tag = "9")]
    pub hardware_model: String,
    /// Firmware brand, e.g. `"iOS"`.
    #[prost(string, tag = "10")]
    pub firmware_brand: String,
    /// Firmware tags; Android only.
    #[prost(string, tag = "12")]
    pub firmware_tags: String,
    /// Firmware type, e.g. `"10.3.1"`.
    #[prost(string, tag = "13")]
    pub firmware_type: String,
    /// Firmware fingerprint; Android only.
    #[prost(string, tag = "14")]
    pub firmware_fingerprint: String,
}

/// iOS flag block.
#[derive(Clone, PartialEq, Message)]
pub struct IosDeviceInfo {
    /// Set on every request from an iOS-profiled client.
    #[prost(bool, tag = "5")]
    pub bool5: bool,
}
