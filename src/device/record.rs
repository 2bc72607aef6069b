//! Canonical device record: the fixed-schema output of the parser.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Fixed-layout electrical telemetry for one device.
///
/// Fields the appliance did not send hold their zero value. Battery
/// remaining time is in minutes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Telemetry {
    /// Active load in watts.
    pub load_total_watt: f64,
    /// Apparent load in volt-amperes.
    pub load_total_va: f64,
    pub input_volt1: f64,
    pub input_volt2: f64,
    pub input_volt3: f64,
    pub output_volt1: f64,
    pub output_volt2: f64,
    pub output_volt3: f64,
    pub battery_volt: f64,
    pub output_current1: f64,
    pub output_current2: f64,
    pub output_current3: f64,
    /// Input frequency in hertz. Zero means the appliance did not report it.
    pub input_freq: f64,
    /// Output frequency in hertz. Zero means the appliance did not report it.
    pub output_freq: f64,
    /// Load as a percentage of rated capacity.
    pub load_percent: f64,
    /// Battery state of charge as a percentage.
    pub battery_capacity: f64,
    /// Estimated runtime left on battery, in minutes.
    pub battery_remain_time: f64,
    pub battery_charging: bool,
    /// Enclosure temperature in degrees Celsius.
    pub temperature: f64,
    pub work_mode: String,
    pub status: String,
    pub fault_code: String,
}

/// One device's identity and telemetry, independent of the vendor wire
/// format. Immutable once returned by the parser.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRecord {
    pub id: String,
    /// Vendor numeric type code.
    pub device_type: i64,
    pub model: String,
    pub alias: String,
    /// Whether the appliance reported the device online.
    pub connected: bool,
    pub telemetry: Telemetry,
    /// The original untyped telemetry map, kept for fields not yet promoted
    /// to the fixed schema.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub raw: Map<String, Value>,
    /// When this record was collected.
    pub collected_at: DateTime<Utc>,
}
