//! Telemetry field vocabulary and coercion rules.
//!
//! The appliance sends telemetry as a flat map keyed by a fixed vendor
//! vocabulary, with values arriving as strings, numbers, or booleans
//! interchangeably. All coercion lives here as pure functions so the parser
//! never type-switches on its own: numeric fields degrade to `0.0`, boolean
//! fields to `false`, string fields to `""` instead of failing the record.

use serde_json::Value;

/// Vendor field names, exactly as they appear in the `realtime` map.
pub mod keys {
    pub const LOAD_TOTAL_WATT: &str = "loadTotalWatt";
    pub const LOAD_TOTAL_VA: &str = "loadTotalVa";
    pub const INPUT_VOLT1: &str = "inputVolt1";
    pub const INPUT_VOLT2: &str = "inputVolt2";
    pub const INPUT_VOLT3: &str = "inputVolt3";
    pub const OUTPUT_VOLT1: &str = "outputVolt1";
    pub const OUTPUT_VOLT2: &str = "outputVolt2";
    pub const OUTPUT_VOLT3: &str = "outputVolt3";
    pub const BATTERY_VOLT: &str = "batteryVolt";
    pub const OUTPUT_CURRENT1: &str = "outputCurrent1";
    pub const OUTPUT_CURRENT2: &str = "outputCurrent2";
    pub const OUTPUT_CURRENT3: &str = "outputCurrent3";
    pub const INPUT_FREQ: &str = "inputFreq1";
    pub const OUTPUT_FREQ: &str = "outputFreq1";
    pub const LOAD_PERCENT: &str = "loadPercent";
    pub const BATTERY_CAPACITY: &str = "batteryCapacity";
    pub const BATTERY_REMAIN_TIME: &str = "batteryRemainTime";
    pub const BATTERY_CHARGING: &str = "batteryCharging";
    pub const TEMPERATURE: &str = "emsTemp";
    pub const WORK_MODE: &str = "workMode";
    pub const STATUS: &str = "upsStatus";
    pub const FAULT_CODE: &str = "faultCode";
}

/// Coerce a telemetry value to `f64`.
///
/// Numeric-looking strings are parsed with standard decimal parsing; an
/// empty string is `0.0`; a non-numeric string is `0.0` and logged, not
/// raised. Any non-string, non-number type is `0.0`.
pub fn to_f64(field: &str, value: Option<&Value>) -> f64 {
    match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return 0.0;
            }
            match trimmed.parse::<f64>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    tracing::debug!(field, value = %s, "non-numeric telemetry value, using 0");
                    0.0
                }
            }
        }
        Some(other) => {
            tracing::debug!(field, value = %other, "unexpected type for numeric field, using 0");
            0.0
        }
    }
}

/// Coerce a telemetry value to `bool`.
///
/// The strings `"1"` and `"true"` (any letter case) are true, every other
/// string is false. Numbers are true when non-zero. Native booleans pass
/// through; absence is false.
pub fn to_bool(field: &str, value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0) != 0.0,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed == "1" || trimmed.eq_ignore_ascii_case("true")
        }
        Some(other) => {
            tracing::debug!(field, value = %other, "unexpected type for boolean field, using false");
            false
        }
    }
}

/// Coerce a telemetry value to `String`.
///
/// Native strings pass through; numbers and booleans are stringified;
/// absence is the empty string.
pub fn to_string(field: &str, value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => {
            tracing::debug!(field, value = %other, "unexpected type for string field, using empty");
            String::new()
        }
    }
}
