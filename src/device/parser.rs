//! Tolerant parser from raw appliance records to [`DeviceRecord`].
//!
//! Telemetry parsing never fails: malformed individual fields degrade to
//! their zero value through the coercion rules in [`fields`]. Only a record
//! whose identity cannot be established is rejected, and a bad record is
//! skipped with a log line rather than failing the whole listing.

use chrono::Utc;
use serde_json::Value;

use crate::client::error::ApiError;
use crate::client::wire::RawDeviceRecord;

use super::fields::{self, keys};
use super::record::{DeviceRecord, Telemetry};

/// Parse a whole listing, skipping records that fail identity-level parsing.
///
/// Partial success is preferred over all-or-nothing failure: the skipped
/// index is logged and the remainder of the listing is still returned.
pub fn parse_records(raw: &[Value]) -> Vec<DeviceRecord> {
    let mut records = Vec::with_capacity(raw.len());
    for (index, value) in raw.iter().enumerate() {
        match parse_record(value) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping unparseable device record");
            }
        }
    }
    records
}

/// Parse one raw record.
///
/// # Errors
/// Returns `ApiError::Parse` when the entry is not a device record at all or
/// carries no usable identity (missing identity block, empty id). Telemetry
/// problems never produce an error.
pub fn parse_record(value: &Value) -> Result<DeviceRecord, ApiError> {
    let raw: RawDeviceRecord = serde_json::from_value(value.clone())
        .map_err(|e| ApiError::Parse(format!("malformed device record: {}", e)))?;

    let asset = raw
        .asset_device
        .ok_or_else(|| ApiError::Parse("record has no identity block".to_string()))?;
    if asset.id.is_empty() {
        return Err(ApiError::Parse("device id is empty".to_string()));
    }

    let telemetry = parse_telemetry(&raw.realtime);

    Ok(DeviceRecord {
        id: asset.id,
        device_type: fields::to_f64("deviceType", Some(&asset.device_type)) as i64,
        model: asset.model,
        alias: asset.alias,
        connected: raw.connected,
        telemetry,
        raw: raw.realtime,
        collected_at: Utc::now(),
    })
}

/// Normalize the dynamically-typed telemetry map into the fixed schema.
fn parse_telemetry(realtime: &serde_json::Map<String, Value>) -> Telemetry {
    let f = |key: &str| fields::to_f64(key, realtime.get(key));
    let b = |key: &str| fields::to_bool(key, realtime.get(key));
    let s = |key: &str| fields::to_string(key, realtime.get(key));

    Telemetry {
        load_total_watt: f(keys::LOAD_TOTAL_WATT),
        load_total_va: f(keys::LOAD_TOTAL_VA),
        input_volt1: f(keys::INPUT_VOLT1),
        input_volt2: f(keys::INPUT_VOLT2),
        input_volt3: f(keys::INPUT_VOLT3),
        output_volt1: f(keys::OUTPUT_VOLT1),
        output_volt2: f(keys::OUTPUT_VOLT2),
        output_volt3: f(keys::OUTPUT_VOLT3),
        battery_volt: f(keys::BATTERY_VOLT),
        output_current1: f(keys::OUTPUT_CURRENT1),
        output_current2: f(keys::OUTPUT_CURRENT2),
        output_current3: f(keys::OUTPUT_CURRENT3),
        input_freq: f(keys::INPUT_FREQ),
        output_freq: f(keys::OUTPUT_FREQ),
        load_percent: f(keys::LOAD_PERCENT),
        battery_capacity: f(keys::BATTERY_CAPACITY),
        battery_remain_time: f(keys::BATTERY_REMAIN_TIME),
        battery_charging: b(keys::BATTERY_CHARGING),
        temperature: f(keys::TEMPERATURE),
        work_mode: s(keys::WORK_MODE),
        status: s(keys::STATUS),
        fault_code: s(keys::FAULT_CODE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record(realtime: Value) -> Value {
        json!({
            "assetDevice": {
                "id": "ups-1",
                "deviceType": 1,
                "model": "C3K",
                "alias": "rack-a"
            },
            "realtime": realtime,
            "connected": true
        })
    }

    #[test]
    fn test_parse_record_basic() {
        let value = sample_record(json!({
            "loadTotalWatt": "195",
            "inputVolt1": "236.8",
            "batteryCharging": "1",
            "workMode": "Line"
        }));

        let record = parse_record(&value).unwrap();
        assert_eq!(record.id, "ups-1");
        assert_eq!(record.device_type, 1);
        assert_eq!(record.model, "C3K");
        assert_eq!(record.alias, "rack-a");
        assert!(record.connected);
        assert_eq!(record.telemetry.load_total_watt, 195.0);
        assert_eq!(record.telemetry.input_volt1, 236.8);
        assert!(record.telemetry.battery_charging);
        assert_eq!(record.telemetry.work_mode, "Line");
        // Unsent fields hold their zero value.
        assert_eq!(record.telemetry.output_freq, 0.0);
        assert_eq!(record.telemetry.status, "");
    }

    #[test]
    fn test_parse_record_retains_raw_map() {
        let value = sample_record(json!({
            "loadTotalWatt": 120,
            "futureVendorField": "42"
        }));

        let record = parse_record(&value).unwrap();
        assert_eq!(record.raw.get("futureVendorField"), Some(&json!("42")));
    }

    #[test]
    fn test_string_and_numeric_payloads_parse_identically() {
        let as_strings = sample_record(json!({
            "loadTotalWatt": "195",
            "inputVolt1": "236.8",
            "outputFreq1": "50",
            "batteryCapacity": "87.5"
        }));
        let as_numbers = sample_record(json!({
            "loadTotalWatt": 195,
            "inputVolt1": 236.8,
            "outputFreq1": 50,
            "batteryCapacity": 87.5
        }));

        let a = parse_record(&as_strings).unwrap();
        let b = parse_record(&as_numbers).unwrap();
        assert_eq!(a.telemetry, b.telemetry);
    }

    #[test]
    fn test_parse_record_rejects_missing_identity() {
        assert!(parse_record(&Value::Null).is_err());
        assert!(parse_record(&json!({"realtime": {}, "connected": false})).is_err());

        let empty_id = json!({
            "assetDevice": {"id": "", "deviceType": 1},
            "realtime": {},
            "connected": true
        });
        assert!(parse_record(&empty_id).is_err());
    }

    #[test]
    fn test_parse_records_skips_bad_entries() {
        let listing = vec![
            sample_record(json!({"loadTotalWatt": "100"})),
            json!({"assetDevice": {"id": ""}, "realtime": {}}),
            Value::Null,
            sample_record(json!({"loadTotalWatt": "200"})),
        ];

        let records = parse_records(&listing);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].telemetry.load_total_watt, 100.0);
        assert_eq!(records[1].telemetry.load_total_watt, 200.0);
    }

    #[test]
    fn test_malformed_telemetry_degrades_to_zero() {
        let value = sample_record(json!({
            "loadTotalWatt": "garbage",
            "inputVolt1": [236.8],
            "batteryCapacity": ""
        }));

        let record = parse_record(&value).unwrap();
        assert_eq!(record.telemetry.load_total_watt, 0.0);
        assert_eq!(record.telemetry.input_volt1, 0.0);
        assert_eq!(record.telemetry.battery_capacity, 0.0);
    }
}
