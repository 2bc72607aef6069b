//! Wire-format types for the appliance HTTP API.
//!
//! The appliance wraps every response in a JSON envelope carrying an
//! application-level `code` string. `"000000"` means success; anything else
//! is a failure even when the HTTP status is 200, so callers decode the
//! status-only shape first before committing to the success shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Application code indicating success.
pub const SUCCESS_CODE: &str = "000000";

/// Application code indicating the bearer token was rejected. Distinct from
/// a bare HTTP 401, but treated the same way.
pub const TOKEN_REJECTED_CODE: &str = "401";

/// Login request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Minimal envelope decoded before anything else.
///
/// The login endpoint names its message field `message`, the device-list
/// endpoint names it `msg`; the alias accepts both.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEnvelope {
    pub code: String,
    #[serde(alias = "msg", default)]
    pub message: String,
}

/// Successful login envelope.
#[derive(Debug, Deserialize)]
pub struct LoginEnvelope {
    pub code: String,
    #[serde(alias = "msg", default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<LoginData>,
}

/// Payload of a successful login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub device_id: String,
    pub token: String,
}

/// Device listing envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListEnvelope {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub current_page: i64,
    pub code: String,
    #[serde(alias = "message", default)]
    pub msg: String,
    /// Raw records, decoded individually by the parser so one malformed
    /// entry cannot fail the whole listing.
    #[serde(default)]
    pub data: Vec<Value>,
}

/// One device entry as the appliance sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceRecord {
    /// Identity block. Absent on corrupt entries.
    #[serde(default)]
    pub asset_device: Option<AssetDevice>,
    /// Telemetry map. Values arrive as strings, numbers, or booleans
    /// interchangeably.
    #[serde(default)]
    pub realtime: serde_json::Map<String, Value>,
    /// Whether the appliance currently sees the device online.
    #[serde(default)]
    pub connected: bool,
}

/// Device identity block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDevice {
    #[serde(default)]
    pub id: String,
    /// Numeric type code; sometimes a string on the wire.
    #[serde(default)]
    pub device_type: Value,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub alias: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_envelope_accepts_both_message_keys() {
        let login: StatusEnvelope =
            serde_json::from_str(r#"{"code":"000000","message":"ok"}"#).unwrap();
        assert_eq!(login.code, SUCCESS_CODE);
        assert_eq!(login.message, "ok");

        let list: StatusEnvelope =
            serde_json::from_str(r#"{"code":"401","msg":"token expired"}"#).unwrap();
        assert_eq!(list.code, TOKEN_REJECTED_CODE);
        assert_eq!(list.message, "token expired");
    }

    #[test]
    fn test_raw_record_tolerates_missing_blocks() {
        let record: RawDeviceRecord = serde_json::from_str(r#"{"connected":true}"#).unwrap();
        assert!(record.asset_device.is_none());
        assert!(record.realtime.is_empty());
        assert!(record.connected);
    }

    #[test]
    fn test_raw_record_full_shape() {
        let record: RawDeviceRecord = serde_json::from_str(
            r#"{
                "assetDevice": {"id":"ups-1","deviceType":1,"model":"C3K","alias":"rack"},
                "realtime": {"loadTotalWatt":"195","inputVolt1":236.8},
                "connected": true
            }"#,
        )
        .unwrap();
        let asset = record.asset_device.unwrap();
        assert_eq!(asset.id, "ups-1");
        assert_eq!(asset.model, "C3K");
        assert_eq!(record.realtime.len(), 2);
    }
}
