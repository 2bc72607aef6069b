//! HTTP transport for the appliance API.
//!
//! Owns the connection pool and performs the two wire operations: login and
//! device-list fetch. Response decoding is defensive: the status-only
//! envelope is decoded first because the appliance returns HTTP 200 with an
//! embedded failure code on application errors.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use url::Url;

use crate::config::ApplianceConfig;

use super::error::ApiError;
use super::wire::{
    DeviceListEnvelope, LoginEnvelope, LoginRequest, SUCCESS_CODE, StatusEnvelope,
    TOKEN_REJECTED_CODE,
};

/// Login endpoint path.
const LOGIN_PATH: &str = "api/v1/auth/login";

/// Device listing endpoint path.
const DEVICE_LIST_PATH: &str = "api/v1/deviceData/detail/list";

/// Fixed query for the device listing. The appliance pages its results; one
/// page of 100 covers every deployment this collector targets.
const DEVICE_LIST_QUERY: &[(&str, &str)] = &[
    ("current", "1"),
    ("pageSize", "100"),
    ("areaId", "00000000-0000-0000-0000-000000000000"),
    ("includeSubArea", "true"),
    ("pageNum", "1"),
    ("deviceType", "1"),
];

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    /// Appliance-side identifier the token was issued for.
    pub issued_device_id: String,
}

/// Remote appliance API surface.
///
/// The trait seam exists so the token manager and orchestrator can be
/// exercised against in-process fakes; [`HttpTransport`] is the production
/// implementation.
#[async_trait]
pub trait PowerApi: Send + Sync {
    /// Exchange credentials for a bearer session.
    ///
    /// # Errors
    /// `Authentication` for rejected credentials or any non-success
    /// application code; `Network`/`Timeout`/`Decode` for transport-level
    /// failures.
    async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError>;

    /// Fetch the raw device listing using a bearer token.
    ///
    /// # Errors
    /// `Authentication` for HTTP 401 or application code `"401"` so the
    /// caller can invalidate its cached token; `Api` for other embedded
    /// failure codes; `Network`/`Timeout`/`Decode` otherwise.
    async fn fetch_devices(&self, token: &str) -> Result<Vec<Value>, ApiError>;
}

/// Production transport backed by a pooled `reqwest` client.
///
/// The pool is reused across calls and released when the transport drops.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport from validated appliance settings.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the base URL does not parse or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &ApplianceConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{}': {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("invalid endpoint path '{}': {}", path, e)))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PowerApi for HttpTransport {
    async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.endpoint(LOGIN_PATH)?;
        tracing::debug!(url = %url, username = %username, "logging in to appliance");

        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(ApiError::from_request)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_request)?;
        classify_http_status(status)?;
        decode_login_body(&body)
    }

    async fn fetch_devices(&self, token: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.endpoint(DEVICE_LIST_PATH)?;

        let response = self
            .client
            .get(url)
            .query(DEVICE_LIST_QUERY)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::from_request)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_request)?;
        classify_http_status(status)?;
        decode_list_body(&body)
    }
}

/// Reject non-2xx statuses before looking at the body. HTTP 401 is always an
/// authentication failure regardless of endpoint.
fn classify_http_status(status: StatusCode) -> Result<(), ApiError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Authentication {
            code: TOKEN_REJECTED_CODE.to_string(),
            message: "http 401 unauthorized".to_string(),
        });
    }
    if !status.is_success() {
        return Err(ApiError::Network(format!("unexpected http status {}", status)));
    }
    Ok(())
}

/// Decode a login response body. Any non-success application code is an
/// authentication failure on this endpoint.
fn decode_login_body(body: &str) -> Result<Session, ApiError> {
    let status: StatusEnvelope = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("login envelope: {}", e)))?;
    if status.code != SUCCESS_CODE {
        return Err(ApiError::Authentication {
            code: status.code,
            message: status.message,
        });
    }

    let envelope: LoginEnvelope = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("login payload: {}", e)))?;
    let data = envelope
        .data
        .ok_or_else(|| ApiError::Decode("login response has no data block".to_string()))?;
    if data.token.is_empty() {
        return Err(ApiError::Decode("login response token is empty".to_string()));
    }

    Ok(Session {
        token: data.token,
        issued_device_id: data.device_id,
    })
}

/// Decode a device listing body. Code `"401"` means the token was rejected;
/// any other non-success code is an application error.
fn decode_list_body(body: &str) -> Result<Vec<Value>, ApiError> {
    let status: StatusEnvelope = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("listing envelope: {}", e)))?;
    if status.code == TOKEN_REJECTED_CODE {
        return Err(ApiError::Authentication {
            code: status.code,
            message: status.message,
        });
    }
    if status.code != SUCCESS_CODE {
        return Err(ApiError::Api {
            code: status.code,
            message: status.message,
        });
    }

    let envelope: DeviceListEnvelope = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("listing payload: {}", e)))?;
    tracing::debug!(
        total = envelope.total,
        page_size = envelope.page_size,
        page = envelope.current_page,
        records = envelope.data.len(),
        "device listing fetched"
    );
    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_login_success() {
        let body = r#"{"code":"000000","message":"success","data":{"deviceId":"gw-7","token":"tok-1"}}"#;
        let session = decode_login_body(body).unwrap();
        assert_eq!(session.token, "tok-1");
        assert_eq!(session.issued_device_id, "gw-7");
    }

    #[test]
    fn test_decode_login_rejected_code() {
        let body = r#"{"code":"401001","message":"invalid password"}"#;
        let err = decode_login_body(body).unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("401001"));
    }

    #[test]
    fn test_decode_login_missing_data() {
        let body = r#"{"code":"000000","message":"success"}"#;
        let err = decode_login_body(body).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_decode_login_garbage_body() {
        let err = decode_login_body("<html>gateway error</html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_decode_list_success() {
        let body = r#"{
            "total":1,"pageSize":100,"currentPage":1,"code":"000000","msg":"ok",
            "data":[{"assetDevice":{"id":"ups-1"},"realtime":{},"connected":true}]
        }"#;
        let records = decode_list_body(body).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_decode_list_token_rejected() {
        let body = r#"{"code":"401","msg":"token expired"}"#;
        let err = decode_list_body(body).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn test_decode_list_application_error() {
        let body = r#"{"code":"500100","msg":"area not found"}"#;
        let err = decode_list_body(body).unwrap_err();
        assert!(!err.is_authentication());
        assert!(matches!(err, ApiError::Api { .. }));
    }

    #[test]
    fn test_classify_http_status() {
        assert!(classify_http_status(StatusCode::OK).is_ok());
        assert!(classify_http_status(StatusCode::UNAUTHORIZED)
            .unwrap_err()
            .is_authentication());
        assert!(matches!(
            classify_http_status(StatusCode::BAD_GATEWAY).unwrap_err(),
            ApiError::Network(_)
        ));
    }
}
