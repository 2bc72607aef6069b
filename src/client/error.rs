//! Error types for the appliance API client.
//!
//! Every failure surfaced by the client maps onto one of the coarse
//! [`ErrorKind`] classes. The orchestrator only ever branches on the class
//! (authentication failures invalidate the cached token, everything else does
//! not), so the variants keep their payloads as plain strings and the whole
//! enum stays [`Clone`] — a login attempt's outcome is shared with every
//! caller that blocked behind it.

use thiserror::Error;
use strum_macros::{AsRefStr, Display};

use super::wire::TOKEN_REJECTED_CODE;

/// Errors produced by the transport, token manager, and parser layers.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Credentials rejected, or the appliance refused the bearer token.
    #[error("authentication failed (code {code}): {message}")]
    Authentication {
        /// Application-level response code returned by the appliance.
        code: String,
        /// Human-readable message from the response body, if any.
        message: String,
    },

    /// Connection-level failure (refused, reset, DNS, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The configured request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// Response body did not match the expected envelope shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// HTTP 200 with an embedded non-success, non-auth application code.
    #[error("api error (code {code}): {message}")]
    Api {
        /// Application-level response code.
        code: String,
        /// Message from the response body.
        message: String,
    },

    /// A device record could not be parsed. Recovered per record by the
    /// parser; only surfaced when a whole payload is unusable.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid constructor input. Fatal at construction time.
    #[error("config error: {0}")]
    Config(String),
}

/// Coarse error classification used for statistics and orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    Authentication,
    Network,
    Parse,
    Config,
}

impl ApiError {
    /// Convert a `reqwest` failure into the matching variant.
    ///
    /// Not a `From` impl: `reqwest::Error` is not `Clone`, so the payload is
    /// flattened to a string here.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Classify this error into its coarse kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Api { code, .. } if code == TOKEN_REJECTED_CODE => ErrorKind::Authentication,
            Self::Network(_) | Self::Timeout | Self::Decode(_) | Self::Api { .. } => {
                ErrorKind::Network
            }
            Self::Parse(_) => ErrorKind::Parse,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// True when the failure means the appliance rejected our credentials or
    /// token. The orchestrator invalidates the cached credential on this.
    pub fn is_authentication(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_classification() {
        let err = ApiError::Authentication {
            code: "401001".to_string(),
            message: "bad password".to_string(),
        };
        assert!(err.is_authentication());
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_network_classification() {
        assert_eq!(
            ApiError::Network("connection refused".to_string()).kind(),
            ErrorKind::Network
        );
        assert_eq!(ApiError::Timeout.kind(), ErrorKind::Network);
        assert_eq!(
            ApiError::Decode("bad json".to_string()).kind(),
            ErrorKind::Network
        );
        assert!(!ApiError::Timeout.is_authentication());
    }

    #[test]
    fn test_api_code_401_is_authentication() {
        let err = ApiError::Api {
            code: "401".to_string(),
            message: "token expired".to_string(),
        };
        assert!(err.is_authentication());

        let err = ApiError::Api {
            code: "500100".to_string(),
            message: "internal".to_string(),
        };
        assert!(!err.is_authentication());
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::Authentication.to_string(), "authentication");
        assert_eq!(ErrorKind::Network.as_ref(), "network");
    }
}
