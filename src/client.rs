//! Appliance API client.
//!
//! Everything needed to talk to the remote power-monitoring appliance:
//!
//! - [`HttpTransport`]: wire-level login and device-list calls over a pooled
//!   HTTP client, behind the [`PowerApi`] trait seam
//! - [`TokenManager`]: cached bearer credential with proactive refresh and
//!   single-flight login
//! - [`ApiError`]: the error taxonomy shared by the whole collection pipeline

pub mod error;
pub mod token;
pub mod transport;
pub mod wire;

pub use error::{ApiError, ErrorKind};
pub use token::{Credential, TokenManager};
pub use transport::{HttpTransport, PowerApi, Session};
pub use wire::{RawDeviceRecord, SUCCESS_CODE, TOKEN_REJECTED_CODE};
