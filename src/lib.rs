//! Wattline - Appliance Telemetry Library
//!
//! This crate provides the core functionality for the Wattline power
//! monitoring collector. It can be used as a library by other Rust projects,
//! or run as a standalone binary with the `wattline` executable.
//!
//! # Architecture
//!
//! - **Client**: authenticated transport and bearer-token lifecycle for the
//!   appliance HTTP API
//! - **Device**: tolerant field parsing into the canonical telemetry schema,
//!   plus physical-plausibility validation
//! - **Collector**: the orchestrated collection pass with statistics
//! - **Energy**: optional downstream watt-hour accumulation
//! - **Server**: read-only status API over the collector
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wattline::{ApplianceConfig, DeviceCollector, HttpTransport, PowerApi, TokenManager};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApplianceConfig::new("https://10.0.0.5:8443", "admin", "secret");
//! let transport: Arc<dyn PowerApi> = Arc::new(HttpTransport::new(&config)?);
//! let tokens = TokenManager::new(
//!     Arc::clone(&transport),
//!     config.username.clone(),
//!     config.password.clone(),
//!     config.refresh_threshold,
//! );
//! let collector = DeviceCollector::new(transport, tokens);
//!
//! let devices = collector.collect_devices().await?;
//! println!("collected {} devices", devices.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod collector;
pub mod config;
pub mod device;
pub mod energy;
pub mod server;

pub use client::{ApiError, Credential, ErrorKind, HttpTransport, PowerApi, Session, TokenManager};
pub use collector::{CollectionStatistics, DeviceCollector};
pub use config::{AppConfig, ApplianceConfig, ConfigError};
pub use device::{DeviceRecord, Telemetry, ValidationOutcome, validate, validate_batch};
pub use energy::{EnergyAccumulator, EnergySink, PowerReading};
