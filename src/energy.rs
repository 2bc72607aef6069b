//! Downstream energy accumulation.
//!
//! The collector hands each online device's power reading to an
//! [`EnergySink`] after a successful cycle. The sink is an optional
//! collaborator: the orchestrator isolates its failures, panics, and
//! overruns so they can never abort a collection call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// One device's instantaneous power reading.
#[derive(Debug, Clone, Serialize)]
pub struct PowerReading {
    pub device_id: String,
    pub watts: f64,
}

/// Errors from a sink implementation.
#[derive(Debug, Error)]
pub enum EnergyError {
    #[error("accumulation failed: {0}")]
    Accumulation(String),
}

/// Consumer of per-cycle power readings.
#[async_trait]
pub trait EnergySink: Send + Sync {
    /// Ingest the readings from one collection cycle.
    async fn accumulate(&self, readings: Vec<PowerReading>) -> Result<(), EnergyError>;
}

/// Accumulated energy for one device.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyTotal {
    /// Integrated consumption in watt-hours.
    pub watt_hours: f64,
    /// Most recent power reading in watts.
    pub last_watts: f64,
    /// When that reading arrived.
    pub last_seen: DateTime<Utc>,
}

/// In-memory accumulator integrating power over wall-clock time.
///
/// Left-rectangle integration: each new reading closes the interval since
/// the previous one at the previous power level.
#[derive(Debug, Default)]
pub struct EnergyAccumulator {
    totals: Mutex<HashMap<String, EnergyTotal>>,
}

impl EnergyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all per-device totals.
    pub fn totals(&self) -> HashMap<String, EnergyTotal> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, EnergyTotal>> {
        self.totals.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ingest(&self, readings: Vec<PowerReading>, now: DateTime<Utc>) {
        let mut totals = self.lock();
        for reading in readings {
            match totals.get_mut(&reading.device_id) {
                Some(total) => {
                    let elapsed = (now - total.last_seen).num_milliseconds().max(0) as f64;
                    total.watt_hours += total.last_watts * elapsed / 3_600_000.0;
                    total.last_watts = reading.watts;
                    total.last_seen = now;
                }
                None => {
                    totals.insert(
                        reading.device_id,
                        EnergyTotal {
                            watt_hours: 0.0,
                            last_watts: reading.watts,
                            last_seen: now,
                        },
                    );
                }
            }
        }
    }
}

#[async_trait]
impl EnergySink for EnergyAccumulator {
    async fn accumulate(&self, readings: Vec<PowerReading>) -> Result<(), EnergyError> {
        let count = readings.len();
        self.ingest(readings, Utc::now());
        tracing::debug!(readings = count, "energy readings accumulated");
        Ok(())
    }
}
