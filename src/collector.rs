//! Collection orchestrator.
//!
//! Ties the token manager, transport, parser, and validator together behind
//! one operation: [`DeviceCollector::collect_devices`]. Connection status is
//! a single boolean derived from the most recent attempt; statistics are
//! updated atomically per attempt and readable without blocking.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::error::ApiError;
use crate::client::token::TokenManager;
use crate::client::transport::PowerApi;
use crate::device::record::DeviceRecord;
use crate::device::{parser, validate};
use crate::energy::{EnergySink, PowerReading};

/// Hard bound on one energy-sink hand-off. The sink is an external
/// collaborator and must never stall a collection cycle.
const SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// Monotonic counters and status for collection attempts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionStatistics {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Outcome of the most recent attempt.
    pub connected: bool,
}

/// Orchestrates one authenticated collection pass over the appliance.
///
/// Safe for concurrent use: parallel `collect_devices` calls serialize only
/// on the token cache and the statistics lock.
pub struct DeviceCollector {
    api: Arc<dyn PowerApi>,
    tokens: TokenManager,
    stats: Mutex<CollectionStatistics>,
    sink: Option<Arc<dyn EnergySink>>,
}

impl DeviceCollector {
    /// Create a collector over a transport and its token manager.
    pub fn new(api: Arc<dyn PowerApi>, tokens: TokenManager) -> Self {
        Self {
            api,
            tokens,
            stats: Mutex::new(CollectionStatistics::default()),
            sink: None,
        }
    }

    /// Attach a downstream energy sink. Its failures are isolated and only
    /// logged; they never surface through `collect_devices`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EnergySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run one collection attempt: token, fetch, parse, validate.
    ///
    /// Every call increments the attempt counter exactly once, whichever
    /// step fails. An authentication-class failure on the data call
    /// invalidates the cached token so the next attempt re-authenticates.
    ///
    /// # Errors
    /// The classified failure of the first step that did not complete.
    pub async fn collect_devices(&self) -> Result<Vec<DeviceRecord>, ApiError> {
        self.lock_stats().attempts += 1;

        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "collection aborted: no valid token");
                self.record_failure(&err);
                return Err(err);
            }
        };

        let raw = match self.api.fetch_devices(&token).await {
            Ok(raw) => raw,
            Err(err) => {
                if err.is_authentication() {
                    tracing::info!("appliance rejected token, invalidating cached credential");
                    self.tokens.invalidate().await;
                }
                tracing::warn!(error = %err, kind = %err.kind(), "device fetch failed");
                self.record_failure(&err);
                return Err(err);
            }
        };

        let records = parser::parse_records(&raw);
        let outcomes = validate::validate_batch(&records);
        for (record, outcome) in records.iter().zip(&outcomes) {
            for violation in &outcome.violations {
                tracing::warn!(
                    device = %record.id,
                    field = violation.field,
                    value = %violation.value,
                    "implausible reading: {}",
                    violation.message
                );
            }
        }

        self.record_success();
        tracing::debug!(devices = records.len(), "collection succeeded");

        let readings: Vec<PowerReading> = records
            .iter()
            .zip(&outcomes)
            .filter(|(record, outcome)| record.connected && !outcome.has_critical_errors())
            .map(|(record, _)| PowerReading {
                device_id: record.id.clone(),
                watts: record.telemetry.load_total_watt,
            })
            .collect();
        self.forward_to_sink(readings).await;

        Ok(records)
    }

    /// Snapshot of the collection statistics. Never blocks on collection.
    pub fn statistics(&self) -> CollectionStatistics {
        self.lock_stats().clone()
    }

    /// Whether the most recent attempt succeeded.
    pub fn is_connected(&self) -> bool {
        self.lock_stats().connected
    }

    fn record_failure(&self, err: &ApiError) {
        let mut stats = self.lock_stats();
        stats.failures += 1;
        stats.last_error = Some(err.to_string());
        stats.connected = false;
    }

    fn record_success(&self) {
        let mut stats = self.lock_stats();
        stats.successes += 1;
        stats.last_error = None;
        stats.last_success_at = Some(Utc::now());
        stats.connected = true;
    }

    fn lock_stats(&self) -> MutexGuard<'_, CollectionStatistics> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hand readings to the sink inside its own task, bounded by
    /// [`SINK_TIMEOUT`]. Errors, panics, and overruns are logged only.
    async fn forward_to_sink(&self, readings: Vec<PowerReading>) {
        let Some(sink) = &self.sink else {
            return;
        };
        if readings.is_empty() {
            return;
        }

        let sink = Arc::clone(sink);
        let task = tokio::spawn(async move { sink.accumulate(readings).await });
        match tokio::time::timeout(SINK_TIMEOUT, task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => {
                tracing::warn!(error = %err, "energy sink rejected readings");
            }
            Ok(Err(join_err)) => {
                tracing::warn!(error = %join_err, "energy sink task aborted");
            }
            Err(_) => {
                tracing::warn!(timeout = ?SINK_TIMEOUT, "energy sink timed out, readings dropped");
            }
        }
    }
}

impl std::fmt::Debug for DeviceCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCollector")
            .field("stats", &self.statistics())
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::Session;
    use crate::energy::EnergyError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake appliance API with a scripted sequence of fetch outcomes.
    struct ScriptedApi {
        logins: AtomicUsize,
        login_error: Option<ApiError>,
        fetches: Mutex<VecDeque<Result<Vec<Value>, ApiError>>>,
    }

    impl ScriptedApi {
        fn new() -> Self {
            Self {
                logins: AtomicUsize::new(0),
                login_error: None,
                fetches: Mutex::new(VecDeque::new()),
            }
        }

        fn failing_login(err: ApiError) -> Self {
            Self {
                login_error: Some(err),
                ..Self::new()
            }
        }

        fn push_fetch(&self, result: Result<Vec<Value>, ApiError>) {
            self.fetches.lock().unwrap().push_back(result);
        }

        fn login_count(&self) -> usize {
            self.logins.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PowerApi for ScriptedApi {
        async fn login(&self, _username: &str, _password: &str) -> Result<Session, ApiError> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.login_error {
                return Err(err.clone());
            }
            Ok(Session {
                token: "tok-1".to_string(),
                issued_device_id: "gw-1".to_string(),
            })
        }

        async fn fetch_devices(&self, _token: &str) -> Result<Vec<Value>, ApiError> {
            self.fetches
                .lock()
                .unwrap()
                .pop_front()
                // Default: one healthy device.
                .unwrap_or_else(|| Ok(vec![healthy_device("ups-1")]))
        }
    }

    fn healthy_device(id: &str) -> Value {
        json!({
            "assetDevice": {"id": id, "deviceType": 1, "model": "C3K", "alias": "rack"},
            "realtime": {"loadTotalWatt": "195", "inputVolt1": "236.8"},
            "connected": true
        })
    }

    fn collector(api: &Arc<ScriptedApi>) -> DeviceCollector {
        let tokens = TokenManager::new(
            Arc::clone(api) as Arc<dyn PowerApi>,
            "admin",
            "secret",
            Duration::from_secs(300),
        );
        DeviceCollector::new(Arc::clone(api) as Arc<dyn PowerApi>, tokens)
    }

    #[tokio::test]
    async fn test_successful_collection() {
        let api = Arc::new(ScriptedApi::new());
        let collector = collector(&api);

        let records = collector.collect_devices().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].telemetry.load_total_watt, 195.0);
        assert_eq!(records[0].telemetry.input_volt1, 236.8);

        let stats = collector.statistics();
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 0);
        assert!(stats.connected);
        assert!(stats.last_success_at.is_some());
        assert!(collector.is_connected());
    }

    #[tokio::test]
    async fn test_login_failure_aborts_before_fetch() {
        let api = Arc::new(ScriptedApi::failing_login(ApiError::Authentication {
            code: "401001".to_string(),
            message: "bad credentials".to_string(),
        }));
        let collector = collector(&api);

        let err = collector.collect_devices().await.unwrap_err();
        assert!(err.is_authentication());

        let stats = collector.statistics();
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.successes, 0);
        assert!(!stats.connected);
        assert!(stats.last_error.unwrap().contains("401001"));
    }

    #[tokio::test]
    async fn test_rejected_token_invalidates_and_relogs_in() {
        let api = Arc::new(ScriptedApi::new());
        api.push_fetch(Ok(vec![healthy_device("ups-1")]));
        api.push_fetch(Err(ApiError::Authentication {
            code: "401".to_string(),
            message: "token expired".to_string(),
        }));
        let collector = collector(&api);

        collector.collect_devices().await.unwrap();
        assert_eq!(api.login_count(), 1);

        let err = collector.collect_devices().await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!collector.is_connected());

        // Third attempt must perform a fresh login instead of reusing the
        // rejected token.
        collector.collect_devices().await.unwrap();
        assert_eq!(api.login_count(), 2);
        assert!(collector.is_connected());
    }

    #[tokio::test]
    async fn test_network_failure_keeps_token() {
        let api = Arc::new(ScriptedApi::new());
        api.push_fetch(Err(ApiError::Timeout));
        let collector = collector(&api);

        let err = collector.collect_devices().await.unwrap_err();
        assert!(!err.is_authentication());

        collector.collect_devices().await.unwrap();
        assert_eq!(api.login_count(), 1, "network failure must not force a re-login");
    }

    #[tokio::test]
    async fn test_bad_record_skipped_not_fatal() {
        let api = Arc::new(ScriptedApi::new());
        api.push_fetch(Ok(vec![
            healthy_device("ups-1"),
            json!({"assetDevice": {"id": ""}, "realtime": {}, "connected": true}),
        ]));
        let collector = collector(&api);

        let records = collector.collect_devices().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "ups-1");
        assert!(collector.is_connected());
    }

    #[tokio::test]
    async fn test_concurrent_collections() {
        let api = Arc::new(ScriptedApi::new());
        let collector = Arc::new(collector(&api));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let collector = Arc::clone(&collector);
            handles.push(tokio::spawn(async move { collector.collect_devices().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let stats = collector.statistics();
        assert_eq!(stats.attempts, 10);
        assert_eq!(stats.successes, 10);
        assert_eq!(stats.failures, 0);
    }

    struct PanickingSink;

    #[async_trait]
    impl EnergySink for PanickingSink {
        async fn accumulate(&self, _readings: Vec<PowerReading>) -> Result<(), EnergyError> {
            panic!("sink exploded");
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl EnergySink for RejectingSink {
        async fn accumulate(&self, _readings: Vec<PowerReading>) -> Result<(), EnergyError> {
            Err(EnergyError::Accumulation("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_panicking_sink_does_not_fail_collection() {
        let api = Arc::new(ScriptedApi::new());
        let collector = collector(&api).with_sink(Arc::new(PanickingSink));

        let records = collector.collect_devices().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(collector.is_connected());
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_fail_collection() {
        let api = Arc::new(ScriptedApi::new());
        let collector = collector(&api).with_sink(Arc::new(RejectingSink));

        assert!(collector.collect_devices().await.is_ok());
        assert_eq!(collector.statistics().successes, 1);
    }
}
