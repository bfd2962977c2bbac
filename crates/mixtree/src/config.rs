use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing knobs of a [`Dispatcher`](crate::Dispatcher).
///
/// Every field has a default, so a partial (or empty) JSON object is a valid
/// configuration:
///
/// ```
/// use mixtree::DispatcherConfig;
///
/// let config = DispatcherConfig::from_json(r#"{"query_timeout_ms": 2000}"#).unwrap();
/// assert_eq!(config.retry_interval_ms, 500);
/// assert_eq!(config.query_timeout_ms, Some(2000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Delay between re-sends of an unanswered query.
    pub retry_interval_ms: u64,
    /// Give up on a query after this long. `None` retries forever.
    pub query_timeout_ms: Option<u64>,
    /// Timeout of the single round trip used to read a whole container
    /// during recursive discovery.
    pub round_trip_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 500,
            query_timeout_ms: None,
            round_trip_timeout_ms: 1000,
        }
    }
}

impl DispatcherConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.max(1))
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    pub fn round_trip_timeout(&self) -> Duration {
        Duration::from_millis(self.round_trip_timeout_ms)
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }
}
