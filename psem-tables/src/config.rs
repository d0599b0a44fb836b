//! Per-table configuration

use psem_session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Overrides applied to one table on top of the session settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Request timeout in milliseconds, session default when unset
    pub request_timeout_ms: Option<u64>,
    /// Records per batched request, table default when unset
    pub batch_records: Option<usize>,
}

impl TableConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_batch_records(mut self, batch_records: usize) -> Self {
        self.batch_records = Some(batch_records);
        self
    }

    pub fn request_timeout(&self, settings: &SessionSettings) -> Duration {
        self.request_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| settings.request_timeout())
    }

    pub fn batch_records(&self, table_default: usize) -> usize {
        self.batch_records.unwrap_or(table_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let settings = SessionSettings::default();
        let config = TableConfig::default();
        assert_eq!(config.request_timeout(&settings), settings.request_timeout());
        assert_eq!(config.batch_records(60), 60);

        let config = TableConfig::default()
            .with_request_timeout(Duration::from_millis(250))
            .with_batch_records(10);
        assert_eq!(config.request_timeout(&settings), Duration::from_millis(250));
        assert_eq!(config.batch_records(60), 10);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TableConfig = serde_json::from_str(r#"{ "batch_records": 20 }"#).unwrap();
        assert_eq!(config.batch_records, Some(20));
        assert_eq!(config.request_timeout_ms, None);
    }
}
