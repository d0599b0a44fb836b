//! Session-wide settings

use psem_core::TimeFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every table read over one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Largest number of table bytes requested in one transaction
    ///
    /// Determined empirically for the communication modules; larger
    /// requests are split into record batches.
    pub max_request_bytes: usize,
    /// Default per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// How timestamps are packed in tables read over this session
    pub time_format: TimeFormat,
    /// Device class reported by the meter, selects device-specific fields
    pub device_class: String,
}

impl SessionSettings {
    pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1400;
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = device_class.into();
        self
    }

    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_request_bytes: Self::DEFAULT_MAX_REQUEST_BYTES,
            request_timeout_ms: Self::DEFAULT_REQUEST_TIMEOUT_MS,
            time_format: TimeFormat::Seconds,
            device_class: String::new(),
        }
    }
}
