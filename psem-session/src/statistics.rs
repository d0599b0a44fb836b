//! Session statistics collection

/// Counters for the requests a session has served
///
/// Useful to verify that partial reads move fewer bytes than full reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    /// Number of fetch requests (full and range)
    pub fetch_requests: u64,
    /// Number of send requests (full and range)
    pub send_requests: u64,
    /// Table bytes returned by fetches
    pub bytes_received: u64,
    /// Table bytes carried by sends
    pub bytes_sent: u64,
    /// Requests answered with a non-ok response code
    pub failures: u64,
}

impl SessionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn record_fetch(&mut self, bytes: usize) {
        self.fetch_requests += 1;
        self.bytes_received += bytes as u64;
    }

    pub fn record_send(&mut self, bytes: usize) {
        self.send_requests += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn increment_failures(&mut self) {
        self.failures += 1;
    }

    /// Total requests answered successfully
    pub fn total_requests(&self) -> u64 {
        self.fetch_requests + self.send_requests
    }
}
