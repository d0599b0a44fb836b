//! Session trait consumed by the table engine

use crate::settings::SessionSettings;
use async_trait::async_trait;
use bytes::Bytes;
use psem_core::{CommFailure, PsemError, PsemResult, TableId, TimeFormat};
use std::future::Future;
use std::time::Duration;

/// Request/response access to the tables of one meter
///
/// Implementations perform one blocking round trip per call; the table engine
/// never issues a second request before the previous one completed. Any
/// transport, timeout or response-code failure is reported as
/// `PsemError::Communication`.
///
/// # Offsets
/// `offset` and `length` are byte positions inside the table, exactly as the
/// PSEM offset read/write services carry them.
#[async_trait]
pub trait TableSession: Send {
    /// Full table read; the device decides how many bytes it returns
    async fn fetch_table(&mut self, table: TableId) -> PsemResult<Bytes>;

    /// Offset read of `length` bytes starting at `offset`
    async fn fetch_range(&mut self, table: TableId, offset: usize, length: usize)
    -> PsemResult<Bytes>;

    /// Full table write
    async fn send_table(&mut self, table: TableId, data: &[u8]) -> PsemResult<()>;

    /// Offset write of `data` starting at `offset`
    async fn send_range(&mut self, table: TableId, offset: usize, data: &[u8]) -> PsemResult<()>;

    /// Settings in effect for this session
    fn settings(&self) -> &SessionSettings;

    /// Timestamp packing used by the meter
    fn time_format(&self) -> TimeFormat {
        self.settings().time_format
    }

    /// Device class string reported by the meter
    fn device_class(&self) -> &str {
        &self.settings().device_class
    }
}

/// Run one session request under `timeout`
///
/// An elapsed timeout surfaces as the same communication failure type as any
/// other transport error.
pub async fn with_timeout<T, F>(table: TableId, timeout: Duration, request: F) -> PsemResult<T>
where
    F: Future<Output = PsemResult<T>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => {
            log::debug!("Request for table {} timed out after {:?}", table, timeout);
            Err(PsemError::communication(table, CommFailure::Timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result() {
        let result = with_timeout(TableId::new(2508), Duration::from_millis(100), async {
            Ok::<_, PsemError>(7u8)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed() {
        let result: PsemResult<()> =
            with_timeout(TableId::new(2508), Duration::from_millis(5), async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert_eq!(
            result.unwrap_err(),
            PsemError::communication(TableId::new(2508), CommFailure::Timeout)
        );
    }
}
