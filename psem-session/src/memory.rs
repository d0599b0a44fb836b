//! Simulated meter holding table images in memory

use crate::session::TableSession;
use crate::settings::SessionSettings;
use crate::statistics::SessionStatistics;
use async_trait::async_trait;
use bytes::Bytes;
use psem_core::{CommFailure, PsemError, PsemResult, ResponseCode, TableId};
use std::collections::HashMap;
use std::time::Duration;

/// In-memory device answering table reads and echoing writes
///
/// Every send updates the stored image, so a write followed by a read sees
/// the written bytes. Faults can be injected per request to exercise error
/// paths: a specific fetch can be answered with a response code and every
/// response can be delayed.
#[derive(Debug, Default)]
pub struct MemorySession {
    settings: SessionSettings,
    tables: HashMap<TableId, Vec<u8>>,
    statistics: SessionStatistics,
    fetch_count: usize,
    fetch_faults: HashMap<usize, ResponseCode>,
    send_fault: Option<ResponseCode>,
    delay: Option<Duration>,
}

impl MemorySession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Builder-style variant of `insert_table`
    pub fn with_table(mut self, table: TableId, data: impl Into<Vec<u8>>) -> Self {
        self.insert_table(table, data);
        self
    }

    /// Replace the image of a table
    pub fn insert_table(&mut self, table: TableId, data: impl Into<Vec<u8>>) {
        self.tables.insert(table, data.into());
    }

    /// Current image of a table
    pub fn table(&self, table: TableId) -> Option<&[u8]> {
        self.tables.get(&table).map(Vec::as_slice)
    }

    /// Answer the `nth` fetch request (1-based, counted from now on) with `code`
    pub fn fail_fetch(&mut self, nth: usize, code: ResponseCode) {
        self.fetch_faults.insert(self.fetch_count + nth, code);
    }

    /// Answer every send request with `code`, `None` to clear
    pub fn fail_sends(&mut self, code: Option<ResponseCode>) {
        self.send_fault = code;
    }

    /// Delay every response by `delay`
    pub fn set_delay(&mut self, delay: Option<Duration>) {
        self.delay = delay;
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    pub fn settings_mut(&mut self) -> &mut SessionSettings {
        &mut self.settings
    }

    async fn respond(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn reject(&mut self, table: TableId, code: ResponseCode) -> PsemError {
        self.statistics.increment_failures();
        PsemError::communication(table, CommFailure::Response(code))
    }

    fn begin_fetch(&mut self, table: TableId) -> PsemResult<()> {
        self.fetch_count += 1;
        match self.fetch_faults.remove(&self.fetch_count) {
            Some(code) => Err(self.reject(table, code)),
            None => Ok(()),
        }
    }

    fn image(&mut self, table: TableId) -> PsemResult<&mut Vec<u8>> {
        if !self.tables.contains_key(&table) {
            return Err(self.reject(table, ResponseCode::Iar));
        }
        self.tables
            .get_mut(&table)
            .ok_or_else(|| PsemError::communication(table, CommFailure::Response(ResponseCode::Iar)))
    }
}

#[async_trait]
impl TableSession for MemorySession {
    async fn fetch_table(&mut self, table: TableId) -> PsemResult<Bytes> {
        self.respond().await;
        self.begin_fetch(table)?;
        let data = Bytes::copy_from_slice(self.image(table)?.as_slice());
        log::debug!("Simulated full read of table {}: {} bytes", table, data.len());
        self.statistics.record_fetch(data.len());
        Ok(data)
    }

    async fn fetch_range(
        &mut self,
        table: TableId,
        offset: usize,
        length: usize,
    ) -> PsemResult<Bytes> {
        self.respond().await;
        self.begin_fetch(table)?;
        let image = self.image(table)?;
        if offset + length > image.len() {
            return Err(self.reject(table, ResponseCode::Iar));
        }
        let data = Bytes::copy_from_slice(&image[offset..offset + length]);
        log::debug!(
            "Simulated offset read of table {}: {} bytes at {}",
            table,
            length,
            offset
        );
        self.statistics.record_fetch(data.len());
        Ok(data)
    }

    async fn send_table(&mut self, table: TableId, data: &[u8]) -> PsemResult<()> {
        self.respond().await;
        if let Some(code) = self.send_fault {
            return Err(self.reject(table, code));
        }
        self.tables.insert(table, data.to_vec());
        self.statistics.record_send(data.len());
        Ok(())
    }

    async fn send_range(&mut self, table: TableId, offset: usize, data: &[u8]) -> PsemResult<()> {
        self.respond().await;
        if let Some(code) = self.send_fault {
            return Err(self.reject(table, code));
        }
        let image = self.image(table)?;
        if offset + data.len() > image.len() {
            return Err(self.reject(table, ResponseCode::Iar));
        }
        image[offset..offset + data.len()].copy_from_slice(data);
        self.statistics.record_send(data.len());
        Ok(())
    }

    fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}
