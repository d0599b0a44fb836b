//! Replay of a previously captured session
//!
//! A capture holds full-table images recorded from a meter. Reads are served
//! from those images so the table engine decodes them exactly as it would
//! decode a live response; writes are refused.
//!
//! # Document format
//!
//! ```json
//! {
//!   "time_format": "seconds",
//!   "device_class": "cellular",
//!   "tables": [ { "id": 2508, "data": "000a00030035" } ]
//! }
//! ```

use crate::session::TableSession;
use crate::settings::SessionSettings;
use crate::statistics::SessionStatistics;
use async_trait::async_trait;
use bytes::Bytes;
use psem_core::{CommFailure, PsemError, PsemResult, ResponseCode, TableId, TimeFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One captured table image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedTable {
    pub id: TableId,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Serialized form of a capture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDocument {
    #[serde(default)]
    pub time_format: TimeFormat,
    #[serde(default)]
    pub device_class: String,
    pub tables: Vec<CapturedTable>,
}

/// Read-only session backed by captured table images
#[derive(Debug, Clone)]
pub struct CaptureSession {
    settings: SessionSettings,
    tables: HashMap<TableId, Bytes>,
    statistics: SessionStatistics,
}

impl CaptureSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            tables: HashMap::new(),
            statistics: SessionStatistics::new(),
        }
    }

    /// Build from a capture document
    ///
    /// When the same table appears more than once the last image wins.
    pub fn from_document(document: CaptureDocument) -> Self {
        let settings = SessionSettings::default()
            .with_time_format(document.time_format)
            .with_device_class(document.device_class);
        let mut session = Self::new(settings);
        for table in document.tables {
            session.insert_table(table.id, table.data);
        }
        session
    }

    /// Parse a JSON capture document
    pub fn from_json(json: &str) -> PsemResult<Self> {
        let document: CaptureDocument = serde_json::from_str(json)
            .map_err(|e| PsemError::InvalidData(format!("Invalid capture document: {}", e)))?;
        Ok(Self::from_document(document))
    }

    /// Load a JSON capture document from disk
    pub async fn load(path: impl AsRef<Path>) -> PsemResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            PsemError::InvalidData(format!("Cannot read capture {}: {}", path.display(), e))
        })?;
        let session = Self::from_json(&json)?;
        log::info!(
            "Loaded capture {} with {} tables",
            path.display(),
            session.tables.len()
        );
        Ok(session)
    }

    pub fn insert_table(&mut self, table: TableId, data: impl Into<Bytes>) {
        self.tables.insert(table, data.into());
    }

    /// Ids of all captured tables, ascending
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, table: TableId) -> bool {
        self.tables.contains_key(&table)
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    fn reject(&mut self, table: TableId, code: ResponseCode) -> PsemError {
        self.statistics.increment_failures();
        PsemError::communication(table, CommFailure::Response(code))
    }

    fn image(&mut self, table: TableId) -> PsemResult<Bytes> {
        match self.tables.get(&table) {
            Some(image) => Ok(image.clone()),
            None => Err(self.reject(table, ResponseCode::Iar)),
        }
    }
}

#[async_trait]
impl TableSession for CaptureSession {
    async fn fetch_table(&mut self, table: TableId) -> PsemResult<Bytes> {
        let image = self.image(table)?;
        self.statistics.record_fetch(image.len());
        Ok(image)
    }

    async fn fetch_range(
        &mut self,
        table: TableId,
        offset: usize,
        length: usize,
    ) -> PsemResult<Bytes> {
        let image = self.image(table)?;
        if offset + length > image.len() {
            return Err(self.reject(table, ResponseCode::Iar));
        }
        self.statistics.record_fetch(length);
        Ok(image.slice(offset..offset + length))
    }

    async fn send_table(&mut self, table: TableId, _data: &[u8]) -> PsemResult<()> {
        Err(self.reject(table, ResponseCode::Onp))
    }

    async fn send_range(&mut self, table: TableId, _offset: usize, _data: &[u8]) -> PsemResult<()> {
        Err(self.reject(table, ResponseCode::Onp))
    }

    fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(&compact).map_err(serde::de::Error::custom)
    }
}
