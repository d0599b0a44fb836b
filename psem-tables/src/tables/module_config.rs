//! Module configuration table (2536)
//!
//! The only writable table of the catalog. Addresses are length-prefixed
//! byte strings in fixed 64-byte slots; writing a shorter address clears the
//! rest of the slot.
//!
//! # Fields
//!
//! - `primary_address`, `secondary_address` (1 length byte + 64-byte slot)
//! - `port` (u16)
//! - `options` (u8, bit flags)
//! - `retry_count` (u8): appended by newer firmware
//!
//! # Usage
//!
//! ```rust,no_run
//! use psem_session::{MemorySession, SessionSettings};
//! use psem_tables::tables::{ModuleConfigField, ModuleConfigTable};
//!
//! # async fn example(session: &mut MemorySession) -> psem_core::PsemResult<()> {
//! let mut table = ModuleConfigTable::new();
//! table.read(session).await?;
//! table.set_port(4059)?;
//! table.write_field(session, ModuleConfigField::Port).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::TableConfig;
use crate::layout::Layout;
use crate::spec::TableSpec;
use crate::table::TableRecord;
use psem_codec::{ByteOrder, FieldKind, FieldValue};
use psem_core::{PsemResult, TableId};
use psem_session::TableSession;
use std::fmt;

pub const MODULE_CONFIG: TableId = TableId::new(2536);

/// Capacity of an address slot
pub const ADDRESS_CAPACITY: usize = 64;

/// Writable fields of table 2536
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleConfigField {
    PrimaryAddress,
    SecondaryAddress,
    Port,
    Options,
    RetryCount,
}

impl ModuleConfigField {
    pub fn name(self) -> &'static str {
        match self {
            ModuleConfigField::PrimaryAddress => "primary_address",
            ModuleConfigField::SecondaryAddress => "secondary_address",
            ModuleConfigField::Port => "port",
            ModuleConfigField::Options => "options",
            ModuleConfigField::RetryCount => "retry_count",
        }
    }
}

impl fmt::Display for ModuleConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn spec() -> TableSpec {
    let header = Layout::builder()
        .writable("primary_address", FieldKind::Prefixed(ADDRESS_CAPACITY))
        .writable("secondary_address", FieldKind::Prefixed(ADDRESS_CAPACITY))
        .writable("port", FieldKind::U16(ByteOrder::Big))
        .writable("options", FieldKind::U8)
        .trailing_writable("retry_count", FieldKind::U8)
        .build();
    TableSpec::new(MODULE_CONFIG, "Module Configuration", header)
}

#[derive(Debug, Clone)]
pub struct ModuleConfigTable {
    table: TableRecord,
}

impl ModuleConfigTable {
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            table: TableRecord::new(spec(), config),
        }
    }

    pub fn table(&self) -> &TableRecord {
        &self.table
    }

    pub async fn read<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<()> {
        self.table.read(session).await
    }

    pub fn refresh(&mut self) {
        self.table.refresh();
    }

    pub async fn primary_address<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<Vec<u8>> {
        self.table.bytes(session, "primary_address").await
    }

    pub async fn secondary_address<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<Vec<u8>> {
        self.table.bytes(session, "secondary_address").await
    }

    pub async fn port<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u16> {
        self.table.integer(session, "port").await
    }

    pub async fn options<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u8> {
        self.table.integer(session, "options").await
    }

    pub async fn retry_count<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<Option<u8>> {
        self.table.optional_integer(session, "retry_count").await
    }

    /// Stage a new primary address; more than 64 bytes is rejected
    pub fn set_primary_address(&mut self, address: &[u8]) -> PsemResult<()> {
        self.set(ModuleConfigField::PrimaryAddress, FieldValue::Bytes(address.to_vec()))
    }

    pub fn set_secondary_address(&mut self, address: &[u8]) -> PsemResult<()> {
        self.set(ModuleConfigField::SecondaryAddress, FieldValue::Bytes(address.to_vec()))
    }

    pub fn set_port(&mut self, port: u16) -> PsemResult<()> {
        self.set(ModuleConfigField::Port, FieldValue::Unsigned(port as u64))
    }

    pub fn set_options(&mut self, options: u8) -> PsemResult<()> {
        self.set(ModuleConfigField::Options, FieldValue::Unsigned(options as u64))
    }

    /// Only possible once a read showed the firmware reports the field
    pub fn set_retry_count(&mut self, retry_count: u8) -> PsemResult<()> {
        self.set(ModuleConfigField::RetryCount, FieldValue::Unsigned(retry_count as u64))
    }

    /// Send the whole table with every staged change
    pub async fn write<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<()> {
        self.table.write(session).await
    }

    /// Send only the bytes of `field`
    pub async fn write_field<S: TableSession + ?Sized>(
        &mut self,
        session: &mut S,
        field: ModuleConfigField,
    ) -> PsemResult<()> {
        self.table.write_field(session, field.name()).await
    }

    fn set(&mut self, field: ModuleConfigField, value: FieldValue) -> PsemResult<()> {
        self.table.set_value(field.name(), value)
    }
}

impl Default for ModuleConfigTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TableState;
    use psem_core::PsemError;
    use psem_session::{MemorySession, SessionSettings};

    fn image(retry_count: Option<u8>) -> Vec<u8> {
        let mut image = vec![0u8; 130];
        image[0] = 7;
        image[1..8].copy_from_slice(b"1.2.3.4");
        image[65] = 3;
        image[66..69].copy_from_slice(b"::1");
        image.extend_from_slice(&[0x0F, 0xDB, 0x05]);
        image.extend(retry_count);
        image
    }

    fn session(retry_count: Option<u8>) -> MemorySession {
        MemorySession::new(SessionSettings::default()).with_table(MODULE_CONFIG, image(retry_count))
    }

    #[tokio::test]
    async fn test_read_fields() {
        let mut session = session(Some(4));
        let mut table = ModuleConfigTable::new();
        assert_eq!(table.primary_address(&mut session).await.unwrap(), b"1.2.3.4");
        assert_eq!(table.secondary_address(&mut session).await.unwrap(), b"::1");
        assert_eq!(table.port(&mut session).await.unwrap(), 4059);
        assert_eq!(table.options(&mut session).await.unwrap(), 5);
        assert_eq!(table.retry_count(&mut session).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_write_round_trip() {
        let mut session = session(Some(4));
        let mut table = ModuleConfigTable::new();
        table.read(&mut session).await.unwrap();

        table.set_primary_address(b"meter.example.net").unwrap();
        table.set_secondary_address(b"").unwrap();
        table.set_port(20000).unwrap();
        table.set_options(0x80).unwrap();
        table.set_retry_count(2).unwrap();
        table.write(&mut session).await.unwrap();
        assert_eq!(session.statistics().send_requests, 1);

        let mut reread = ModuleConfigTable::new();
        assert_eq!(reread.primary_address(&mut session).await.unwrap(), b"meter.example.net");
        assert!(reread.secondary_address(&mut session).await.unwrap().is_empty());
        assert_eq!(reread.port(&mut session).await.unwrap(), 20000);
        assert_eq!(reread.options(&mut session).await.unwrap(), 0x80);
        assert_eq!(reread.retry_count(&mut session).await.unwrap(), Some(2));
        // stale bytes of the longer secondary address are gone
        assert!(session.table(MODULE_CONFIG).unwrap()[65..130].iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_ten_byte_address_in_64_byte_slot() {
        let mut session = session(None);
        let mut table = ModuleConfigTable::new();
        table.read(&mut session).await.unwrap();
        let before = session.table(MODULE_CONFIG).unwrap().to_vec();

        table.set_primary_address(b"10.1.1.200").unwrap();
        table
            .write_field(&mut session, ModuleConfigField::PrimaryAddress)
            .await
            .unwrap();

        let after = session.table(MODULE_CONFIG).unwrap();
        assert_eq!(after[0], 10);
        assert_eq!(&after[1..11], b"10.1.1.200");
        assert!(after[11..65].iter().all(|b| *b == 0));
        assert_eq!(after[65..], before[65..]);
        assert_eq!(session.statistics().bytes_sent, 65);

        table.refresh();
        assert_eq!(table.primary_address(&mut session).await.unwrap(), b"10.1.1.200");
    }

    #[tokio::test]
    async fn test_write_field_port_only() {
        let mut session = session(None);
        let mut table = ModuleConfigTable::new();
        table.read(&mut session).await.unwrap();
        table.set_port(1).unwrap();
        table.write_field(&mut session, ModuleConfigField::Port).await.unwrap();
        assert_eq!(table.table().state(), TableState::Loaded);

        let mut expected = image(None);
        expected[130..132].copy_from_slice(&[0x00, 0x01]);
        assert_eq!(session.table(MODULE_CONFIG).unwrap(), expected.as_slice());
    }

    #[tokio::test]
    async fn test_oversized_address() {
        let mut table = ModuleConfigTable::new();
        assert!(matches!(
            table.set_primary_address(&[b'x'; 65]),
            Err(PsemError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_retry_count_needs_newer_firmware() {
        let mut session = session(None);
        let mut table = ModuleConfigTable::new();
        assert_eq!(table.retry_count(&mut session).await.unwrap(), None);
        assert!(matches!(
            table.set_retry_count(3),
            Err(PsemError::UnsupportedField { table: MODULE_CONFIG, .. })
        ));
    }
}
