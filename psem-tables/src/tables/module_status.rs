//! Module status table (2510)
//!
//! # Fields
//!
//! - `firmware_version`, `firmware_revision` (u8), `firmware_build` (u16)
//! - `module_state` (u8) and `signal_strength` (i8, dBm): updated by the
//!   module on its own, re-read on every access
//! - `uptime` (u32, seconds)
//! - `carrier` (16 byte text): cellular modules only
//! - `last_reset` (time) and `reset_count` (u16): appended by newer firmware

use crate::config::TableConfig;
use crate::layout::{Layout, LayoutContext};
use crate::spec::TableSpec;
use crate::table::TableRecord;
use psem_codec::{ByteOrder, FieldKind};
use psem_core::{MeterTime, PsemResult, TableId};
use psem_session::TableSession;

pub const MODULE_STATUS: TableId = TableId::new(2510);

/// Device class carrying the `carrier` field
pub const CELLULAR_DEVICE_CLASS: &str = "cellular";

pub fn spec(ctx: &LayoutContext) -> TableSpec {
    let header = Layout::builder()
        .field("firmware_version", FieldKind::U8)
        .field("firmware_revision", FieldKind::U8)
        .field("firmware_build", FieldKind::U16(ByteOrder::Big))
        .fresh("module_state", FieldKind::U8)
        .fresh("signal_strength", FieldKind::I8)
        .field("uptime", FieldKind::U32(ByteOrder::Big))
        .when(ctx.is_device_class(CELLULAR_DEVICE_CLASS), |b| {
            b.field("carrier", FieldKind::Text(16))
        })
        .trailing("last_reset", ctx.time())
        .trailing("reset_count", FieldKind::U16(ByteOrder::Big))
        .build();
    TableSpec::new(MODULE_STATUS, "Module Status", header)
}

#[derive(Debug, Clone)]
pub struct ModuleStatusTable {
    table: TableRecord,
}

impl ModuleStatusTable {
    pub fn new(ctx: &LayoutContext) -> Self {
        Self::with_config(ctx, TableConfig::default())
    }

    pub fn with_config(ctx: &LayoutContext, config: TableConfig) -> Self {
        Self {
            table: TableRecord::new(spec(ctx), config),
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

    /// Firmware as `version.revision.build`
    pub async fn firmware<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<String> {
        let version: u8 = self.table.integer(session, "firmware_version").await?;
        let revision: u8 = self.table.integer(session, "firmware_revision").await?;
        let build: u16 = self.table.integer(session, "firmware_build").await?;
        Ok(format!("{}.{}.{}", version, revision, build))
    }

    pub async fn firmware_version<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u8> {
        self.table.integer(session, "firmware_version").await
    }

    pub async fn firmware_revision<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u8> {
        self.table.integer(session, "firmware_revision").await
    }

    pub async fn firmware_build<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u16> {
        self.table.integer(session, "firmware_build").await
    }

    /// Current module state, always read from the device
    pub async fn module_state<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u8> {
        self.table.integer(session, "module_state").await
    }

    /// Current signal strength in dBm, always read from the device
    pub async fn signal_strength<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<i8> {
        self.table.integer(session, "signal_strength").await
    }

    pub async fn uptime<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u32> {
        self.table.integer(session, "uptime").await
    }

    /// Carrier name; `None` on modules that are not cellular
    pub async fn carrier<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<Option<String>> {
        if self.table.spec().header.field("carrier").is_none() {
            return Ok(None);
        }
        self.table.optional_text(session, "carrier").await
    }

    pub async fn last_reset<S: TableSession + ?Sized>(
        &mut self,
        session: &mut S,
    ) -> PsemResult<Option<MeterTime>> {
        self.table.optional_time(session, "last_reset").await
    }

    pub async fn reset_count<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<Option<u16>> {
        self.table.optional_integer(session, "reset_count").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psem_core::{PsemError, TimeFormat};
    use psem_session::{MemorySession, SessionSettings};

    /// Mandatory part of the table without the carrier
    fn base_image() -> Vec<u8> {
        let mut image = vec![2, 7, 0x01, 0x2C, 3, 0xC4];
        image.extend_from_slice(&86_400u32.to_be_bytes());
        image
    }

    fn session(image: Vec<u8>) -> MemorySession {
        MemorySession::new(SessionSettings::default()).with_table(MODULE_STATUS, image)
    }

    #[tokio::test]
    async fn test_minimum_table() {
        let mut session = session(base_image());
        let mut table = ModuleStatusTable::new(&LayoutContext::default());
        assert_eq!(table.firmware(&mut session).await.unwrap(), "2.7.300");
        assert_eq!(table.uptime(&mut session).await.unwrap(), 86_400);
        assert_eq!(table.last_reset(&mut session).await.unwrap(), None);
        assert_eq!(table.reset_count(&mut session).await.unwrap(), None);
        assert_eq!(table.carrier(&mut session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_newer_firmware_trailing_fields() {
        let mut image = base_image();
        image.extend_from_slice(&1_600_000_000u32.to_be_bytes());
        image.extend_from_slice(&12u16.to_be_bytes());
        let mut session = session(image);
        let mut table = ModuleStatusTable::new(&LayoutContext::default());

        assert_eq!(table.firmware(&mut session).await.unwrap(), "2.7.300");
        assert_eq!(
            table.last_reset(&mut session).await.unwrap(),
            Some(MeterTime::from_seconds(1_600_000_000))
        );
        assert_eq!(table.reset_count(&mut session).await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_cellular_carrier() {
        let mut image = base_image();
        image.extend_from_slice(b"Carrier One\0\0\0\0\0");
        let mut session = session(image);
        let ctx = LayoutContext::new(TimeFormat::Seconds, "Cellular");
        let mut table = ModuleStatusTable::new(&ctx);
        assert_eq!(
            table.carrier(&mut session).await.unwrap().as_deref(),
            Some("Carrier One")
        );
    }

    #[tokio::test]
    async fn test_cellular_table_too_short() {
        let mut session = session(base_image());
        let ctx = LayoutContext::new(TimeFormat::Seconds, CELLULAR_DEVICE_CLASS);
        let mut table = ModuleStatusTable::new(&ctx);
        assert!(matches!(
            table.read(&mut session).await,
            Err(PsemError::UndersizedBuffer { table: MODULE_STATUS, minimum: 26, actual: 10 })
        ));
    }

    #[tokio::test]
    async fn test_fresh_fields_bypass_cache() {
        let mut session = session(base_image());
        let mut table = ModuleStatusTable::new(&LayoutContext::default());
        table.read(&mut session).await.unwrap();
        assert_eq!(table.signal_strength(&mut session).await.unwrap(), -60);

        let mut image = base_image();
        image[4] = 5;
        image[5] = 0xB0;
        session.insert_table(MODULE_STATUS, image);
        assert_eq!(table.module_state(&mut session).await.unwrap(), 5);
        assert_eq!(table.signal_strength(&mut session).await.unwrap(), -80);
        // cached fields are not re-read
        assert_eq!(table.uptime(&mut session).await.unwrap(), 86_400);
        assert_eq!(session.statistics().fetch_requests, 4);
    }
}
