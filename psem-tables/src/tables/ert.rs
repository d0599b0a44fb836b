//! ERT tables (2508 and 2509)
//!
//! Table 2508 ("ERT Actual") is the dimension table of 2509 ("ERT Data"): it
//! reports how many ERT (encoder receiver transmitter) records the module
//! currently holds and how many bytes each record takes.
//!
//! # Fields of 2508
//!
//! - `max_records` (u16): capacity of the ERT list
//! - `number_of_data_records` (u16): records currently present in 2509
//! - `record_size` (u16): stride of one 2509 record in bytes
//!
//! # Fields of 2509
//!
//! - header `last_update` (time)
//! - per record: `ert_id` (u32), `consumption` (u32, little-endian),
//!   `rssi` (i8), `flags` (u8), `last_read` (time)
//!
//! `consumption` is the only little-endian field of the table. Newer firmware
//! pads records beyond the known layout; the stride from 2508 is honored.

use crate::config::TableConfig;
use crate::layout::{Layout, LayoutContext};
use crate::record::Record;
use crate::spec::{CountSource, RecordSpec, TableSpec};
use crate::table::TableRecord;
use psem_codec::{ByteOrder, FieldKind};
use psem_core::{MeterTime, PsemResult, TableId};
use psem_session::TableSession;

pub const ERT_ACTUAL: TableId = TableId::new(2508);
pub const ERT_DATA: TableId = TableId::new(2509);

/// Layout of table 2508
pub fn actual_spec() -> TableSpec {
    TableSpec::new(
        ERT_ACTUAL,
        "ERT Actual",
        Layout::builder()
            .field("max_records", FieldKind::U16(ByteOrder::Big))
            .field("number_of_data_records", FieldKind::U16(ByteOrder::Big))
            .field("record_size", FieldKind::U16(ByteOrder::Big))
            .build(),
    )
}

/// Layout of table 2509; timestamp width follows the session time format
pub fn data_spec(ctx: &LayoutContext) -> TableSpec {
    let header = Layout::builder().field("last_update", ctx.time()).build();
    let record = Layout::builder()
        .field("ert_id", FieldKind::U32(ByteOrder::Big))
        .field("consumption", FieldKind::U32(ByteOrder::Little))
        .field("rssi", FieldKind::I8)
        .field("flags", FieldKind::U8)
        .field("last_read", ctx.time())
        .build();
    TableSpec::new(ERT_DATA, "ERT Data", header).with_records(RecordSpec::new(
        record,
        CountSource::Dimension {
            table: Box::new(actual_spec()),
            count_field: "number_of_data_records",
            stride_field: Some("record_size"),
        },
    ))
}

/// Table 2508
#[derive(Debug, Clone)]
pub struct ErtActualTable {
    table: TableRecord,
}

impl ErtActualTable {
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            table: TableRecord::new(actual_spec(), config),
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

    pub async fn max_records<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u16> {
        self.table.integer(session, "max_records").await
    }

    pub async fn number_of_data_records<S: TableSession + ?Sized>(
        &mut self,
        session: &mut S,
    ) -> PsemResult<u16> {
        self.table.integer(session, "number_of_data_records").await
    }

    pub async fn record_size<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u16> {
        self.table.integer(session, "record_size").await
    }
}

impl Default for ErtActualTable {
    fn default() -> Self {
        Self::new()
    }
}

/// One ERT record of table 2509
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErtEntry {
    pub index: usize,
    pub ert_id: u32,
    pub consumption: u32,
    /// Received signal strength in dBm
    pub rssi: i8,
    pub flags: u8,
    pub last_read: MeterTime,
}

impl TryFrom<&Record> for ErtEntry {
    type Error = psem_core::PsemError;

    fn try_from(record: &Record) -> PsemResult<Self> {
        Ok(Self {
            index: record.index(),
            ert_id: record.integer("ert_id")?,
            consumption: record.integer("consumption")?,
            rssi: record.integer("rssi")?,
            flags: record.integer("flags")?,
            last_read: record.time("last_read")?,
        })
    }
}

/// Table 2509
///
/// Every full read re-reads 2508 first and resizes the buffer when the ERT
/// count changed.
#[derive(Debug, Clone)]
pub struct ErtDataTable {
    table: TableRecord,
}

impl ErtDataTable {
    pub fn new(ctx: &LayoutContext) -> Self {
        Self::with_config(ctx, TableConfig::default())
    }

    pub fn with_config(ctx: &LayoutContext, config: TableConfig) -> Self {
        Self {
            table: TableRecord::new(data_spec(ctx), config),
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

    pub async fn last_update<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<MeterTime> {
        self.table.time(session, "last_update").await
    }

    /// All ERT records, reading the table first if needed
    pub async fn entries<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<Vec<ErtEntry>> {
        self.table
            .records(session)
            .await?
            .iter()
            .map(ErtEntry::try_from)
            .collect()
    }

    /// One ERT record fetched with a single offset read
    pub async fn entry<S: TableSession + ?Sized>(
        &mut self,
        session: &mut S,
        index: usize,
    ) -> PsemResult<ErtEntry> {
        ErtEntry::try_from(&self.table.read_record(session, index).await?)
    }
}
