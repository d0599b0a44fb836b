//! History log table (2520)
//!
//! The number of entries is the leading field of the table itself. Logs can
//! hold far more than one request carries; once a log was seen beyond the
//! request ceiling its entries are read in batches of at most 60 records.
//!
//! # Fields
//!
//! - header `number_of_entries` (u16), `sequence_number` (u32)
//! - per entry: `time` (time), `event_code` (u16), `argument` (u32)

use crate::config::TableConfig;
use crate::descriptions::DescriptionLookup;
use crate::layout::{Layout, LayoutContext};
use crate::record::Record;
use crate::spec::{CountSource, DEFAULT_BATCH_RECORDS, RecordSpec, TableSpec};
use crate::table::TableRecord;
use psem_codec::{ByteOrder, FieldKind};
use psem_core::{MeterTime, PsemError, PsemResult, TableId};
use psem_session::TableSession;

pub const HISTORY_LOG: TableId = TableId::new(2520);

pub fn spec(ctx: &LayoutContext) -> TableSpec {
    let header = Layout::builder()
        .field("number_of_entries", FieldKind::U16(ByteOrder::Big))
        .field("sequence_number", FieldKind::U32(ByteOrder::Big))
        .build();
    let entry = Layout::builder()
        .field("time", ctx.time())
        .field("event_code", FieldKind::U16(ByteOrder::Big))
        .field("argument", FieldKind::U32(ByteOrder::Big))
        .build();
    TableSpec::new(HISTORY_LOG, "History Log", header).with_records(
        RecordSpec::new(
            entry,
            CountSource::LeadingField {
                count_field: "number_of_entries",
            },
        )
        .with_batch_records(DEFAULT_BATCH_RECORDS),
    )
}

/// One logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub index: usize,
    pub time: MeterTime,
    pub event_code: u16,
    pub argument: u32,
}

impl HistoryEntry {
    /// Display text of the event code
    pub fn description<'a, L: DescriptionLookup + ?Sized>(&self, lookup: &'a L) -> Option<&'a str> {
        lookup.describe(self.event_code as u32)
    }
}

impl TryFrom<&Record> for HistoryEntry {
    type Error = PsemError;

    fn try_from(record: &Record) -> PsemResult<Self> {
        Ok(Self {
            index: record.index(),
            time: record.time("time")?,
            event_code: record.integer("event_code")?,
            argument: record.integer("argument")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLogTable {
    table: TableRecord,
}

impl HistoryLogTable {
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

    pub async fn number_of_entries<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u16> {
        self.table.integer(session, "number_of_entries").await
    }

    pub async fn sequence_number<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<u32> {
        self.table.integer(session, "sequence_number").await
    }

    pub async fn entries<S: TableSession + ?Sized>(&mut self, session: &mut S) -> PsemResult<Vec<HistoryEntry>> {
        self.table
            .records(session)
            .await?
            .iter()
            .map(HistoryEntry::try_from)
            .collect()
    }

    /// One entry fetched with a single offset read
    pub async fn entry<S: TableSession + ?Sized>(
        &mut self,
        session: &mut S,
        index: usize,
    ) -> PsemResult<HistoryEntry> {
        HistoryEntry::try_from(&self.table.read_record(session, index).await?)
    }
}
