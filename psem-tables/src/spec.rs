//! Table definitions handed to the table engine

use crate::layout::Layout;
use psem_core::TableId;

/// Default number of records fetched per batched request
///
/// Conservative for the ~1400 byte transaction ceiling of the modules.
pub const DEFAULT_BATCH_RECORDS: usize = 60;

/// Where the number of records of a record array comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountSource {
    /// A field of a separate dimension ("actual") table, read first
    Dimension {
        table: Box<TableSpec>,
        count_field: &'static str,
        /// Field of the dimension table reporting the record size in bytes
        stride_field: Option<&'static str>,
    },
    /// A field in the table's own fixed header
    LeadingField { count_field: &'static str },
}

/// Repeated record array following the fixed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    pub layout: Layout,
    pub count: CountSource,
    pub batch_records: usize,
}

impl RecordSpec {
    pub fn new(layout: Layout, count: CountSource) -> Self {
        Self {
            layout,
            count,
            batch_records: DEFAULT_BATCH_RECORDS,
        }
    }

    pub fn with_batch_records(mut self, batch_records: usize) -> Self {
        self.batch_records = batch_records.max(1);
        self
    }
}

/// Complete description of one table definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub id: TableId,
    pub name: &'static str,
    pub header: Layout,
    pub records: Option<RecordSpec>,
}

impl TableSpec {
    pub fn new(id: TableId, name: &'static str, header: Layout) -> Self {
        Self {
            id,
            name,
            header,
            records: None,
        }
    }

    /// Add a record array after the header
    ///
    /// # Panics
    /// Panics if the header has trailing fields: records start right after
    /// the header, so its length must not depend on firmware.
    pub fn with_records(mut self, records: RecordSpec) -> Self {
        assert!(
            !self.header.has_trailing(),
            "table {} has a record array after optional header fields",
            self.id
        );
        self.records = Some(records);
        self
    }

    /// Size of the table before any dimension is known
    pub fn initial_len(&self) -> usize {
        self.header.minimum_len()
    }
}
