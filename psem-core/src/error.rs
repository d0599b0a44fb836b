use crate::response_code::ResponseCode;
use crate::table_id::TableId;
use thiserror::Error;

/// Nature of a failed exchange with the session collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommFailure {
    #[error("request timed out")]
    Timeout,

    #[error("device answered {0}")]
    Response(ResponseCode),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Main error type for manufacturing table operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PsemError {
    #[error("Communication error on table {table}: {failure}")]
    Communication { table: TableId, failure: CommFailure },

    #[error("Table {table} undersized: need at least {minimum} bytes, got {actual}")]
    UndersizedBuffer {
        table: TableId,
        minimum: usize,
        actual: usize,
    },

    #[error("Table {table} does not support field '{field}': {reason}")]
    UnsupportedField {
        table: TableId,
        field: String,
        reason: String,
    },

    #[error(
        "Decode range error{}: {length} bytes at offset {offset}, buffer holds {available}",
        table_suffix(.table)
    )]
    DecodeRange {
        table: Option<TableId>,
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

fn table_suffix(table: &Option<TableId>) -> String {
    match table {
        Some(id) => format!(" on table {}", id),
        None => String::new(),
    }
}

impl PsemError {
    /// Shorthand for a communication failure on `table`
    pub fn communication(table: TableId, failure: CommFailure) -> Self {
        PsemError::Communication { table, failure }
    }

    /// Attach a table id to errors raised below the table layer
    ///
    /// Cursor errors are produced without knowing which table is being
    /// decoded; the table engine tags them before surfacing them.
    pub fn with_table(self, id: TableId) -> Self {
        match self {
            PsemError::DecodeRange {
                table: None,
                offset,
                length,
                available,
            } => PsemError::DecodeRange {
                table: Some(id),
                offset,
                length,
                available,
            },
            other => other,
        }
    }

    /// The table this error refers to, if known
    pub fn table(&self) -> Option<TableId> {
        match self {
            PsemError::Communication { table, .. }
            | PsemError::UndersizedBuffer { table, .. }
            | PsemError::UnsupportedField { table, .. } => Some(*table),
            PsemError::DecodeRange { table, .. } => *table,
            PsemError::InvalidData(_) => None,
        }
    }

    /// Whether the caller may reasonably retry the operation
    pub fn is_communication(&self) -> bool {
        matches!(self, PsemError::Communication { .. })
    }
}

/// Result type alias for manufacturing table operations
pub type PsemResult<T> = Result<T, PsemError>;
