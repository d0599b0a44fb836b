//! Dynamic sizing of dimension-dependent tables
//!
//! Every function here is pure: the table engine gathers the dimension
//! inputs (record count, record size, header length) and asks for the byte
//! length its buffer must have.

use psem_codec::FieldValue;
use psem_core::{PsemError, PsemResult, TableId};

/// Inputs determining the byte length of a table with a record array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionInputs {
    pub header_len: usize,
    pub record_count: usize,
    pub record_size: usize,
}

/// Exact byte length of a table: header plus `record_count` records
///
/// A record count of zero yields exactly the header length.
pub fn determine_size(inputs: &DimensionInputs) -> usize {
    inputs.header_len + inputs.record_count * inputs.record_size
}

/// Check an observed length against the documented minimum
///
/// More bytes than the floor is forward-compatible table growth and returns
/// the number of extra bytes; fewer bytes is an error.
pub fn check_observed(table: TableId, minimum: usize, actual: usize) -> PsemResult<usize> {
    if actual < minimum {
        return Err(PsemError::UndersizedBuffer {
            table,
            minimum,
            actual,
        });
    }
    Ok(actual - minimum)
}

/// Record stride to use given the known layout and the size reported by a
/// dimension table
///
/// A stride larger than the layout means newer firmware appended fields to
/// each record; they are skipped. A stride smaller than the mandatory part of
/// the layout cannot be decoded.
pub fn resolve_record_size(
    table: TableId,
    layout_minimum: usize,
    layout_len: usize,
    reported: Option<usize>,
) -> PsemResult<usize> {
    match reported {
        None => Ok(layout_len),
        Some(size) => {
            check_observed(table, layout_minimum, size)?;
            Ok(size)
        }
    }
}

/// Interpret a decoded dimension field as a count or size
pub fn count_from(value: &FieldValue) -> PsemResult<usize> {
    value
        .as_unsigned()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| PsemError::InvalidData(format!("Not a valid count: {}", value)))
}
