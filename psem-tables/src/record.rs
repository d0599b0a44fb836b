//! Decoded entries of a record array

use psem_codec::FieldValue;
use psem_core::{MeterTime, PsemError, PsemResult};

/// One decoded record, its fields in layout order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    index: usize,
    values: Vec<(&'static str, FieldValue)>,
}

impl Record {
    pub fn new(index: usize, values: Vec<(&'static str, FieldValue)>) -> Self {
        Self { index, values }
    }

    /// Position of the record in the table's record array
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn values(&self) -> &[(&'static str, FieldValue)] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Field value, failing when the record does not carry it
    pub fn value(&self, name: &str) -> PsemResult<&FieldValue> {
        self.get(name).ok_or_else(|| {
            PsemError::InvalidData(format!("Record {} has no field '{}'", self.index, name))
        })
    }

    pub fn integer<T>(&self, name: &str) -> PsemResult<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        self.value(name)?.to_integer()
    }

    pub fn time(&self, name: &str) -> PsemResult<MeterTime> {
        let value = self.value(name)?;
        value
            .as_time()
            .ok_or_else(|| PsemError::InvalidData(format!("Field '{}' is not a time: {}", name, value)))
    }
}
