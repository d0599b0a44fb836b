use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a table definition
///
/// Manufacturing tables start at 2048 (the ANSI C12.19 manufacturer offset).
/// An id is never reused for a different layout within a firmware family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(u16);

impl TableId {
    /// First table number of the manufacturer table space
    pub const MANUFACTURER_OFFSET: u16 = 2048;

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Numeric table number as sent on the wire
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Whether this id falls in the manufacturer table space
    pub fn is_manufacturer(self) -> bool {
        self.0 >= Self::MANUFACTURER_OFFSET
    }

    /// Manufacturer tables are often referred to as "MFG n" (id - 2048)
    pub fn manufacturer_index(self) -> Option<u16> {
        self.0.checked_sub(Self::MANUFACTURER_OFFSET)
    }
}

impl From<u16> for TableId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
