use serde::{Deserialize, Serialize};

/// Session-wide selector for how timestamps are packed into tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// UINT32 seconds since 1970-01-01T00:00:00Z
    #[default]
    Seconds,
    /// "LTIME": UINT32 minutes since the epoch followed by a UINT8 seconds
    /// byte, already expressed in meter-local time
    LocalTime,
}

impl TimeFormat {
    /// Encoded width of one timestamp in bytes
    pub const fn width(self) -> usize {
        match self {
            TimeFormat::Seconds => 4,
            TimeFormat::LocalTime => 5,
        }
    }
}
