//! Packed meter timestamps

use crate::datatypes::time_format::TimeFormat;
use crate::error::{PsemError, PsemResult};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A timestamp as stored in a table: a count of seconds since the epoch plus
/// the format it was packed with
///
/// For `TimeFormat::Seconds` the count is UTC based and is converted to local
/// time on read. For `TimeFormat::LocalTime` the meter already stores its
/// local wall clock, so the count is interpreted as a naive local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeterTime {
    seconds: u64,
    format: TimeFormat,
}

impl MeterTime {
    pub fn new(seconds: u64, format: TimeFormat) -> Self {
        Self { seconds, format }
    }

    /// Build from the UINT32 seconds count of `TimeFormat::Seconds`
    pub fn from_seconds(seconds: u32) -> Self {
        Self::new(seconds as u64, TimeFormat::Seconds)
    }

    /// Build from the minutes/seconds pair of `TimeFormat::LocalTime`
    pub fn from_ltime(minutes: u32, seconds: u8) -> PsemResult<Self> {
        if seconds >= 60 {
            return Err(PsemError::InvalidData(format!(
                "LTIME seconds byte out of range: {}",
                seconds
            )));
        }
        Ok(Self::new(
            minutes as u64 * 60 + seconds as u64,
            TimeFormat::LocalTime,
        ))
    }

    /// Build a timestamp for writing from a local date/time
    pub fn from_local(value: DateTime<Local>, format: TimeFormat) -> PsemResult<Self> {
        let seconds = match format {
            TimeFormat::Seconds => value.timestamp(),
            TimeFormat::LocalTime => value.naive_local().and_utc().timestamp(),
        };
        let seconds = u64::try_from(seconds).map_err(|_| {
            PsemError::InvalidData(format!("Timestamp before the epoch: {}", value))
        })?;
        Ok(Self::new(seconds, format))
    }

    /// Re-express the same wall clock instant in another packing format
    pub fn convert(self, format: TimeFormat) -> PsemResult<Self> {
        if self.format == format {
            return Ok(self);
        }
        let local = self.to_local().ok_or_else(|| {
            PsemError::InvalidData(format!("Timestamp {} is not representable", self.seconds))
        })?;
        Self::from_local(local, format)
    }

    pub fn seconds_since_epoch(&self) -> u64 {
        self.seconds
    }

    pub fn format(&self) -> TimeFormat {
        self.format
    }

    /// Value as a UINT32 seconds count
    pub fn to_seconds(&self) -> PsemResult<u32> {
        u32::try_from(self.seconds).map_err(|_| {
            PsemError::InvalidData(format!(
                "Timestamp {} does not fit a UINT32 seconds count",
                self.seconds
            ))
        })
    }

    /// Value as the minutes/seconds pair of LTIME
    pub fn to_ltime(&self) -> PsemResult<(u32, u8)> {
        let minutes = u32::try_from(self.seconds / 60).map_err(|_| {
            PsemError::InvalidData(format!(
                "Timestamp {} does not fit an LTIME minutes count",
                self.seconds
            ))
        })?;
        Ok((minutes, (self.seconds % 60) as u8))
    }

    /// Wall clock value as the meter sees it, without any zone applied
    pub fn naive(&self) -> Option<NaiveDateTime> {
        let seconds = i64::try_from(self.seconds).ok()?;
        DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.naive_utc())
    }

    /// Timestamp converted to the local time zone
    pub fn to_local(&self) -> Option<DateTime<Local>> {
        let naive = self.naive()?;
        match self.format {
            TimeFormat::Seconds => Some(Utc.from_utc_datetime(&naive).with_timezone(&Local)),
            TimeFormat::LocalTime => Local.from_local_datetime(&naive).earliest(),
        }
    }
}

impl fmt::Display for MeterTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_local() {
            Some(local) => write!(f, "{}", local.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "<invalid time {}>", self.seconds),
        }
    }
}
