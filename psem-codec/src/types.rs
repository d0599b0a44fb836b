//! Field encodings and decoded values

use psem_core::{MeterTime, PsemError, PsemResult, TimeFormat};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte order of a multi-byte numeric field
///
/// Tables are big-endian, but some fields are stored reversed. The order is
/// a property of each field, never of the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Encoding rule of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    U8,
    I8,
    /// One byte, any non-zero value is `true`
    Bool,
    U16(ByteOrder),
    I16(ByteOrder),
    U24(ByteOrder),
    U32(ByteOrder),
    I32(ByteOrder),
    U64(ByteOrder),
    I64(ByteOrder),
    /// Fixed-width raw bytes
    Bytes(usize),
    /// Fixed-width ASCII text, NUL padded
    Text(usize),
    /// One length byte followed by a fixed-capacity slot
    Prefixed(usize),
    /// Packed timestamp
    Time(TimeFormat),
}

impl FieldKind {
    /// Encoded width in bytes
    pub fn width(&self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 | FieldKind::Bool => 1,
            FieldKind::U16(_) | FieldKind::I16(_) => 2,
            FieldKind::U24(_) => 3,
            FieldKind::U32(_) | FieldKind::I32(_) => 4,
            FieldKind::U64(_) | FieldKind::I64(_) => 8,
            FieldKind::Bytes(n) | FieldKind::Text(n) => *n,
            FieldKind::Prefixed(capacity) => capacity + 1,
            FieldKind::Time(format) => format.width(),
        }
    }

    /// Largest unsigned value the field can carry, for unsigned kinds
    pub fn unsigned_max(&self) -> Option<u64> {
        match self {
            FieldKind::U8 => Some(u8::MAX as u64),
            FieldKind::U16(_) => Some(u16::MAX as u64),
            FieldKind::U24(_) => Some(0x00FF_FFFF),
            FieldKind::U32(_) => Some(u32::MAX as u64),
            FieldKind::U64(_) => Some(u64::MAX),
            _ => None,
        }
    }

    /// Signed range the field can carry, for signed kinds
    pub fn signed_range(&self) -> Option<(i64, i64)> {
        match self {
            FieldKind::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            FieldKind::I16(_) => Some((i16::MIN as i64, i16::MAX as i64)),
            FieldKind::I32(_) => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldKind::I64(_) => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

/// Decoded value of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
    Time(MeterTime),
}

impl FieldValue {
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            FieldValue::Unsigned(v) => Some(*v),
            FieldValue::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_signed(&self) -> Option<i64> {
        match self {
            FieldValue::Signed(v) => Some(*v),
            FieldValue::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<MeterTime> {
        match self {
            FieldValue::Time(v) => Some(*v),
            _ => None,
        }
    }

    /// Narrow to a concrete integer type, failing on type or range mismatch
    pub fn to_integer<T>(&self) -> PsemResult<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        let narrowed = match self {
            FieldValue::Unsigned(v) => T::try_from(*v).ok(),
            FieldValue::Signed(v) => T::try_from(*v).ok(),
            _ => None,
        };
        narrowed.ok_or_else(|| {
            PsemError::InvalidData(format!(
                "{} does not fit {}",
                self,
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Bytes(v) => {
                for byte in v {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            FieldValue::Text(v) => write!(f, "\"{}\"", v),
            FieldValue::Time(v) => write!(f, "{}", v),
        }
    }
}
