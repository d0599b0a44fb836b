//! Sequential field encoder into a table buffer

use crate::types::{ByteOrder, FieldKind, FieldValue};
use psem_core::{MeterTime, PsemError, PsemResult, TimeFormat};

/// Cursor serializing table fields into a borrowed, fixed-size buffer
///
/// Every write covers the full width of its field. Fixed-width text and byte
/// fields clear their whole slot before copying the new value, so bytes of a
/// previous longer value never survive a shorter replacement. Values longer
/// than such a slot are truncated to the slot width.
#[derive(Debug)]
pub struct FieldWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> FieldWriter<'a> {
    /// Create a writer positioned at the start of `buffer`
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Create a writer positioned at `position`
    pub fn at(buffer: &'a mut [u8], position: usize) -> Self {
        Self { buffer, position }
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Encode one field according to its kind
    ///
    /// Numeric values outside the range of the field are rejected rather than
    /// masked.
    pub fn write_field(&mut self, kind: &FieldKind, value: &FieldValue) -> PsemResult<()> {
        match (*kind, value) {
            (FieldKind::Bool, FieldValue::Bool(v)) => self.write_bool(*v),
            (FieldKind::Text(width), FieldValue::Text(v)) => self.write_text(v, width),
            (FieldKind::Bytes(width), FieldValue::Bytes(v)) => self.write_bytes(v, width),
            (FieldKind::Prefixed(capacity), FieldValue::Bytes(v)) => {
                self.write_prefixed(v, capacity)
            }
            (FieldKind::Time(format), FieldValue::Time(v)) => self.write_time(*v, format),
            (kind, value) if kind.unsigned_max().is_some() => {
                let v = value.as_unsigned().ok_or_else(|| mismatch(&kind, value))?;
                if kind.unsigned_max().is_some_and(|max| v > max) {
                    return Err(out_of_range(&kind, value));
                }
                self.write_unsigned(v, kind.width(), byte_order(&kind))
            }
            (kind, value) if kind.signed_range().is_some() => {
                let v = value.as_signed().ok_or_else(|| mismatch(&kind, value))?;
                if kind
                    .signed_range()
                    .is_some_and(|(min, max)| v < min || v > max)
                {
                    return Err(out_of_range(&kind, value));
                }
                self.write_unsigned(v as u64, kind.width(), byte_order(&kind))
            }
            (kind, value) => Err(mismatch(&kind, value)),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> PsemResult<()> {
        self.put(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> PsemResult<()> {
        self.put(&[value as u8])
    }

    /// Encode a boolean as one byte (0x01 / 0x00)
    pub fn write_bool(&mut self, value: bool) -> PsemResult<()> {
        self.put(&[value as u8])
    }

    pub fn write_u16(&mut self, value: u16, order: ByteOrder) -> PsemResult<()> {
        self.put_ordered(value.to_be_bytes(), order)
    }

    pub fn write_i16(&mut self, value: i16, order: ByteOrder) -> PsemResult<()> {
        self.put_ordered(value.to_be_bytes(), order)
    }

    /// Encode the low 24 bits of `value`
    pub fn write_u24(&mut self, value: u32, order: ByteOrder) -> PsemResult<()> {
        let [_, a, b, c] = value.to_be_bytes();
        self.put_ordered([a, b, c], order)
    }

    pub fn write_u32(&mut self, value: u32, order: ByteOrder) -> PsemResult<()> {
        self.put_ordered(value.to_be_bytes(), order)
    }

    pub fn write_i32(&mut self, value: i32, order: ByteOrder) -> PsemResult<()> {
        self.put_ordered(value.to_be_bytes(), order)
    }

    pub fn write_u64(&mut self, value: u64, order: ByteOrder) -> PsemResult<()> {
        self.put_ordered(value.to_be_bytes(), order)
    }

    pub fn write_i64(&mut self, value: i64, order: ByteOrder) -> PsemResult<()> {
        self.put_ordered(value.to_be_bytes(), order)
    }

    /// Encode raw bytes into a zero-filled slot of `width` bytes
    pub fn write_bytes(&mut self, value: &[u8], width: usize) -> PsemResult<()> {
        let slot = self.slot(width)?;
        slot.fill(0);
        let len = value.len().min(width);
        slot[..len].copy_from_slice(&value[..len]);
        Ok(())
    }

    /// Encode text into a NUL-padded slot of `width` bytes
    pub fn write_text(&mut self, value: &str, width: usize) -> PsemResult<()> {
        self.write_bytes(value.as_bytes(), width)
    }

    /// Encode a length byte and a zero-filled slot of `capacity` bytes
    ///
    /// Unlike plain slots, an oversized value is a usage error: truncating it
    /// would silently change what the length byte describes.
    pub fn write_prefixed(&mut self, value: &[u8], capacity: usize) -> PsemResult<()> {
        if value.len() > capacity || value.len() > u8::MAX as usize {
            return Err(PsemError::InvalidData(format!(
                "Value of {} bytes does not fit a {}-byte slot",
                value.len(),
                capacity
            )));
        }
        let slot = self.slot(capacity + 1)?;
        slot.fill(0);
        slot[0] = value.len() as u8;
        slot[1..=value.len()].copy_from_slice(value);
        Ok(())
    }

    /// Encode a packed timestamp, converting it to `format` first if needed
    pub fn write_time(&mut self, value: MeterTime, format: TimeFormat) -> PsemResult<()> {
        let value = value.convert(format)?;
        match format {
            TimeFormat::Seconds => self.write_u32(value.to_seconds()?, ByteOrder::Big),
            TimeFormat::LocalTime => {
                let (minutes, seconds) = value.to_ltime()?;
                let mut bytes = [0u8; 5];
                bytes[..4].copy_from_slice(&minutes.to_be_bytes());
                bytes[4] = seconds;
                self.put(&bytes)
            }
        }
    }

    fn write_unsigned(&mut self, value: u64, width: usize, order: ByteOrder) -> PsemResult<()> {
        let be = value.to_be_bytes();
        let mut bytes = be[8 - width..].to_vec();
        if order == ByteOrder::Little {
            bytes.reverse();
        }
        self.put(&bytes)
    }

    fn put_ordered<const N: usize>(&mut self, mut bytes: [u8; N], order: ByteOrder) -> PsemResult<()> {
        if order == ByteOrder::Little {
            bytes.reverse();
        }
        self.put(&bytes)
    }

    fn put(&mut self, bytes: &[u8]) -> PsemResult<()> {
        self.slot(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    fn slot(&mut self, len: usize) -> PsemResult<&mut [u8]> {
        if len > self.remaining() {
            return Err(PsemError::DecodeRange {
                table: None,
                offset: self.position,
                length: len,
                available: self.buffer.len(),
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&mut self.buffer[start..start + len])
    }
}

fn byte_order(kind: &FieldKind) -> ByteOrder {
    match kind {
        FieldKind::U16(order)
        | FieldKind::I16(order)
        | FieldKind::U24(order)
        | FieldKind::U32(order)
        | FieldKind::I32(order)
        | FieldKind::U64(order)
        | FieldKind::I64(order) => *order,
        _ => ByteOrder::Big,
    }
}

fn mismatch(kind: &FieldKind, value: &FieldValue) -> PsemError {
    PsemError::InvalidData(format!("Cannot encode {} as {:?}", value, kind))
}

fn out_of_range(kind: &FieldKind, value: &FieldValue) -> PsemError {
    PsemError::InvalidData(format!("Value {} out of range for {:?}", value, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::FieldReader;

    #[test]
    fn test_write_big_endian() {
        let mut buffer = [0u8; 4];
        FieldWriter::new(&mut buffer)
            .write_u32(0x12345678, ByteOrder::Big)
            .unwrap();
        assert_eq!(buffer, [0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_write_reversed_field() {
        let mut buffer = [0u8; 3];
        FieldWriter::new(&mut buffer)
            .write_u24(0x010203, ByteOrder::Little)
            .unwrap();
        assert_eq!(buffer, [0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_write_past_end_is_error() {
        let mut buffer = [0u8; 3];
        let mut writer = FieldWriter::at(&mut buffer, 1);
        assert!(matches!(
            writer.write_u32(1, ByteOrder::Big),
            Err(PsemError::DecodeRange { offset: 1, length: 4, available: 3, .. })
        ));
    }

    #[test]
    fn test_write_text_clears_stale_bytes() {
        let mut buffer = *b"LONG-OLD-VALUE";
        FieldWriter::new(&mut buffer).write_text("NEW", 14).unwrap();
        assert_eq!(&buffer[..3], b"NEW");
        assert!(buffer[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_text_truncates() {
        let mut buffer = [0u8; 4];
        FieldWriter::new(&mut buffer).write_text("TRUNCATED", 4).unwrap();
        assert_eq!(&buffer, b"TRUN");
    }

    #[test]
    fn test_write_prefixed_slot() {
        let mut buffer = [0xAAu8; 65];
        let value = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        FieldWriter::new(&mut buffer).write_prefixed(&value, 64).unwrap();
        assert_eq!(buffer[0], 10);
        assert_eq!(&buffer[1..11], &value);
        assert!(buffer[11..].iter().all(|&b| b == 0));

        let mut reader = FieldReader::new(&buffer);
        assert_eq!(reader.read_prefixed(64).unwrap(), value.to_vec());
    }

    #[test]
    fn test_write_prefixed_rejects_oversized() {
        let mut buffer = [0u8; 5];
        let err = FieldWriter::new(&mut buffer)
            .write_prefixed(&[0u8; 5], 4)
            .unwrap_err();
        assert!(matches!(err, PsemError::InvalidData(_)));
        assert_eq!(buffer, [0u8; 5]);
    }

    #[test]
    fn test_write_field_range_checks() {
        let mut buffer = [0u8; 2];
        let mut writer = FieldWriter::new(&mut buffer);
        assert!(writer
            .write_field(&FieldKind::U8, &FieldValue::Unsigned(256))
            .is_err());
        assert!(writer
            .write_field(&FieldKind::I8, &FieldValue::Signed(-129))
            .is_err());
        writer
            .write_field(&FieldKind::I16(ByteOrder::Big), &FieldValue::Signed(-2))
            .unwrap();
        assert_eq!(buffer, [0xFF, 0xFE]);
    }

    #[test]
    fn test_write_field_type_mismatch() {
        let mut buffer = [0u8; 4];
        let mut writer = FieldWriter::new(&mut buffer);
        assert!(writer
            .write_field(&FieldKind::Text(4), &FieldValue::Unsigned(1))
            .is_err());
    }

    #[test]
    fn test_write_ltime() {
        let mut buffer = [0u8; 5];
        let time = MeterTime::from_ltime(2, 30).unwrap();
        FieldWriter::new(&mut buffer)
            .write_time(time, TimeFormat::LocalTime)
            .unwrap();
        assert_eq!(buffer, [0x00, 0x00, 0x00, 0x02, 0x1E]);
    }
}
