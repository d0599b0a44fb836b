//! Sequential field decoder over a table buffer

use crate::types::{ByteOrder, FieldKind, FieldValue};
use psem_core::{MeterTime, PsemError, PsemResult, TimeFormat};

/// Cursor decoding table fields from a borrowed buffer
///
/// The cursor is an owned value; it never mutates the buffer and several
/// readers may walk the same buffer independently. Reading past the end of
/// the buffer is always an error, never a truncated result.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> FieldReader<'a> {
    /// Create a reader positioned at the start of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Create a reader positioned at `position`
    pub fn at(buffer: &'a [u8], position: usize) -> Self {
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

    /// Move the cursor to an absolute position
    pub fn seek(&mut self, position: usize) -> PsemResult<()> {
        if position > self.buffer.len() {
            return Err(self.range_error(position, 0));
        }
        self.position = position;
        Ok(())
    }

    /// Skip reserved bytes
    pub fn skip(&mut self, len: usize) -> PsemResult<()> {
        self.take(len).map(|_| ())
    }

    /// Decode one field according to its kind
    pub fn read_field(&mut self, kind: &FieldKind) -> PsemResult<FieldValue> {
        let value = match *kind {
            FieldKind::U8 => FieldValue::Unsigned(self.read_u8()? as u64),
            FieldKind::I8 => FieldValue::Signed(self.read_i8()? as i64),
            FieldKind::Bool => FieldValue::Bool(self.read_bool()?),
            FieldKind::U16(order) => FieldValue::Unsigned(self.read_u16(order)? as u64),
            FieldKind::I16(order) => FieldValue::Signed(self.read_i16(order)? as i64),
            FieldKind::U24(order) => FieldValue::Unsigned(self.read_u24(order)? as u64),
            FieldKind::U32(order) => FieldValue::Unsigned(self.read_u32(order)? as u64),
            FieldKind::I32(order) => FieldValue::Signed(self.read_i32(order)? as i64),
            FieldKind::U64(order) => FieldValue::Unsigned(self.read_u64(order)?),
            FieldKind::I64(order) => FieldValue::Signed(self.read_i64(order)?),
            FieldKind::Bytes(len) => FieldValue::Bytes(self.read_bytes(len)?.to_vec()),
            FieldKind::Text(width) => FieldValue::Text(self.read_text(width)?),
            FieldKind::Prefixed(capacity) => FieldValue::Bytes(self.read_prefixed(capacity)?),
            FieldKind::Time(format) => FieldValue::Time(self.read_time(format)?),
        };
        Ok(value)
    }

    pub fn read_u8(&mut self) -> PsemResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> PsemResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Decode a boolean stored as one byte
    pub fn read_bool(&mut self) -> PsemResult<bool> {
        Ok(self.read_u8()? != 0x00)
    }

    pub fn read_u16(&mut self, order: ByteOrder) -> PsemResult<u16> {
        Ok(u16::from_be_bytes(self.take_array(order)?))
    }

    pub fn read_i16(&mut self, order: ByteOrder) -> PsemResult<i16> {
        Ok(i16::from_be_bytes(self.take_array(order)?))
    }

    /// Decode a 24-bit unsigned integer
    pub fn read_u24(&mut self, order: ByteOrder) -> PsemResult<u32> {
        let [a, b, c] = self.take_array::<3>(order)?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    pub fn read_u32(&mut self, order: ByteOrder) -> PsemResult<u32> {
        Ok(u32::from_be_bytes(self.take_array(order)?))
    }

    pub fn read_i32(&mut self, order: ByteOrder) -> PsemResult<i32> {
        Ok(i32::from_be_bytes(self.take_array(order)?))
    }

    pub fn read_u64(&mut self, order: ByteOrder) -> PsemResult<u64> {
        Ok(u64::from_be_bytes(self.take_array(order)?))
    }

    pub fn read_i64(&mut self, order: ByteOrder) -> PsemResult<i64> {
        Ok(i64::from_be_bytes(self.take_array(order)?))
    }

    /// Borrow a fixed number of raw bytes
    pub fn read_bytes(&mut self, len: usize) -> PsemResult<&'a [u8]> {
        self.take(len)
    }

    /// Decode fixed-width ASCII text
    ///
    /// The value ends at the first NUL; trailing spaces are padding.
    pub fn read_text(&mut self, width: usize) -> PsemResult<String> {
        let raw = self.take(width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = String::from_utf8_lossy(&raw[..end]);
        Ok(text.trim_end_matches(' ').to_string())
    }

    /// Decode a length byte followed by a fixed-capacity slot
    ///
    /// Only the first `length` bytes of the slot are returned.
    pub fn read_prefixed(&mut self, capacity: usize) -> PsemResult<Vec<u8>> {
        let len = self.read_u8()? as usize;
        let slot = self.take(capacity)?;
        if len > capacity {
            return Err(PsemError::InvalidData(format!(
                "Length prefix {} exceeds slot capacity {}",
                len, capacity
            )));
        }
        Ok(slot[..len].to_vec())
    }

    /// Decode a packed timestamp
    pub fn read_time(&mut self, format: TimeFormat) -> PsemResult<MeterTime> {
        match format {
            TimeFormat::Seconds => Ok(MeterTime::from_seconds(self.read_u32(ByteOrder::Big)?)),
            TimeFormat::LocalTime => {
                let minutes = self.read_u32(ByteOrder::Big)?;
                let seconds = self.read_u8()?;
                MeterTime::from_ltime(minutes, seconds)
            }
        }
    }

    fn take(&mut self, len: usize) -> PsemResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| self.range_error(self.position, len))?;
        let slice = &self.buffer[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Take `N` bytes arranged most significant byte first
    fn take_array<const N: usize>(&mut self, order: ByteOrder) -> PsemResult<[u8; N]> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.take(N)?);
        if order == ByteOrder::Little {
            bytes.reverse();
        }
        Ok(bytes)
    }

    fn range_error(&self, offset: usize, length: usize) -> PsemError {
        PsemError::DecodeRange {
            table: None,
            offset,
            length,
            available: self.buffer.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_big_endian() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.read_u32(ByteOrder::Big).unwrap(), 0x12345678);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_reversed_field() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0x02, 0x01];
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.read_u32(ByteOrder::Little).unwrap(), 0x12345678);
        assert_eq!(reader.read_u16(ByteOrder::Little).unwrap(), 0x0102);
    }

    #[test]
    fn test_read_u24_and_signed() {
        let bytes = [0x01, 0x02, 0x03, 0xFF, 0xFE];
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.read_u24(ByteOrder::Big).unwrap(), 0x010203);
        assert_eq!(reader.read_i8().unwrap(), -1);
        assert_eq!(reader.read_i8().unwrap(), -2);
    }

    #[test]
    fn test_read_past_end_is_error() {
        let bytes = [0x00, 0x01, 0x02];
        let mut reader = FieldReader::at(&bytes, 1);
        let err = reader.read_u32(ByteOrder::Big).unwrap_err();
        assert_eq!(
            err,
            PsemError::DecodeRange {
                table: None,
                offset: 1,
                length: 4,
                available: 3,
            }
        );
        // a failed read does not move the cursor
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_empty_read_beyond_end_is_error() {
        let bytes = [0x00, 0x01];
        let mut reader = FieldReader::at(&bytes, 5);
        assert_eq!(
            reader.read_bytes(0).unwrap_err(),
            PsemError::DecodeRange {
                table: None,
                offset: 5,
                length: 0,
                available: 2,
            }
        );
        assert!(FieldReader::at(&bytes, 2).read_bytes(0).unwrap().is_empty());
    }

    #[test]
    fn test_read_text_stops_at_nul() {
        let bytes = *b"ITRON \0\0garbage";
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.read_text(8).unwrap(), "ITRON");
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_read_prefixed() {
        let mut bytes = vec![3u8, 0xC0, 0xA8, 0x01];
        bytes.extend_from_slice(&[0u8; 5]);
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.read_prefixed(8).unwrap(), vec![0xC0, 0xA8, 0x01]);
        assert_eq!(reader.position(), 9);
    }

    #[test]
    fn test_read_prefixed_rejects_bad_length() {
        let bytes = [9u8, 0, 0, 0, 0];
        let mut reader = FieldReader::new(&bytes);
        assert!(matches!(
            reader.read_prefixed(4),
            Err(PsemError::InvalidData(_))
        ));
    }

    #[test]
    fn test_read_time_formats() {
        let bytes = [0x65, 0x53, 0xF1, 0x00];
        let mut reader = FieldReader::new(&bytes);
        let time = reader.read_time(TimeFormat::Seconds).unwrap();
        assert_eq!(time.seconds_since_epoch(), 0x6553F100);

        let bytes = [0x00, 0x00, 0x00, 0x02, 0x1E];
        let mut reader = FieldReader::new(&bytes);
        let time = reader.read_time(TimeFormat::LocalTime).unwrap();
        assert_eq!(time.seconds_since_epoch(), 2 * 60 + 30);
        assert_eq!(time.format(), TimeFormat::LocalTime);
    }

    #[test]
    fn test_read_field_dispatch() {
        let bytes = [0x01, 0x00, 0x2A, b'A', b'B'];
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.read_field(&FieldKind::Bool).unwrap(), FieldValue::Bool(true));
        assert_eq!(
            reader.read_field(&FieldKind::U16(ByteOrder::Big)).unwrap(),
            FieldValue::Unsigned(42)
        );
        assert_eq!(
            reader.read_field(&FieldKind::Text(2)).unwrap(),
            FieldValue::Text("AB".to_string())
        );
    }

    #[test]
    fn test_seek_bounds() {
        let bytes = [0u8; 4];
        let mut reader = FieldReader::new(&bytes);
        assert!(reader.seek(4).is_ok());
        assert!(reader.seek(5).is_err());
    }
}
