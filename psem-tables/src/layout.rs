//! Declarative field layouts
//!
//! A table layout is an ordered list of field descriptors, each a
//! (byte offset, width, decode rule) triple plus access metadata. Layouts are
//! built once per table from a `LayoutContext`, because the width of some
//! fields (timestamps) and the presence of others (device-specific fields)
//! depend on the session.
//!
//! # Invariants
//! - offsets increase monotonically and fields never overlap, since the
//!   builder assigns offsets sequentially
//! - trailing (optional) fields only follow mandatory fields; a trailing
//!   field is present when the observed buffer covers its last byte

use crate::record::Record;
use psem_codec::{FieldKind, FieldReader, FieldValue};
use psem_core::{PsemResult, TimeFormat};
use psem_session::SessionSettings;

/// Session facts a layout depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutContext {
    pub time_format: TimeFormat,
    pub device_class: String,
}

impl LayoutContext {
    pub fn new(time_format: TimeFormat, device_class: impl Into<String>) -> Self {
        Self {
            time_format,
            device_class: device_class.into(),
        }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.time_format, settings.device_class.clone())
    }

    /// Kind of a timestamp field under the session time format
    pub fn time(&self) -> FieldKind {
        FieldKind::Time(self.time_format)
    }

    pub fn is_device_class(&self, device_class: &str) -> bool {
        self.device_class.eq_ignore_ascii_case(device_class)
    }
}

/// Whether a field is always part of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Mandatory,
    /// Appended by newer firmware; present when the buffer is long enough
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Whether a cached value may be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Cached,
    /// Updated asynchronously by the device; every access re-reads it
    AlwaysFresh,
}

/// Location and decode rule of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
    pub presence: Presence,
    pub access: Access,
    pub freshness: Freshness,
}

impl FieldDescriptor {
    pub fn width(&self) -> usize {
        self.kind.width()
    }

    /// Offset one past the last byte of the field
    pub fn end(&self) -> usize {
        self.offset + self.width()
    }

    /// Whether a buffer of `len` bytes carries this field
    pub fn is_present(&self, len: usize) -> bool {
        self.end() <= len
    }

    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    /// Decode this field from a buffer holding the whole table (or record)
    pub fn decode(&self, buffer: &[u8]) -> PsemResult<FieldValue> {
        FieldReader::at(buffer, self.offset).read_field(&self.kind)
    }
}

/// Ordered field descriptors of a table header or a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<FieldDescriptor>,
    minimum_len: usize,
    len: usize,
}

impl Layout {
    pub fn builder() -> LayoutBuilder {
        LayoutBuilder::new()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Length covering every mandatory field: the documented minimum size
    pub fn minimum_len(&self) -> usize {
        self.minimum_len
    }

    /// Length covering every known field, trailing ones included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_trailing(&self) -> bool {
        self.len > self.minimum_len
    }

    /// Whether any field may be written back
    pub fn is_writable(&self) -> bool {
        self.fields.iter().any(FieldDescriptor::is_writable)
    }

    /// Decode every field present in `buffer`, in layout order
    pub fn decode_all(&self, buffer: &[u8]) -> PsemResult<Vec<(&'static str, FieldValue)>> {
        self.fields
            .iter()
            .filter(|f| f.presence == Presence::Mandatory || f.is_present(buffer.len()))
            .map(|f| Ok((f.name, f.decode(buffer)?)))
            .collect()
    }

    /// Decode one record from its slice of the table buffer
    pub fn decode_record(&self, index: usize, slice: &[u8]) -> PsemResult<Record> {
        Ok(Record::new(index, self.decode_all(slice)?))
    }
}

/// Sequential layout builder
///
/// Offsets are assigned in call order. Layouts are static table definitions,
/// so misuse (duplicate names, mandatory after trailing) panics.
#[derive(Debug, Default)]
pub struct LayoutBuilder {
    fields: Vec<FieldDescriptor>,
    offset: usize,
    minimum_len: Option<usize>,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mandatory read-only field
    pub fn field(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(name, kind, Presence::Mandatory, Access::ReadOnly, Freshness::Cached)
    }

    /// Mandatory field that may be written back
    pub fn writable(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(name, kind, Presence::Mandatory, Access::ReadWrite, Freshness::Cached)
    }

    /// Mandatory read-only field re-read on every access
    pub fn fresh(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(name, kind, Presence::Mandatory, Access::ReadOnly, Freshness::AlwaysFresh)
    }

    /// Optional field appended by newer firmware
    pub fn trailing(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(name, kind, Presence::Trailing, Access::ReadOnly, Freshness::Cached)
    }

    /// Optional writable field appended by newer firmware
    pub fn trailing_writable(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(name, kind, Presence::Trailing, Access::ReadWrite, Freshness::Cached)
    }

    /// Reserved bytes with no field
    pub fn reserved(mut self, len: usize) -> Self {
        self.offset += len;
        self
    }

    /// Apply `build` only when `condition` holds (device-specific fields)
    pub fn when(self, condition: bool, build: impl FnOnce(Self) -> Self) -> Self {
        if condition { build(self) } else { self }
    }

    pub fn build(self) -> Layout {
        Layout {
            minimum_len: self.minimum_len.unwrap_or(self.offset),
            len: self.offset,
            fields: self.fields,
        }
    }

    fn push(
        mut self,
        name: &'static str,
        kind: FieldKind,
        presence: Presence,
        access: Access,
        freshness: Freshness,
    ) -> Self {
        assert!(
            self.fields.iter().all(|f| f.name != name),
            "duplicate field name '{}'",
            name
        );
        match presence {
            Presence::Mandatory => assert!(
                self.minimum_len.is_none(),
                "mandatory field '{}' follows a trailing field",
                name
            ),
            Presence::Trailing => {
                self.minimum_len.get_or_insert(self.offset);
            }
        }
        let descriptor = FieldDescriptor {
            name,
            offset: self.offset,
            kind,
            presence,
            access,
            freshness,
        };
        self.offset = descriptor.end();
        self.fields.push(descriptor);
        self
    }
}
