//! Generic table record engine
//!
//! One `TableRecord` drives any table described by a `TableSpec`: it owns the
//! table buffer, resolves the table shape from its dimension table or leading
//! count field, fetches and decodes the whole table, serves typed field
//! values, and writes modified fields back.
//!
//! # Ordering
//! Within one `read` the dimension read precedes the resize, which precedes
//! the data fetch, which precedes decode. Nothing is committed to the record
//! until decode succeeded, so a failed read or write leaves the previous
//! buffer, records and state untouched.

use crate::config::TableConfig;
use crate::coordinator::{RangeReader, effective_batch};
use crate::layout::{FieldDescriptor, Freshness};
use crate::record::Record;
use crate::sizing::{DimensionInputs, check_observed, count_from, determine_size, resolve_record_size};
use crate::spec::{CountSource, TableSpec};
use crate::state::TableState;
use bytes::Bytes;
use psem_codec::{FieldReader, FieldValue, FieldWriter};
use psem_core::{MeterTime, PsemError, PsemResult, TableId};
use psem_session::TableSession;
use std::collections::BTreeMap;
use std::time::Duration;

/// Fully decoded table contents awaiting commit
struct Snapshot {
    buffer: Vec<u8>,
    records: Option<Vec<Record>>,
    record_count: usize,
    record_size: usize,
}

/// Record array shape learned before the data fetch
struct Shape {
    /// Header bytes, when they had to be read to learn the count
    header: Option<Bytes>,
    record_count: usize,
    record_size: usize,
}

/// Cached image and lifecycle of one table
#[derive(Debug, Clone)]
pub struct TableRecord {
    spec: TableSpec,
    config: TableConfig,
    state: TableState,
    /// State to return to once every pending change has been written
    clean_state: TableState,
    buffer: Vec<u8>,
    records: Option<Vec<Record>>,
    record_count: usize,
    record_size: usize,
    shadow: BTreeMap<&'static str, FieldValue>,
    dimension: Option<Box<TableRecord>>,
}

impl TableRecord {
    /// Create an unloaded record with a zeroed buffer of the documented
    /// minimum size
    pub fn new(spec: TableSpec, config: TableConfig) -> Self {
        let dimension = match spec.records.as_ref().map(|r| &r.count) {
            Some(CountSource::Dimension { table, .. }) => Some(Box::new(TableRecord::new(
                table.as_ref().clone(),
                config.clone(),
            ))),
            _ => None,
        };
        let record_size = spec.records.as_ref().map_or(0, |r| r.layout.len());
        Self {
            buffer: vec![0; spec.initial_len()],
            spec,
            config,
            state: TableState::Unloaded,
            clean_state: TableState::Unloaded,
            records: None,
            record_count: 0,
            record_size,
            shadow: BTreeMap::new(),
            dimension,
        }
    }

    pub fn id(&self) -> TableId {
        self.spec.id
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    /// Current byte length of the table buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of records found by the last successful read
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Record stride in bytes used by the last successful read
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// The dimension table read before this one, if any
    pub fn dimension(&self) -> Option<&TableRecord> {
        self.dimension.as_deref()
    }

    /// Decoded records of the last successful read, without communication
    pub fn cached_records(&self) -> Option<&[Record]> {
        self.records.as_deref()
    }

    /// Whether fields were modified and not written back
    pub fn is_dirty(&self) -> bool {
        self.state == TableState::Dirty
    }

    /// Full fetch-and-decode cycle
    ///
    /// Pending local changes are discarded on success.
    pub async fn read<S>(&mut self, session: &mut S) -> PsemResult<()>
    where
        S: TableSession + ?Sized,
    {
        let snapshot = self.fetch_snapshot(session).await?;
        self.commit(snapshot);
        Ok(())
    }

    /// Read the table unless its buffer already holds a device image
    ///
    /// Changes staged before the first read survive it.
    pub async fn ensure_loaded<S>(&mut self, session: &mut S) -> PsemResult<()>
    where
        S: TableSession + ?Sized,
    {
        let data_state = self.data_state();
        if data_state.needs_read() {
            log::debug!("Table {} is {:?}, reading", self.id(), data_state);
            let snapshot = self.fetch_snapshot(session).await?;
            let pending = std::mem::take(&mut self.shadow);
            self.commit(snapshot);
            self.restore_pending(pending);
        }
        Ok(())
    }

    /// Invalidate the cached contents; the next access re-fetches
    pub fn refresh(&mut self) {
        if !self.shadow.is_empty() {
            log::debug!(
                "Dropping {} pending changes of table {}",
                self.shadow.len(),
                self.id()
            );
        }
        self.shadow.clear();
        self.state = TableState::Expired;
    }

    /// Value of a header field, reading the table first if needed
    ///
    /// Always-fresh fields are re-read from the device on every call.
    /// A trailing field the device does not report is an error; use
    /// `optional_value` for those.
    pub async fn value<S>(&mut self, session: &mut S, name: &str) -> PsemResult<FieldValue>
    where
        S: TableSession + ?Sized,
    {
        match self.optional_value(session, name).await? {
            Some(value) => Ok(value),
            None => Err(PsemError::UnsupportedField {
                table: self.id(),
                field: name.to_string(),
                reason: format!("not reported in a {} byte table", self.buffer.len()),
            }),
        }
    }

    /// Value of a header field, `None` when the device does not report it
    pub async fn optional_value<S>(
        &mut self,
        session: &mut S,
        name: &str,
    ) -> PsemResult<Option<FieldValue>>
    where
        S: TableSession + ?Sized,
    {
        let descriptor = self.descriptor(name)?.clone();
        if descriptor.freshness == Freshness::AlwaysFresh {
            return self.read_fresh(session, &descriptor).await.map(Some);
        }
        if let Some(value) = self.shadow.get(name) {
            return Ok(Some(value.clone()));
        }
        self.ensure_loaded(session).await?;
        self.cached_field(&descriptor)
    }

    /// Value of a header field from the cached buffer, without communication
    pub fn cached_value(&self, name: &str) -> PsemResult<FieldValue> {
        if let Some(value) = self.shadow.get(name) {
            return Ok(value.clone());
        }
        let descriptor = self.descriptor(name)?;
        self.cached_field(descriptor)?
            .ok_or_else(|| PsemError::UndersizedBuffer {
                table: self.id(),
                minimum: descriptor.end(),
                actual: self.buffer.len(),
            })
    }

    pub async fn integer<T, S>(&mut self, session: &mut S, name: &str) -> PsemResult<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
        S: TableSession + ?Sized,
    {
        self.value(session, name).await?.to_integer()
    }

    pub async fn optional_integer<T, S>(&mut self, session: &mut S, name: &str) -> PsemResult<Option<T>>
    where
        T: TryFrom<i64> + TryFrom<u64>,
        S: TableSession + ?Sized,
    {
        self.optional_value(session, name)
            .await?
            .map(|v| v.to_integer())
            .transpose()
    }

    pub async fn flag<S>(&mut self, session: &mut S, name: &str) -> PsemResult<bool>
    where
        S: TableSession + ?Sized,
    {
        let value = self.value(session, name).await?;
        value.as_bool().ok_or_else(|| mismatch(name, "a flag", &value))
    }

    pub async fn text<S>(&mut self, session: &mut S, name: &str) -> PsemResult<String>
    where
        S: TableSession + ?Sized,
    {
        match self.value(session, name).await? {
            FieldValue::Text(text) => Ok(text),
            value => Err(mismatch(name, "text", &value)),
        }
    }

    pub async fn optional_text<S>(&mut self, session: &mut S, name: &str) -> PsemResult<Option<String>>
    where
        S: TableSession + ?Sized,
    {
        match self.optional_value(session, name).await? {
            Some(FieldValue::Text(text)) => Ok(Some(text)),
            Some(value) => Err(mismatch(name, "text", &value)),
            None => Ok(None),
        }
    }

    pub async fn bytes<S>(&mut self, session: &mut S, name: &str) -> PsemResult<Vec<u8>>
    where
        S: TableSession + ?Sized,
    {
        match self.value(session, name).await? {
            FieldValue::Bytes(bytes) => Ok(bytes),
            value => Err(mismatch(name, "bytes", &value)),
        }
    }

    pub async fn time<S>(&mut self, session: &mut S, name: &str) -> PsemResult<MeterTime>
    where
        S: TableSession + ?Sized,
    {
        let value = self.value(session, name).await?;
        value.as_time().ok_or_else(|| mismatch(name, "a time", &value))
    }

    pub async fn optional_time<S>(&mut self, session: &mut S, name: &str) -> PsemResult<Option<MeterTime>>
    where
        S: TableSession + ?Sized,
    {
        match self.optional_value(session, name).await? {
            Some(value) => value
                .as_time()
                .map(Some)
                .ok_or_else(|| mismatch(name, "a time", &value)),
            None => Ok(None),
        }
    }

    /// Decoded record array, reading the table first if needed
    pub async fn records<S>(&mut self, session: &mut S) -> PsemResult<&[Record]>
    where
        S: TableSession + ?Sized,
    {
        if self.spec.records.is_none() {
            return Err(self.no_records());
        }
        self.ensure_loaded(session).await?;
        Ok(self.records.as_deref().unwrap_or_default())
    }

    /// Fetch and decode a single record with one offset read
    ///
    /// The record count and stride of a loaded table are reused; otherwise the
    /// shape is resolved first (dimension read or header read). The cached
    /// buffer is patched when it covers the record.
    pub async fn read_record<S>(&mut self, session: &mut S, index: usize) -> PsemResult<Record>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        self.read_record_inner(session, index)
            .await
            .map_err(|e| e.with_table(id))
    }

    /// Record a new value for a writable field; nothing is sent until
    /// `write` or `write_field`
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> PsemResult<()> {
        let id = self.id();
        let descriptor = self.descriptor(name)?;
        if !descriptor.is_writable() {
            return Err(PsemError::UnsupportedField {
                table: id,
                field: name.to_string(),
                reason: "field is read-only".to_string(),
            });
        }
        if !descriptor.is_present(self.buffer.len()) {
            return Err(PsemError::UnsupportedField {
                table: id,
                field: name.to_string(),
                reason: format!("not present in a {} byte table", self.buffer.len()),
            });
        }
        let mut scratch = vec![0; descriptor.width()];
        FieldWriter::new(&mut scratch)
            .write_field(&descriptor.kind, &value)
            .map_err(|e| e.with_table(id))?;
        let name = descriptor.name;

        if self.state != TableState::Dirty {
            self.clean_state = self.state;
            self.state = TableState::Dirty;
        }
        log::debug!("Table {} field '{}' set to {}", id, name, value);
        self.shadow.insert(name, value);
        Ok(())
    }

    /// Serialize every pending change into a copy of the buffer in field
    /// order and send the whole table
    ///
    /// A table never read from the device is read first so its other fields
    /// go back unchanged.
    pub async fn write<S>(&mut self, session: &mut S) -> PsemResult<()>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        if !self.spec.header.is_writable() {
            return Err(PsemError::UnsupportedField {
                table: id,
                field: self.spec.name.to_string(),
                reason: "table is read-only".to_string(),
            });
        }
        self.ensure_loaded(session).await?;

        let mut data = self.buffer.clone();
        for descriptor in self.spec.header.fields() {
            if let Some(value) = self.shadow.get(descriptor.name) {
                FieldWriter::at(&mut data, descriptor.offset)
                    .write_field(&descriptor.kind, value)
                    .map_err(|e| e.with_table(id))?;
            }
        }

        let timeout = self.config.request_timeout(session.settings());
        RangeReader::new(session, id, timeout)
            .write_full(&data)
            .await?;

        log::debug!(
            "Wrote table {} with {} changed fields",
            id,
            self.shadow.len()
        );
        self.buffer = data;
        self.shadow.clear();
        self.state = TableState::Loaded;
        Ok(())
    }

    /// Send exactly the byte range of one writable field
    ///
    /// The pending value is sent when there is one, otherwise the cached
    /// value of the field. Bytes outside the field are neither serialized nor
    /// sent.
    pub async fn write_field<S>(&mut self, session: &mut S, name: &str) -> PsemResult<()>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let descriptor = self.descriptor(name)?.clone();
        if !descriptor.is_writable() {
            return Err(PsemError::UnsupportedField {
                table: id,
                field: name.to_string(),
                reason: "field is read-only".to_string(),
            });
        }

        let data = match self.shadow.get(descriptor.name) {
            Some(value) => {
                let mut data = vec![0; descriptor.width()];
                FieldWriter::new(&mut data)
                    .write_field(&descriptor.kind, value)
                    .map_err(|e| e.with_table(id))?;
                data
            }
            None if self.has_data() && descriptor.is_present(self.buffer.len()) => {
                self.buffer[descriptor.offset..descriptor.end()].to_vec()
            }
            None => {
                return Err(PsemError::InvalidData(format!(
                    "Field '{}' of table {} has no value to write",
                    name, id
                )));
            }
        };

        let timeout = self.config.request_timeout(session.settings());
        RangeReader::new(session, id, timeout)
            .write_range(descriptor.offset, &data)
            .await?;

        if self.has_data() && descriptor.is_present(self.buffer.len()) {
            self.buffer[descriptor.offset..descriptor.end()].copy_from_slice(&data);
        }
        self.shadow.remove(descriptor.name);
        if self.state == TableState::Dirty && self.shadow.is_empty() {
            self.state = self.clean_state;
        }
        Ok(())
    }

    /// Lifecycle state of the buffer itself, looking through pending changes
    fn data_state(&self) -> TableState {
        match self.state {
            TableState::Dirty => self.clean_state,
            state => state,
        }
    }

    fn has_data(&self) -> bool {
        self.data_state().is_loaded()
    }

    fn descriptor(&self, name: &str) -> PsemResult<&FieldDescriptor> {
        self.spec
            .header
            .field(name)
            .ok_or_else(|| PsemError::UnsupportedField {
                table: self.id(),
                field: name.to_string(),
                reason: format!("not defined by {}", self.spec.name),
            })
    }

    fn cached_field(&self, descriptor: &FieldDescriptor) -> PsemResult<Option<FieldValue>> {
        if !descriptor.is_present(self.buffer.len()) {
            return Ok(None);
        }
        descriptor
            .decode(&self.buffer)
            .map(Some)
            .map_err(|e| e.with_table(self.id()))
    }

    fn count_descriptor(&self, count_field: &str) -> PsemResult<&FieldDescriptor> {
        self.spec.header.field(count_field).ok_or_else(|| {
            PsemError::InvalidData(format!(
                "Count field '{}' is not part of table {}",
                count_field,
                self.id()
            ))
        })
    }

    fn empty_layout(&self) -> PsemError {
        PsemError::InvalidData(format!("Table {} has an empty record layout", self.id()))
    }

    fn no_records(&self) -> PsemError {
        PsemError::UnsupportedField {
            table: self.id(),
            field: "records".to_string(),
            reason: format!("{} has no record array", self.spec.name),
        }
    }

    fn commit(&mut self, snapshot: Snapshot) {
        if !self.shadow.is_empty() {
            log::debug!(
                "Read of table {} discards {} pending changes",
                self.id(),
                self.shadow.len()
            );
        }
        if self.spec.records.is_some()
            && self.data_state() != TableState::Unloaded
            && snapshot.record_count != self.record_count
        {
            log::info!(
                "Table {} record count changed from {} to {}",
                self.id(),
                self.record_count,
                snapshot.record_count
            );
        }
        if snapshot.buffer.len() != self.buffer.len() {
            log::debug!(
                "Resizing table {} buffer from {} to {} bytes",
                self.id(),
                self.buffer.len(),
                snapshot.buffer.len()
            );
        }
        self.buffer = snapshot.buffer;
        self.records = snapshot.records;
        self.record_count = snapshot.record_count;
        self.record_size = snapshot.record_size;
        self.shadow.clear();
        self.state = TableState::Loaded;
    }

    /// Stage again the changes made before an implicit read
    ///
    /// A trailing field the fresh image no longer reports loses its change.
    fn restore_pending(&mut self, pending: BTreeMap<&'static str, FieldValue>) {
        let len = self.buffer.len();
        for (name, value) in pending {
            match self.spec.header.field(name) {
                Some(descriptor) if descriptor.is_present(len) => {
                    self.shadow.insert(name, value);
                }
                _ => log::warn!(
                    "Table {} does not report '{}', dropping its pending change",
                    self.id(),
                    name
                ),
            }
        }
        if !self.shadow.is_empty() {
            self.clean_state = TableState::Loaded;
            self.state = TableState::Dirty;
        }
    }

    async fn fetch_snapshot<S>(&mut self, session: &mut S) -> PsemResult<Snapshot>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let snapshot = if self.spec.records.is_none() {
            self.fetch_fixed(session).await
        } else {
            self.fetch_records(session).await
        };
        snapshot.map_err(|e| e.with_table(id))
    }

    /// Read a table without a record array
    async fn read_fixed<S>(&mut self, session: &mut S) -> PsemResult<()>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let snapshot = self
            .fetch_fixed(session)
            .await
            .map_err(|e| e.with_table(id))?;
        self.commit(snapshot);
        Ok(())
    }

    async fn fetch_fixed<S>(&self, session: &mut S) -> PsemResult<Snapshot>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let header = &self.spec.header;
        let timeout = self.config.request_timeout(session.settings());
        let data = RangeReader::new(session, id, timeout).read_full().await?;

        check_observed(id, header.minimum_len(), data.len())?;
        if data.len() > header.len() {
            log::warn!(
                "Table {} reported {} bytes, {} beyond the known layout",
                id,
                data.len(),
                data.len() - header.len()
            );
        }
        header.decode_all(&data)?;

        Ok(Snapshot {
            buffer: data.to_vec(),
            records: None,
            record_count: 0,
            record_size: 0,
        })
    }

    /// Learn the record count and stride
    async fn resolve_shape<S>(&mut self, session: &mut S, timeout: Duration) -> PsemResult<Shape>
    where
        S: TableSession + ?Sized,
    {
        let id = self.spec.id;
        let Some(records) = &self.spec.records else {
            return Err(self.no_records());
        };

        let shape = match &records.count {
            CountSource::Dimension {
                count_field,
                stride_field,
                ..
            } => {
                let dimension = self.dimension.as_deref_mut().ok_or_else(|| {
                    PsemError::InvalidData(format!("Table {} has no dimension table", id))
                })?;
                dimension.read_fixed(session).await?;
                let record_count = count_from(&dimension.cached_value(count_field)?)?;
                let reported = match stride_field {
                    Some(field) => Some(count_from(&dimension.cached_value(field)?)?),
                    None => None,
                };
                Shape {
                    header: None,
                    record_count,
                    record_size: resolve_record_size(
                        id,
                        records.layout.minimum_len(),
                        records.layout.len(),
                        reported,
                    )?,
                }
            }
            CountSource::LeadingField { count_field } => {
                let descriptor = self.count_descriptor(count_field)?;
                let header = RangeReader::new(session, id, timeout)
                    .read_range(0, self.spec.header.len())
                    .await?;
                let record_count = count_from(&descriptor.decode(&header)?)?;
                Shape {
                    header: Some(header),
                    record_count,
                    record_size: records.layout.len(),
                }
            }
        };

        if shape.record_size == 0 {
            return Err(self.empty_layout());
        }
        Ok(shape)
    }

    async fn fetch_records<S>(&mut self, session: &mut S) -> PsemResult<Snapshot>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let timeout = self.config.request_timeout(session.settings());
        let max_request_bytes = session.settings().max_request_bytes;

        // Sized from its own count field unless last seen beyond the ceiling
        if let Some(CountSource::LeadingField { count_field }) = self.spec.records.as_ref().map(|r| &r.count) {
            if self.buffer.len() <= max_request_bytes {
                return self.fetch_counted(session, timeout, count_field).await;
            }
        }

        let shape = self.resolve_shape(session, timeout).await?;
        let Some(records) = &self.spec.records else {
            return Err(self.no_records());
        };
        let header = &self.spec.header;
        let header_len = header.len();
        let size = determine_size(&DimensionInputs {
            header_len,
            record_count: shape.record_count,
            record_size: shape.record_size,
        });

        let mut reader = RangeReader::new(session, id, timeout);
        if size <= max_request_bytes {
            let data = reader.read_full().await?;
            return self.decode_image(&data, shape.record_count, shape.record_size);
        }

        let header_bytes = match shape.header {
            Some(bytes) => bytes,
            None => reader.read_range(0, header_len).await?,
        };
        header.decode_all(&header_bytes)?;
        let per_batch = effective_batch(
            shape.record_size,
            self.config.batch_records(records.batch_records),
            max_request_bytes,
        );
        let batched = reader
            .read_records(
                header_len,
                shape.record_size,
                shape.record_count,
                per_batch,
                &records.layout,
            )
            .await?;
        let mut buffer = Vec::with_capacity(size);
        buffer.extend_from_slice(&header_bytes);
        buffer.extend_from_slice(&batched.bytes);

        Ok(Snapshot {
            buffer,
            records: Some(batched.records),
            record_count: shape.record_count,
            record_size: shape.record_size,
        })
    }

    /// Whole-table read of a table that carries its own record count
    async fn fetch_counted<S>(&self, session: &mut S, timeout: Duration, count_field: &str) -> PsemResult<Snapshot>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let Some(records) = &self.spec.records else {
            return Err(self.no_records());
        };
        let descriptor = self.count_descriptor(count_field)?;
        let data = RangeReader::new(session, id, timeout).read_full().await?;
        check_observed(id, self.spec.header.len(), data.len())?;

        let record_count = count_from(&descriptor.decode(&data)?)?;
        let record_size = records.layout.len();
        if record_size == 0 {
            return Err(self.empty_layout());
        }
        let snapshot = self.decode_image(&data, record_count, record_size)?;
        if snapshot.buffer.len() > session.settings().max_request_bytes {
            log::debug!(
                "Table {} holds {} bytes, further reads are batched",
                id,
                snapshot.buffer.len()
            );
        }
        Ok(snapshot)
    }

    /// Decode a whole-table image holding `record_count` records
    fn decode_image(&self, data: &[u8], record_count: usize, record_size: usize) -> PsemResult<Snapshot> {
        let id = self.id();
        let Some(records) = &self.spec.records else {
            return Err(self.no_records());
        };
        let header = &self.spec.header;
        let header_len = header.len();
        let size = determine_size(&DimensionInputs {
            header_len,
            record_count,
            record_size,
        });
        check_observed(id, size, data.len())?;
        if data.len() > size {
            log::warn!(
                "Table {} reported {} bytes for {} records, keeping {}",
                id,
                data.len(),
                record_count,
                size
            );
        }

        let buffer = data[..size].to_vec();
        header.decode_all(&buffer[..header_len])?;
        let decoded = buffer[header_len..]
            .chunks_exact(record_size)
            .enumerate()
            .map(|(index, slice)| records.layout.decode_record(index, slice))
            .collect::<PsemResult<Vec<_>>>()?;
        Ok(Snapshot {
            buffer,
            records: Some(decoded),
            record_count,
            record_size,
        })
    }

    async fn read_fresh<S>(&mut self, session: &mut S, descriptor: &FieldDescriptor) -> PsemResult<FieldValue>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let timeout = self.config.request_timeout(session.settings());
        let data = RangeReader::new(session, id, timeout)
            .read_range(descriptor.offset, descriptor.width())
            .await?;
        let value = FieldReader::new(&data)
            .read_field(&descriptor.kind)
            .map_err(|e| e.with_table(id))?;
        if self.has_data() && descriptor.is_present(self.buffer.len()) {
            self.buffer[descriptor.offset..descriptor.end()].copy_from_slice(&data);
        }
        Ok(value)
    }

    async fn read_record_inner<S>(&mut self, session: &mut S, index: usize) -> PsemResult<Record>
    where
        S: TableSession + ?Sized,
    {
        let id = self.id();
        let timeout = self.config.request_timeout(session.settings());
        let (record_count, record_size) = if self.has_data() {
            (self.record_count, self.record_size)
        } else {
            let shape = self.resolve_shape(session, timeout).await?;
            (shape.record_count, shape.record_size)
        };

        let Some(records) = &self.spec.records else {
            return Err(self.no_records());
        };
        let offset = self.spec.header.len() + index.saturating_mul(record_size);
        if index >= record_count {
            return Err(PsemError::DecodeRange {
                table: Some(id),
                offset,
                length: record_size,
                available: self.spec.header.len() + record_count * record_size,
            });
        }

        let data = RangeReader::new(session, id, timeout)
            .read_range(offset, record_size)
            .await?;
        let record = records.layout.decode_record(index, &data)?;
        if self.has_data() && offset + record_size <= self.buffer.len() {
            self.buffer[offset..offset + record_size].copy_from_slice(&data);
            if let Some(cached) = self.records.as_mut().and_then(|r| r.get_mut(index)) {
                *cached = record.clone();
            }
        }
        Ok(record)
    }
}

fn mismatch(name: &str, expected: &str, value: &FieldValue) -> PsemError {
    PsemError::InvalidData(format!("Field '{}' is not {}: {}", name, expected, value))
}
