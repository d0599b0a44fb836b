//! Partial/offset read coordinator
//!
//! Issues range reads for a single field, a single record, or a record array
//! split into batches that stay below the per-request byte ceiling. Batches
//! are read strictly one after another; records decoded from a batch are only
//! handed out once every batch succeeded.

use crate::layout::Layout;
use crate::record::Record;
use bytes::Bytes;
use psem_core::{PsemError, PsemResult, TableId};
use psem_session::{TableSession, with_timeout};
use std::time::Duration;

/// One range request covering consecutive records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub first_record: usize,
    pub record_count: usize,
}

impl Batch {
    /// Table offset of the first byte of this batch
    pub fn offset(&self, base_offset: usize, record_size: usize) -> usize {
        base_offset + self.first_record * record_size
    }

    pub fn byte_len(&self, record_size: usize) -> usize {
        self.record_count * record_size
    }
}

/// Split `record_count` records into full batches plus one remainder batch
pub fn plan_batches(record_count: usize, per_batch: usize) -> Vec<Batch> {
    let per_batch = per_batch.max(1);
    (0..record_count)
        .step_by(per_batch)
        .map(|first_record| Batch {
            first_record,
            record_count: per_batch.min(record_count - first_record),
        })
        .collect()
}

/// Records per request honoring both the table cap and the byte ceiling
pub fn effective_batch(record_size: usize, batch_records: usize, max_request_bytes: usize) -> usize {
    let by_bytes = max_request_bytes.checked_div(record_size).unwrap_or(usize::MAX);
    batch_records.min(by_bytes).max(1)
}

/// Record array assembled from batched reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchedRecords {
    /// Raw bytes of all records, in table order
    pub bytes: Vec<u8>,
    pub records: Vec<Record>,
}

/// Range reads and writes for one table over a borrowed session
pub struct RangeReader<'s, S: TableSession + ?Sized> {
    session: &'s mut S,
    table: TableId,
    timeout: Duration,
}

impl<'s, S: TableSession + ?Sized> RangeReader<'s, S> {
    pub fn new(session: &'s mut S, table: TableId, timeout: Duration) -> Self {
        Self {
            session,
            table,
            timeout,
        }
    }

    /// Full table read
    pub async fn read_full(&mut self) -> PsemResult<Bytes> {
        log::debug!("Full read of table {}", self.table);
        with_timeout(self.table, self.timeout, self.session.fetch_table(self.table)).await
    }

    /// Read exactly `length` bytes at `offset`
    pub async fn read_range(&mut self, offset: usize, length: usize) -> PsemResult<Bytes> {
        log::debug!(
            "Offset read of table {}: {} bytes at {}",
            self.table,
            length,
            offset
        );
        let data = with_timeout(
            self.table,
            self.timeout,
            self.session.fetch_range(self.table, offset, length),
        )
        .await?;
        if data.len() < length {
            return Err(PsemError::UndersizedBuffer {
                table: self.table,
                minimum: length,
                actual: data.len(),
            });
        }
        Ok(data.slice(..length))
    }

    /// Read a record array in batches of at most `per_batch` records
    ///
    /// Records start at `base_offset` and are `record_size` bytes apart; each
    /// is decoded with `layout` as soon as its batch arrives. The first failed
    /// batch aborts the remaining ones and nothing decoded so far is returned.
    pub async fn read_records(
        &mut self,
        base_offset: usize,
        record_size: usize,
        record_count: usize,
        per_batch: usize,
        layout: &Layout,
    ) -> PsemResult<BatchedRecords> {
        let batches = plan_batches(record_count, per_batch);
        let mut result = BatchedRecords {
            bytes: Vec::with_capacity(record_count * record_size),
            records: Vec::with_capacity(record_count),
        };
        for batch in &batches {
            let data = self
                .read_range(batch.offset(base_offset, record_size), batch.byte_len(record_size))
                .await?;
            for (i, slice) in data.chunks_exact(record_size).enumerate() {
                result
                    .records
                    .push(layout.decode_record(batch.first_record + i, slice)?);
            }
            result.bytes.extend_from_slice(&data);
        }
        log::debug!(
            "Read {} records of table {} in {} batches",
            result.records.len(),
            self.table,
            batches.len()
        );
        Ok(result)
    }

    /// Full table write
    pub async fn write_full(&mut self, data: &[u8]) -> PsemResult<()> {
        log::debug!("Full write of table {}: {} bytes", self.table, data.len());
        with_timeout(self.table, self.timeout, self.session.send_table(self.table, data)).await
    }

    /// Offset write of `data` at `offset`
    pub async fn write_range(&mut self, offset: usize, data: &[u8]) -> PsemResult<()> {
        log::debug!(
            "Offset write of table {}: {} bytes at {}",
            self.table,
            data.len(),
            offset
        );
        with_timeout(
            self.table,
            self.timeout,
            self.session.send_range(self.table, offset, data),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psem_codec::{ByteOrder, FieldKind, FieldValue};
    use psem_core::{CommFailure, ResponseCode};
    use psem_session::{MemorySession, SessionSettings};

    const TABLE: TableId = TableId::new(2520);

    fn layout() -> Layout {
        Layout::builder()
            .field("value", FieldKind::U16(ByteOrder::Big))
            .build()
    }

    fn session(records: u16) -> MemorySession {
        let mut image = vec![0xAA, 0xBB];
        for i in 0..records {
            image.extend_from_slice(&i.to_be_bytes());
        }
        MemorySession::new(SessionSettings::default()).with_table(TABLE, image)
    }

    #[test]
    fn test_plan_batches() {
        let batches = plan_batches(150, 60);
        assert_eq!(
            batches,
            vec![
                Batch { first_record: 0, record_count: 60 },
                Batch { first_record: 60, record_count: 60 },
                Batch { first_record: 120, record_count: 30 },
            ]
        );
        assert_eq!(plan_batches(120, 60).len(), 2);
        assert!(plan_batches(0, 60).is_empty());
    }

    #[test]
    fn test_effective_batch() {
        assert_eq!(effective_batch(53, 60, 1400), 26);
        assert_eq!(effective_batch(8, 60, 1400), 60);
        assert_eq!(effective_batch(2000, 60, 1400), 1);
        assert_eq!(effective_batch(0, 60, 1400), 60);
    }

    #[test]
    fn test_batch_offsets() {
        let batch = Batch { first_record: 60, record_count: 30 };
        assert_eq!(batch.offset(6, 10), 606);
        assert_eq!(batch.byte_len(10), 300);
    }

    #[tokio::test]
    async fn test_batched_read_matches_single_read() {
        let mut session = session(150);
        let layout = layout();
        let timeout = Duration::from_secs(1);

        let batched = RangeReader::new(&mut session, TABLE, timeout)
            .read_records(2, 2, 150, 60, &layout)
            .await
            .unwrap();
        let single = RangeReader::new(&mut session, TABLE, timeout)
            .read_records(2, 2, 150, 150, &layout)
            .await
            .unwrap();

        assert_eq!(batched, single);
        assert_eq!(batched.records.len(), 150);
        for (i, record) in batched.records.iter().enumerate() {
            assert_eq!(record.index(), i);
            assert_eq!(record.get("value"), Some(&FieldValue::Unsigned(i as u64)));
        }
        // three batches plus one single read
        assert_eq!(session.statistics().fetch_requests, 4);
    }

    #[tokio::test]
    async fn test_failed_batch_aborts() {
        let mut session = session(150);
        session.fail_fetch(2, ResponseCode::Bsy);
        let err = RangeReader::new(&mut session, TABLE, Duration::from_secs(1))
            .read_records(2, 2, 150, 60, &layout())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PsemError::communication(TABLE, CommFailure::Response(ResponseCode::Bsy))
        );
        // the third batch is never requested
        assert_eq!(session.statistics().fetch_requests, 1);
    }

    #[test]
    fn test_read_full() {
        let mut session = session(3);
        let data = tokio_test::block_on(
            RangeReader::new(&mut session, TABLE, Duration::from_secs(1)).read_full(),
        )
        .unwrap();
        assert_eq!(&data[..], &[0xAA, 0xBB, 0, 0, 0, 1, 0, 2]);
    }

    #[tokio::test]
    async fn test_short_range_is_undersized() {
        let mut session = ShortSession(MemorySession::new(SessionSettings::default()));
        let err = RangeReader::new(&mut session, TABLE, Duration::from_secs(1))
            .read_range(0, 4)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PsemError::UndersizedBuffer {
                table: TABLE,
                minimum: 4,
                actual: 2,
            }
        );
    }

    /// Answers every range read with two bytes
    struct ShortSession(MemorySession);

    #[async_trait::async_trait]
    impl TableSession for ShortSession {
        async fn fetch_table(&mut self, table: TableId) -> PsemResult<Bytes> {
            self.0.fetch_table(table).await
        }

        async fn fetch_range(&mut self, _table: TableId, _offset: usize, _length: usize) -> PsemResult<Bytes> {
            Ok(Bytes::from_static(&[1, 2]))
        }

        async fn send_table(&mut self, table: TableId, data: &[u8]) -> PsemResult<()> {
            self.0.send_table(table, data).await
        }

        async fn send_range(&mut self, table: TableId, offset: usize, data: &[u8]) -> PsemResult<()> {
            self.0.send_range(table, offset, data).await
        }

        fn settings(&self) -> &psem_session::SessionSettings {
            self.0.settings()
        }
    }

    #[tokio::test]
    async fn test_read_range_and_write_range() {
        let mut session = session(2);
        let mut reader = RangeReader::new(&mut session, TABLE, Duration::from_secs(1));
        reader.write_range(2, &[0x12, 0x34]).await.unwrap();
        assert_eq!(&reader.read_range(2, 2).await.unwrap()[..], &[0x12, 0x34]);
    }

    #[tokio::test]
    async fn test_read_range_timeout() {
        let mut session = session(2);
        session.set_delay(Some(Duration::from_millis(200)));
        let err = RangeReader::new(&mut session, TABLE, Duration::from_millis(10))
            .read_range(0, 2)
            .await
            .unwrap_err();
        assert_eq!(err, PsemError::communication(TABLE, CommFailure::Timeout));
    }
}
