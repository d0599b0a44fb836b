//! PSEM manufacturing table engine
//!
//! Tables are described declaratively (`Layout`, `TableSpec`) and driven by a
//! single generic engine (`TableRecord`) that sizes the table buffer from its
//! dimension inputs, fetches it in one request or in bounded batches,
//! decodes it, and writes modified fields back.
//!
//! # Example
//!
//! ```rust,no_run
//! use psem_session::{CaptureSession, TableSession};
//! use psem_tables::LayoutContext;
//! use psem_tables::tables::ErtDataTable;
//!
//! # async fn example() -> psem_core::PsemResult<()> {
//! let mut session = CaptureSession::load("capture.json").await?;
//! let ctx = LayoutContext::from_settings(session.settings());
//! let mut ert = ErtDataTable::new(&ctx);
//! for entry in ert.entries(&mut session).await? {
//!     println!("{:08X}: {}", entry.ert_id, entry.consumption);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod descriptions;
pub mod layout;
pub mod record;
pub mod sizing;
pub mod spec;
pub mod state;
pub mod table;
pub mod tables;

pub use config::TableConfig;
pub use coordinator::{Batch, BatchedRecords, RangeReader, effective_batch, plan_batches};
pub use descriptions::{DescriptionLookup, StaticDescriptions};
pub use layout::{Access, FieldDescriptor, Freshness, Layout, LayoutBuilder, LayoutContext, Presence};
pub use record::Record;
pub use sizing::{DimensionInputs, check_observed, determine_size};
pub use spec::{CountSource, DEFAULT_BATCH_RECORDS, RecordSpec, TableSpec};
pub use state::TableState;
pub use table::TableRecord;
