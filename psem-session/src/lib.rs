//! Session layer seam for PSEM manufacturing tables
//!
//! The request/response exchange with a meter is an external collaborator.
//! This crate defines the trait the table engine talks to (`TableSession`),
//! its settings, and two byte sources implementing it without a live link:
//! a simulated in-memory meter and a replay of a captured session.

pub mod capture;
pub mod memory;
pub mod session;
pub mod settings;
pub mod statistics;

pub use capture::{CaptureDocument, CaptureSession, CapturedTable};
pub use memory::MemorySession;
pub use session::{TableSession, with_timeout};
pub use settings::SessionSettings;
pub use statistics::SessionStatistics;
