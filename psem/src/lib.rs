//! PSEM manufacturing tables
//!
//! Reads and writes manufacturer tables of ANSI C12.19 metering modules over
//! a PSEM (C12.18/C12.21) session.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `psem-core`: error taxonomy, table ids, response codes, timestamps
//! - `psem-codec`: field reader and writer over flat table buffers
//! - `psem-session`: the session trait, a simulated meter and capture replay
//! - `psem-tables`: table record engine and the manufacturing table catalog
//!
//! # Usage
//!
//! ```no_run
//! use psem::session::MemorySession;
//! use psem::tables::tables::ModuleStatusTable;
//! ```

// Re-export core types
pub use psem_core::{CommFailure, MeterTime, PsemError, PsemResult, ResponseCode, TableId, TimeFormat};

// Re-export the byte cursor
pub mod codec {
    pub use psem_codec::*;
}

// Re-export session API
pub mod session {
    pub use psem_session::*;
}

// Re-export the table engine and catalog
pub mod tables {
    pub use psem_tables::*;
}
