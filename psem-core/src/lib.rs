//! Core types and utilities for PSEM manufacturing tables
//!
//! This crate provides the error taxonomy, table identifiers, PSEM response
//! codes and the timestamp types shared by the codec, session and table
//! crates.

pub mod datatypes;
pub mod error;
pub mod response_code;
pub mod table_id;

pub use datatypes::{MeterTime, TimeFormat};
pub use error::{CommFailure, PsemError, PsemResult};
pub use response_code::ResponseCode;
pub use table_id::TableId;
