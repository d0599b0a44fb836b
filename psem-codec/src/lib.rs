//! Byte cursor for PSEM manufacturing tables
//!
//! Tables travel as flat, field-order significant byte buffers. This crate
//! provides the sequential decoder (`FieldReader`) and its inverse
//! (`FieldWriter`) together with the vocabulary used to describe one field:
//! its encoding (`FieldKind`) and its decoded value (`FieldValue`).

pub mod reader;
pub mod types;
pub mod writer;

pub use reader::FieldReader;
pub use types::{ByteOrder, FieldKind, FieldValue};
pub use writer::FieldWriter;
