//! Manufacturing table catalog
//!
//! Each table is a layout function plus a thin typed wrapper around
//! `TableRecord`.

pub mod ert;
pub mod history_log;
pub mod module_config;
pub mod module_status;

pub use ert::{ERT_ACTUAL, ERT_DATA, ErtActualTable, ErtDataTable, ErtEntry};
pub use history_log::{HISTORY_LOG, HistoryEntry, HistoryLogTable};
pub use module_config::{MODULE_CONFIG, ModuleConfigField, ModuleConfigTable};
pub use module_status::{MODULE_STATUS, ModuleStatusTable};

use crate::layout::LayoutContext;
use crate::spec::TableSpec;
use psem_core::TableId;

/// Definitions of every catalog table, ascending by id
pub fn catalog(ctx: &LayoutContext) -> Vec<TableSpec> {
    vec![
        ert::actual_spec(),
        ert::data_spec(ctx),
        module_status::spec(ctx),
        history_log::spec(ctx),
        module_config::spec(),
    ]
}

/// Definition of one catalog table
pub fn lookup(ctx: &LayoutContext, id: TableId) -> Option<TableSpec> {
    catalog(ctx).into_iter().find(|spec| spec.id == id)
}
