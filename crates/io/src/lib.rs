//! `routeplan-io`: the filesystem side of routeplan. Planning workbooks,
//! system exports, the mapping exchange file, backups, reports and the
//! update run.

pub mod error;
pub mod export;
pub mod fsutil;
pub mod mapping;
pub mod report;
pub mod update;
pub mod workbook;

pub use error::IoError;
pub use export::{load_export, ExportData};
pub use fsutil::{create_backup, write_atomic};
pub use mapping::{read_mapping, write_mapping};
pub use report::{write_comparison_report, write_diff_report};
pub use update::{run_update, UpdateOptions, UpdateOutcome, UpdateReport};
pub use workbook::{load_planning, save_planning, truncate_sheet_name, PlanningWorkbook};
