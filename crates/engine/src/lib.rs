//! `smeta-engine`: row classification and accumulation for cost-estimate
//! spreadsheets.
//!
//! Pure engine crate: receives a loaded sheet, returns coordinate rows.
//! No workbook parsing or file output.

pub mod accumulate;
pub mod builtin;
pub mod cell;
pub mod classify;
pub mod coord;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod grid;
pub mod output;
pub mod registry;

pub use cell::{Cell, CellValue};
pub use classify::{classify_row, classify_rows, ClassifiedRow, RowRole};
pub use coord::{anchor, CellRef, MergedRange};
pub use dialect::DialectConfig;
pub use engine::{run, Extraction};
pub use error::DialectError;
pub use grid::Grid;
pub use output::{NormalizedRow, RowKind, Slot, OUTPUT_HEADERS};
pub use registry::DialectRegistry;
pub use accumulate::ExtractStats;
