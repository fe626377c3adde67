use log::debug;
use serde::Serialize;

use crate::accumulate::{accumulate, ExtractStats};
use crate::dialect::DialectConfig;
use crate::grid::Grid;
use crate::output::{apply_filters, NormalizedRow, OUTPUT_HEADERS};

/// Result of extracting one worksheet: the fixed column titles plus
/// coordinate rows ordered by source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub sheet: String,
    pub dialect: String,
    pub headers: Vec<String>,
    pub rows: Vec<NormalizedRow>,
    pub stats: ExtractStats,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Run one dialect over a loaded sheet. Never fails: rows that match no
/// rule are ignored and unresolved totals stay empty.
pub fn run(grid: &Grid, dialect: &DialectConfig) -> Extraction {
    let (records, mut stats) = accumulate(grid, dialect);
    let mut rows: Vec<NormalizedRow> = records.into_iter().map(NormalizedRow::from_record).collect();
    stats.records_dropped_zero_total = apply_filters(&mut rows, grid, dialect);

    debug!(
        "{} [{}]: {} rows scanned, {} sections, {} subsections, {} items ({} unresolved), {} output rows",
        grid.name,
        dialect.name,
        stats.rows_scanned,
        stats.sections,
        stats.subsections,
        stats.items,
        stats.items_unresolved,
        rows.len(),
    );

    Extraction {
        sheet: grid.name.clone(),
        dialect: dialect.name.clone(),
        headers: OUTPUT_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
        stats,
    }
}
