//! Row-by-row accumulation of headers and items.
//!
//! Headers are held pending (one per level) until something closes them;
//! items wait in a buffer until a priced-item row supplies their total or a
//! structural row interrupts them. Emission order is fixed up by a final
//! stable sort on source row.

use log::{debug, warn};
use serde::Serialize;

use crate::cell::{is_integer_valued, is_numeric_zero};
use crate::classify::{classify_row, data_rows, resolve_inline, RowRole};
use crate::coord::CellRef;
use crate::dialect::{DialectConfig, Level};
use crate::grid::Grid;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingHeader {
    pub level: Level,
    pub row: u32,
    pub anchor: CellRef,
    pub title: String,
    pub total: Option<CellRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub row: u32,
    /// Coordinates for output slots 1..=5.
    pub sources: [Option<CellRef>; 5],
    pub total: Option<CellRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(PendingHeader),
    Item(ItemRecord),
}

impl Record {
    pub fn row(&self) -> u32 {
        match self {
            Record::Header(h) => h.row,
            Record::Item(i) => i.row,
        }
    }

    pub fn total(&self) -> Option<CellRef> {
        match self {
            Record::Header(h) => h.total,
            Record::Item(i) => i.total,
        }
    }
}

/// Counters collected during one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    /// Non-blank rows examined (row 2 onward).
    pub rows_scanned: usize,
    pub sections: usize,
    pub subsections: usize,
    pub items: usize,
    pub items_inline_priced: usize,
    pub items_deferred_priced: usize,
    pub items_unresolved: usize,
    /// Item rows seen before the first section header.
    pub items_before_first_section: usize,
    pub items_skipped_zero: usize,
    pub records_dropped_zero_total: usize,
    pub orphan_footers: usize,
}

#[derive(Debug, Default)]
pub struct Accumulator {
    first_section_found: bool,
    section: Option<PendingHeader>,
    subsection: Option<PendingHeader>,
    buffer: Vec<ItemRecord>,
    out: Vec<Record>,
    stats: ExtractStats,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_section_found(&self) -> bool {
        self.first_section_found
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Apply one classified row.
    pub fn feed(&mut self, grid: &Grid, dialect: &DialectConfig, row: u32, role: RowRole) {
        self.stats.rows_scanned += 1;

        if role.is_structural() && !self.buffer.is_empty() {
            self.flush_unresolved();
        }

        match role {
            RowRole::SectionHeader { anchor, title } => {
                if self.first_section_found {
                    self.emit_subsection();
                    self.emit_section();
                }
                self.section = Some(PendingHeader {
                    level: Level::Section,
                    row,
                    anchor,
                    title,
                    total: None,
                });
                self.subsection = None;
                self.first_section_found = true;
            }
            RowRole::SubsectionHeader { anchor, title } => {
                if self.first_section_found {
                    self.emit_subsection();
                }
                self.subsection = Some(PendingHeader {
                    level: Level::Subsection,
                    row,
                    anchor,
                    title,
                    total: None,
                });
            }
            RowRole::SubsectionFooter { total } => match self.subsection.as_mut() {
                Some(header) => {
                    header.total = total;
                    if self.first_section_found {
                        self.emit_subsection();
                    }
                }
                None => self.orphan_footer(row, Level::Subsection),
            },
            RowRole::SectionFooter { total } => {
                if self.first_section_found {
                    self.emit_subsection();
                }
                match self.section.as_mut() {
                    Some(header) => {
                        header.total = total;
                        if self.first_section_found {
                            self.emit_section();
                        }
                    }
                    None => self.orphan_footer(row, Level::Section),
                }
            }
            RowRole::ItemPrice { total } => {
                for item in &mut self.buffer {
                    item.total = total;
                }
                if self.first_section_found && !self.buffer.is_empty() {
                    self.stats.items_deferred_priced += self.buffer.len();
                    self.out.extend(self.buffer.drain(..).map(Record::Item));
                }
            }
            RowRole::Item => self.item(grid, dialect, row),
            RowRole::Unclassified => {}
        }
    }

    /// End of sheet: flush what is still pending and return records ordered
    /// by source row.
    pub fn finish(mut self) -> (Vec<Record>, ExtractStats) {
        if self.first_section_found {
            self.flush_unresolved();
            self.emit_subsection();
            self.emit_section();
        }
        self.out.sort_by_key(Record::row);
        (self.out, self.stats)
    }

    fn item(&mut self, grid: &Grid, dialect: &DialectConfig, row: u32) {
        if !self.first_section_found {
            self.stats.items_before_first_section += 1;
            return;
        }
        if let Some(col) = dialect.filters.skip_item_when_zero {
            if is_numeric_zero(grid.value(row, col.index())) {
                debug!("row {row}: item skipped, {col}{row} is zero");
                self.stats.items_skipped_zero += 1;
                return;
            }
        }

        let rule = &dialect.item;
        let sources = rule.columns.map(|c| grid.coord(row, c.index()));
        self.stats.items += 1;

        let inline = rule.inline_price.as_ref().and_then(|source| {
            is_integer_valued(grid.value(row, rule.id_column.index()))
                .then(|| resolve_inline(grid, row, source))
                .flatten()
        });

        match inline {
            Some(total) => {
                self.stats.items_inline_priced += 1;
                self.out.push(Record::Item(ItemRecord { row, sources, total: Some(total) }));
            }
            None => self.buffer.push(ItemRecord { row, sources, total: None }),
        }
    }

    fn flush_unresolved(&mut self) {
        if self.first_section_found && !self.buffer.is_empty() {
            debug!("{} item(s) emitted without a total", self.buffer.len());
            self.stats.items_unresolved += self.buffer.len();
            self.out.extend(self.buffer.drain(..).map(Record::Item));
        }
        self.buffer.clear();
    }

    fn emit_subsection(&mut self) {
        if let Some(header) = self.subsection.take() {
            self.stats.subsections += 1;
            self.out.push(Record::Header(header));
        }
    }

    fn emit_section(&mut self) {
        if let Some(header) = self.section.take() {
            self.stats.sections += 1;
            self.out.push(Record::Header(header));
        }
    }

    fn orphan_footer(&mut self, row: u32, level: Level) {
        if self.first_section_found {
            warn!("row {row}: {level} footer without an open {level} header");
            self.stats.orphan_footers += 1;
        }
    }
}

/// Classify and accumulate every data row of the grid.
pub fn accumulate(grid: &Grid, dialect: &DialectConfig) -> (Vec<Record>, ExtractStats) {
    let mut acc = Accumulator::new();
    for row in data_rows(grid) {
        let role = classify_row(grid, dialect, row);
        acc.feed(grid, dialect, row, role);
    }
    acc.finish()
}
