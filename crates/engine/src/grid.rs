// In-memory snapshot of one worksheet: cached cell values, formula flags
// and the merge list. Built by the I/O layer or by hand in tests.

use std::collections::HashMap;

use crate::cell::{Cell, CellValue};
use crate::coord::{CellRef, MergedRange};

static EMPTY: CellValue = CellValue::Empty;

#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub name: String,
    cells: HashMap<(u32, u32), Cell>,
    merges: Vec<MergedRange>,
    /// Last used row, 1-based (0 = no rows)
    height: u32,
    /// Number of used columns, counting merge extents
    width: u32,
}

impl Grid {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Store a cell. Blank values still extend the used area, the same way a
    /// styled empty cell does in a saved workbook.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.height = self.height.max(row);
        self.width = self.width.max(col + 1);
        self.cells.insert((row, col), cell);
    }

    pub fn set_value(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        self.set_cell(row, col, Cell::new(value));
    }

    /// Flag a cell as holding a formula, creating it blank if absent.
    pub fn mark_formula(&mut self, row: u32, col: u32) {
        self.height = self.height.max(row);
        self.width = self.width.max(col + 1);
        self.cells.entry((row, col)).or_default().is_formula = true;
    }

    pub fn add_merge(&mut self, merge: MergedRange) {
        self.height = self.height.max(merge.end.row);
        self.width = self.width.max(merge.end.col + 1);
        self.merges.push(merge);
    }

    /// Widen the used area without storing a cell.
    pub fn extend_to(&mut self, row: u32, width: u32) {
        self.height = self.height.max(row);
        self.width = self.width.max(width);
    }

    /// Builder-style setter keyed by A1 reference. Panics on a malformed
    /// reference; meant for fixtures.
    pub fn with(mut self, a1: &str, value: impl Into<CellValue>) -> Self {
        let r = CellRef::parse(a1).unwrap_or_else(|| panic!("bad cell reference {a1:?}"));
        self.set_value(r.row, r.col, value);
        self
    }

    /// Builder-style formula cell with its cached value.
    pub fn with_formula(mut self, a1: &str, cached: impl Into<CellValue>) -> Self {
        let r = CellRef::parse(a1).unwrap_or_else(|| panic!("bad cell reference {a1:?}"));
        self.set_cell(r.row, r.col, Cell::formula(cached));
        self
    }

    /// Builder-style merge, e.g. `.merged("A2:K2")`.
    pub fn merged(mut self, range: &str) -> Self {
        let m = MergedRange::parse(range).unwrap_or_else(|| panic!("bad merge range {range:?}"));
        self.add_merge(m);
        self
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn merges(&self) -> &[MergedRange] {
        &self.merges
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.cell(row, col).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    pub fn value_at(&self, r: CellRef) -> &CellValue {
        self.value(r.row, r.col)
    }

    /// Trimmed text of a cell ("" when blank).
    pub fn text(&self, row: u32, col: u32) -> String {
        self.value(row, col).trimmed_text()
    }

    /// Reference to a cell inside the used area, `None` past the last column.
    pub fn coord(&self, row: u32, col: u32) -> Option<CellRef> {
        (col < self.width).then(|| CellRef::new(row, col))
    }

    /// Columns of `row` holding a non-blank value, ascending.
    pub fn non_blank_cols(&self, row: u32) -> Vec<u32> {
        (0..self.width)
            .filter(|&col| self.cell(row, col).map_or(false, |c| !c.is_blank()))
            .collect()
    }

    pub fn row_is_blank(&self, row: u32) -> bool {
        (0..self.width).all(|col| self.cell(row, col).map_or(true, |c| c.is_blank()))
    }

    /// Merge on `row` whose columns are exactly `[col_start, col_end]`.
    pub fn merged_range_covering(&self, row: u32, col_start: u32, col_end: u32) -> Option<&MergedRange> {
        merged_range_covering(&self.merges, row, col_start, col_end)
    }
}

/// Find the merge whose row span includes `row` and whose column span is
/// exactly `[col_start, col_end]`. Overlapping but wider or narrower merges
/// do not count.
pub fn merged_range_covering(
    merges: &[MergedRange],
    row: u32,
    col_start: u32,
    col_end: u32,
) -> Option<&MergedRange> {
    merges
        .iter()
        .find(|m| m.contains_row(row) && m.spans_exactly(col_start, col_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_span_only() {
        let grid = Grid::new("s").merged("A5:K5").merged("D6:K6");
        assert_eq!(grid.merged_range_covering(5, 0, 10).unwrap().to_string(), "A5:K5");
        // narrower/wider spans do not match
        assert!(grid.merged_range_covering(5, 0, 9).is_none());
        assert!(grid.merged_range_covering(5, 0, 11).is_none());
        assert!(grid.merged_range_covering(6, 0, 10).is_none());
        assert!(grid.merged_range_covering(6, 3, 10).is_some());
    }

    #[test]
    fn test_multi_row_merge_covers_each_row() {
        let grid = Grid::new("s").merged("V10:W12");
        assert!(grid.merged_range_covering(10, 21, 22).is_some());
        assert!(grid.merged_range_covering(12, 21, 22).is_some());
        assert!(grid.merged_range_covering(13, 21, 22).is_none());
    }

    #[test]
    fn test_dimensions_include_merges() {
        let grid = Grid::new("s").with("A2", "x").merged("A3:AB3");
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 28);
    }

    #[test]
    fn test_blank_row_detection() {
        let grid = Grid::new("s")
            .with("A2", "  ")
            .with("C3", 0.0)
            .with("B4", "");
        assert!(grid.row_is_blank(2));
        assert!(!grid.row_is_blank(3));
        assert!(grid.row_is_blank(4));
        assert_eq!(grid.non_blank_cols(3), vec![2]);
    }

    #[test]
    fn test_coord_outside_used_area() {
        let grid = Grid::new("s").with("E2", 1);
        assert_eq!(grid.coord(2, 4).unwrap().to_string(), "E2");
        assert!(grid.coord(2, 5).is_none());
    }
}
