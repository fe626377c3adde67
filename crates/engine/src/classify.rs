use std::fmt;

use serde::Serialize;

use crate::cell::is_blank;
use crate::coord::{CellRef, MergedRange};
use crate::dialect::{DialectConfig, Level, PriceMatch, Span, SubsectionMatch, TotalSource};
use crate::grid::Grid;

/// Structural role of one worksheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RowRole {
    SectionHeader { anchor: CellRef, title: String },
    SubsectionHeader { anchor: CellRef, title: String },
    SectionFooter { total: Option<CellRef> },
    SubsectionFooter { total: Option<CellRef> },
    ItemPrice { total: Option<CellRef> },
    Item,
    Unclassified,
}

impl RowRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SectionHeader { .. } => "section_header",
            Self::SubsectionHeader { .. } => "subsection_header",
            Self::SectionFooter { .. } => "section_footer",
            Self::SubsectionFooter { .. } => "subsection_footer",
            Self::ItemPrice { .. } => "item_price",
            Self::Item => "item",
            Self::Unclassified => "unclassified",
        }
    }

    /// Headers and footers interrupt a pending item buffer.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::SectionHeader { .. }
                | Self::SubsectionHeader { .. }
                | Self::SectionFooter { .. }
                | Self::SubsectionFooter { .. }
        )
    }
}

impl fmt::Display for RowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-blank row together with its role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRow {
    pub row: u32,
    #[serde(flatten)]
    pub role: RowRole,
}

/// Classify one row. First match wins: header, footers in list order,
/// priced-item row, item, unclassified.
pub fn classify_row(grid: &Grid, dialect: &DialectConfig, row: u32) -> RowRole {
    if let Some(role) = match_header(grid, dialect, row) {
        return role;
    }
    if let Some(role) = match_footer(grid, dialect, row) {
        return role;
    }
    if matches_item_price(grid, dialect, row) {
        let total = resolve_total(grid, row, &dialect.item_price.total);
        return RowRole::ItemPrice { total };
    }
    if is_item(grid, dialect, row) {
        return RowRole::Item;
    }
    RowRole::Unclassified
}

/// Classify every non-blank row from 2 to the last used row.
pub fn classify_rows(grid: &Grid, dialect: &DialectConfig) -> Vec<ClassifiedRow> {
    data_rows(grid)
        .map(|row| ClassifiedRow { row, role: classify_row(grid, dialect, row) })
        .collect()
}

/// Row 1 is the sheet title; fully blank rows are skipped.
pub(crate) fn data_rows(grid: &Grid) -> impl Iterator<Item = u32> + '_ {
    (2..=grid.height()).filter(move |&row| !grid.row_is_blank(row))
}

fn match_header(grid: &Grid, dialect: &DialectConfig, row: u32) -> Option<RowRole> {
    let rule = &dialect.header;
    let merge = covering(grid, row, &rule.span)?;
    let title = grid.text(row, rule.text_column.index());
    if title.is_empty() {
        return None;
    }
    let anchor = merge.anchor();

    if title.starts_with(rule.section_prefix.as_str()) {
        return Some(RowRole::SectionHeader { anchor, title });
    }
    let is_subsection = match &rule.subsection {
        SubsectionMatch::Prefix { prefix } => title.starts_with(prefix.as_str()),
        SubsectionMatch::AnyText => true,
    };
    is_subsection.then_some(RowRole::SubsectionHeader { anchor, title })
}

fn match_footer(grid: &Grid, dialect: &DialectConfig, row: u32) -> Option<RowRole> {
    dialect.footers.iter().find_map(|footer| {
        covering(grid, row, &footer.span)?;
        let text = grid.text(row, footer.text_column.index());
        if !text.starts_with(footer.prefix.as_str()) {
            return None;
        }
        let total = resolve_total(grid, row, &footer.total);
        Some(match footer.level {
            Level::Section => RowRole::SectionFooter { total },
            Level::Subsection => RowRole::SubsectionFooter { total },
        })
    })
}

fn matches_item_price(grid: &Grid, dialect: &DialectConfig, row: u32) -> bool {
    match &dialect.item_price.rule {
        PriceMatch::MergedText { span, text_column, text } => {
            covering(grid, row, span).is_some() && grid.text(row, text_column.index()) == *text
        }
        PriceMatch::ColumnText { column, text } => grid.text(row, column.index()) == *text,
        PriceMatch::ColumnPattern { non_empty, empty } => {
            let filled = grid.non_blank_cols(row);
            non_empty.iter().all(|c| filled.contains(&c.index()))
                && !empty.iter().any(|c| filled.contains(&c.index()))
        }
    }
}

/// Identifier cell holds a literal (non-formula, non-blank) number.
fn is_item(grid: &Grid, dialect: &DialectConfig, row: u32) -> bool {
    grid.cell(row, dialect.item.id_column.index()).map_or(false, |cell| {
        !cell.is_formula && !cell.is_blank() && cell.value.as_number().is_some()
    })
}

fn covering<'g>(grid: &'g Grid, row: u32, span: &Span) -> Option<&'g MergedRange> {
    grid.merged_range_covering(row, span.start.index(), span.end.index())
}

/// Coordinate a total is read from: the anchor of the configured merge when
/// the row carries it, else the column on this row. `None` past the last
/// used column.
pub fn resolve_total(grid: &Grid, row: u32, source: &TotalSource) -> Option<CellRef> {
    if let Some(span) = &source.merge {
        if let Some(merge) = covering(grid, row, span) {
            return Some(merge.anchor());
        }
    }
    grid.coord(row, source.column.index())
}

/// Inline price of an item row: present only when this row's own price cell
/// is non-blank and the configured merge (if any) covers it. Rows below the
/// top of a taller merge read blank and wait for a price row.
pub fn resolve_inline(grid: &Grid, row: u32, source: &TotalSource) -> Option<CellRef> {
    if is_blank(grid.value(row, source.column.index())) {
        return None;
    }
    match &source.merge {
        Some(span) => covering(grid, row, span).map(|merge| merge.anchor()),
        None => grid.coord(row, source.column.index()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn role(grid: &Grid, dialect: &DialectConfig, row: u32) -> &'static str {
        classify_row(grid, dialect, row).name()
    }

    #[test]
    fn smeta_ru_headers_need_full_merge() {
        let d = builtin::smeta_ru();
        let grid = Grid::new("s")
            .with("A2", "Раздел: 1. Земляные работы")
            .merged("A2:K2")
            .with("A3", "Подраздел: 1.1")
            .merged("A3:K3")
            .with("A4", "Раздел: 2")
            .merged("A4:J4");
        assert_eq!(role(&grid, &d, 2), "section_header");
        assert_eq!(role(&grid, &d, 3), "subsection_header");
        assert_eq!(role(&grid, &d, 4), "unclassified");
    }

    #[test]
    fn smeta_ru_header_title_and_anchor() {
        let d = builtin::smeta_ru();
        let grid = Grid::new("s").with("A2", "  Раздел: 1 ").merged("A2:K2");
        assert_eq!(
            classify_row(&grid, &d, 2),
            RowRole::SectionHeader { anchor: CellRef::new(2, 0), title: "Раздел: 1".into() }
        );
    }

    #[test]
    fn smeta_ru_price_row_by_column_pattern() {
        let d = builtin::smeta_ru();
        let grid = Grid::new("s")
            .with("I5", 1200.0)
            .with("K5", 3.0)
            .with("I6", 1200.0)
            .with("K6", 3.0)
            .with("C6", "text")
            .with("I7", 1200.0);
        assert_eq!(
            classify_row(&grid, &d, 5),
            RowRole::ItemPrice { total: Some(CellRef::new(5, 8)) }
        );
        assert_eq!(role(&grid, &d, 6), "unclassified");
        assert_eq!(role(&grid, &d, 7), "unclassified");
    }

    #[test]
    fn smeta_ru_footers() {
        let d = builtin::smeta_ru();
        let grid = Grid::new("s")
            .with("A8", "Итого по подразделу: 1.1")
            .merged("A8:K8")
            .with("A9", "Итого по разделу: 1")
            .merged("A9:K9")
            .with("I9", 500.0);
        assert_eq!(
            classify_row(&grid, &d, 8),
            RowRole::SubsectionFooter { total: Some(CellRef::new(8, 8)) }
        );
        assert_eq!(
            classify_row(&grid, &d, 9),
            RowRole::SectionFooter { total: Some(CellRef::new(9, 8)) }
        );
    }

    #[test]
    fn item_identifier_rules() {
        let d = builtin::smeta_ru();
        let grid = Grid::new("s")
            .with("A3", 1)
            .with("A4", "2")
            .with("A5", "1.1.1")
            .with_formula("A6", 3)
            .with("A7", "3,5");
        assert_eq!(role(&grid, &d, 3), "item");
        assert_eq!(role(&grid, &d, 4), "item");
        assert_eq!(role(&grid, &d, 5), "unclassified");
        assert_eq!(role(&grid, &d, 6), "unclassified");
        assert_eq!(role(&grid, &d, 7), "item");
    }

    #[test]
    fn turbosmetchik_price_row_requires_merge_and_text() {
        let d = builtin::turbosmetchik_1();
        let grid = Grid::new("s")
            .with("D5", "Всего по позиции")
            .merged("D5:R5")
            .with("V5", 99.0)
            .with("D6", "Всего по позиции")
            .with("V6", 99.0);
        assert_eq!(
            classify_row(&grid, &d, 5),
            RowRole::ItemPrice { total: Some(CellRef::parse("V5").unwrap()) }
        );
        assert_eq!(role(&grid, &d, 6), "unclassified");
    }

    #[test]
    fn turbosmetchik_3_price_prefers_merge_anchor() {
        let d = builtin::turbosmetchik_3();
        let grid = Grid::new("s")
            .with("E5", "Всего по позиции")
            .merged("E5:S5")
            .merged("Z5:AB5")
            .with("E6", "Всего по позиции")
            .merged("E6:S6");
        assert_eq!(
            classify_row(&grid, &d, 5),
            RowRole::ItemPrice { total: CellRef::parse("Z5") }
        );
        assert_eq!(
            classify_row(&grid, &d, 6),
            RowRole::ItemPrice { total: CellRef::parse("Z6") }
        );
    }

    #[test]
    fn grandsmeta_any_text_subsection() {
        let d = builtin::grandsmeta();
        let grid = Grid::new("s")
            .with("A2", "Раздел 1. Демонтаж")
            .merged("A2:K2")
            .with("A3", "Стены")
            .merged("A3:K3")
            .merged("A4:K4");
        assert_eq!(role(&grid, &d, 2), "section_header");
        assert_eq!(role(&grid, &d, 3), "subsection_header");
        // merge without text is not a header; row is blank and skipped anyway
        assert_eq!(role(&grid, &d, 4), "unclassified");
    }

    #[test]
    fn grandsmeta_footers_use_their_own_spans() {
        let d = builtin::grandsmeta();
        let grid = Grid::new("s")
            .with("D7", "Итого по подразделу Стены")
            .merged("D7:K7")
            .with("V7", 10.0)
            .with("C8", "Итого по разделу 1")
            .merged("C8:H8")
            .with("K8", 20.0)
            .with("C9", "Итого по разделу 1")
            .merged("D9:K9");
        assert_eq!(
            classify_row(&grid, &d, 7),
            RowRole::SubsectionFooter { total: CellRef::parse("V7") }
        );
        assert_eq!(
            classify_row(&grid, &d, 8),
            RowRole::SectionFooter { total: CellRef::parse("K8") }
        );
        assert_eq!(role(&grid, &d, 9), "unclassified");
    }

    #[test]
    fn total_outside_used_area_is_none() {
        let d = builtin::turbosmetchik_1();
        let grid = Grid::new("s").with("D4", "Итого по разделу 1").merged("D4:K4");
        assert_eq!(classify_row(&grid, &d, 4), RowRole::SectionFooter { total: None });
    }

    #[test]
    fn inline_price_requires_merge_and_value() {
        let d = builtin::turbosmetchik_1();
        let inline = d.item.inline_price.clone().unwrap();
        let grid = Grid::new("s")
            .with("V10", 150.0)
            .merged("V10:W10")
            .with("V11", 150.0)
            .merged("V12:W12");
        assert_eq!(resolve_inline(&grid, 10, &inline), CellRef::parse("V10"));
        assert_eq!(resolve_inline(&grid, 11, &inline), None);
        assert_eq!(resolve_inline(&grid, 12, &inline), None);
    }

    #[test]
    fn inline_price_ignores_rows_below_merge_top() {
        let d = builtin::turbosmetchik_1();
        let inline = d.item.inline_price.clone().unwrap();
        let grid = Grid::new("s").with("V3", 150.0).merged("V3:W4");
        assert_eq!(resolve_inline(&grid, 3, &inline), CellRef::parse("V3"));
        assert_eq!(resolve_inline(&grid, 4, &inline), None);
    }

    #[test]
    fn classify_rows_skips_blank_rows_and_title() {
        let d = builtin::grandsmeta();
        let grid = Grid::new("s")
            .with("A1", "Локальная смета")
            .with("A2", "Раздел 1")
            .merged("A2:K2")
            .with("B3", "   ")
            .with("A4", 1);
        let rows: Vec<(u32, &str)> =
            classify_rows(&grid, &d).iter().map(|c| (c.row, c.role.name())).collect();
        assert_eq!(rows, vec![(2, "section_header"), (4, "item")]);
    }
}
