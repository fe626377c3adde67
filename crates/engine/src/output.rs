use serde::Serialize;

use crate::accumulate::Record;
use crate::cell::is_numeric_zero;
use crate::coord::CellRef;
use crate::dialect::{DialectConfig, Level};
use crate::grid::Grid;

/// Column titles of every extraction, in slot order.
pub const OUTPUT_HEADERS: [&str; 6] = [
    "№№ п/п",
    "Шифр расценки и коды ресурсов",
    "Наименование работ и затрат",
    "Единица измерения",
    "Кол-во единиц",
    "ВСЕГО затрат, руб.",
];

/// Content of one output slot: a source coordinate, or a header's title.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Slot {
    Coord(CellRef),
    Text(String),
}

impl Slot {
    pub fn coord(&self) -> Option<CellRef> {
        match self {
            Slot::Coord(c) => Some(*c),
            Slot::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    SectionHeader,
    SubsectionHeader,
    Item,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub source_row: u32,
    pub kind: RowKind,
    pub slots: [Option<Slot>; 6],
}

impl NormalizedRow {
    /// Headers become `(anchor, -, title, -, -, total)`; items carry their
    /// five source coordinates and total.
    pub fn from_record(record: Record) -> Self {
        match record {
            Record::Header(h) => Self {
                source_row: h.row,
                kind: match h.level {
                    Level::Section => RowKind::SectionHeader,
                    Level::Subsection => RowKind::SubsectionHeader,
                },
                slots: [
                    Some(Slot::Coord(h.anchor)),
                    None,
                    Some(Slot::Text(h.title)),
                    None,
                    None,
                    h.total.map(Slot::Coord),
                ],
            },
            Record::Item(i) => {
                let [a, b, c, d, e] = i.sources.map(|s| s.map(Slot::Coord));
                Self {
                    source_row: i.row,
                    kind: RowKind::Item,
                    slots: [a, b, c, d, e, i.total.map(Slot::Coord)],
                }
            }
        }
    }

    pub fn total(&self) -> Option<CellRef> {
        self.slots[5].as_ref().and_then(Slot::coord)
    }

    pub fn is_header(&self) -> bool {
        self.kind != RowKind::Item
    }
}

/// Drop rows whose total reads as numeric zero, when the dialect asks for
/// it. Returns how many rows were removed.
pub fn apply_filters(rows: &mut Vec<NormalizedRow>, grid: &Grid, dialect: &DialectConfig) -> usize {
    if !dialect.filters.drop_zero_totals {
        return 0;
    }
    let before = rows.len();
    rows.retain(|row| row.total().map_or(true, |c| !is_numeric_zero(grid.value_at(c))));
    before - rows.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulate::{ItemRecord, PendingHeader};
    use crate::builtin;

    #[test]
    fn header_slots() {
        let row = NormalizedRow::from_record(Record::Header(PendingHeader {
            level: Level::Section,
            row: 4,
            anchor: CellRef::new(4, 0),
            title: "Раздел 1".into(),
            total: CellRef::parse("V20"),
        }));
        assert_eq!(row.kind, RowKind::SectionHeader);
        assert_eq!(row.slots[0], Some(Slot::Coord(CellRef::new(4, 0))));
        assert_eq!(row.slots[1], None);
        assert_eq!(row.slots[2], Some(Slot::Text("Раздел 1".into())));
        assert_eq!(row.total(), CellRef::parse("V20"));
    }

    #[test]
    fn serializes_slots_as_strings() {
        let row = NormalizedRow::from_record(Record::Item(ItemRecord {
            row: 7,
            sources: [CellRef::parse("A7"), CellRef::parse("B7"), None, None, None],
            total: None,
        }));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["kind"], "item");
        assert_eq!(json["slots"][0], "A7");
        assert!(json["slots"][2].is_null());
        assert!(json["slots"][5].is_null());
    }

    #[test]
    fn zero_totals_dropped_only_when_enabled() {
        let grid = Grid::new("s").with("I5", 0.0).with("I6", "12,5");
        let make = |row: u32| {
            NormalizedRow::from_record(Record::Item(ItemRecord {
                row,
                sources: [None; 5],
                total: Some(CellRef::new(row, 8)),
            }))
        };
        let unresolved = NormalizedRow::from_record(Record::Item(ItemRecord {
            row: 7,
            sources: [None; 5],
            total: None,
        }));

        let mut rows = vec![make(5), make(6), unresolved.clone()];
        assert_eq!(apply_filters(&mut rows, &grid, &builtin::grandsmeta()), 0);
        assert_eq!(rows.len(), 3);

        assert_eq!(apply_filters(&mut rows, &grid, &builtin::smeta_ru()), 1);
        assert_eq!(rows, vec![make(6), unresolved]);
    }
}
