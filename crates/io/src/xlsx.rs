// Load the first worksheet of an xlsx/xlsm workbook into an engine Grid.
//
// Values come from calamine (cached results only, formulas are never
// evaluated). Formula flags come from calamine's formula range; merges are
// read from the sheet XML since calamine does not report them.

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use calamine::{Data, Reader, Xlsx};
use log::{debug, warn};
use smeta_engine::{CellValue, Grid};
use zip::ZipArchive;

use crate::error::ProcessError;
use crate::xlsx_layout::{read_first_sheet_layout, SheetLayout};

/// Read a workbook from disk and load its first sheet.
pub fn load_first_sheet_path(path: &Path) -> Result<Grid, ProcessError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ProcessError::WorkbookUnreadable(format!("{}: {}", path.display(), e)))?;
    load_first_sheet(&bytes)
}

/// Load the first sheet of an in-memory workbook.
pub fn load_first_sheet(bytes: &[u8]) -> Result<Grid, ProcessError> {
    let start_time = Instant::now();

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ProcessError::WorkbookUnreadable(e.to_string()))?;

    let sheet_name = match workbook.sheet_names().first() {
        Some(name) => name.clone(),
        None => return Err(ProcessError::EmptyWorkbook),
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ProcessError::WorkbookUnreadable(format!("sheet '{}': {}", sheet_name, e)))?;

    let mut grid = Grid::new(&sheet_name);

    // Range start offset (data may not begin at A1)
    if let Some((start_row, start_col)) = range.start() {
        for (row_idx, row) in range.rows().enumerate() {
            let target_row = start_row + row_idx as u32 + 1;
            for (col_idx, cell) in row.iter().enumerate() {
                let target_col = start_col + col_idx as u32;
                if let Some(value) = cell_value(cell) {
                    grid.set_value(target_row, target_col, value);
                }
            }
        }
        let (height, width) = range.get_size();
        grid.extend_to(start_row + height as u32, start_col + width as u32);
    }

    match workbook.worksheet_formula(&sheet_name) {
        Ok(formulas) => {
            if let Some((start_row, start_col)) = formulas.start() {
                for (row_idx, row) in formulas.rows().enumerate() {
                    for (col_idx, formula) in row.iter().enumerate() {
                        if !formula.is_empty() {
                            grid.mark_formula(start_row + row_idx as u32 + 1, start_col + col_idx as u32);
                        }
                    }
                }
            }
        }
        Err(e) => warn!("sheet '{}': formulas unavailable: {}", sheet_name, e),
    }

    let layout = read_layout(bytes)?;
    // Columns that only hold formatting still count toward the used width
    if let Some(end) = layout.dimension_end {
        grid.extend_to(0, end.col + 1);
    }
    for merge in layout.merges {
        grid.add_merge(merge);
    }

    debug!(
        "loaded sheet '{}' ({} rows x {} cols, {} merges) in {:?}",
        sheet_name,
        grid.height(),
        grid.width(),
        grid.merges().len(),
        start_time.elapsed()
    );
    Ok(grid)
}

/// Merges and column widths of the first sheet.
pub fn read_layout(bytes: &[u8]) -> Result<SheetLayout, ProcessError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ProcessError::WorkbookUnreadable(e.to_string()))?;
    read_first_sheet_layout(&mut archive).map_err(ProcessError::WorkbookUnreadable)
}

/// Convert a calamine cell. Empty cells are skipped; dates become their
/// serial number.
fn cell_value(cell: &Data) -> Option<CellValue> {
    Some(match cell {
        Data::Empty => return None,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(cell_value(&Data::Empty), None);
        assert_eq!(cell_value(&Data::Int(3)), Some(CellValue::Number(3.0)));
        assert_eq!(cell_value(&Data::Float(2.5)), Some(CellValue::Number(2.5)));
        assert_eq!(cell_value(&Data::String("Раздел 1".into())), Some(CellValue::from("Раздел 1")));
        assert_eq!(cell_value(&Data::Bool(true)), Some(CellValue::Bool(true)));
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        let err = load_first_sheet(b"this is not a zip file").unwrap_err();
        assert!(matches!(err, ProcessError::WorkbookUnreadable(_)), "got {err}");
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = load_first_sheet_path(Path::new("/nonexistent/smeta.xlsx")).unwrap_err();
        assert!(matches!(err, ProcessError::WorkbookUnreadable(_)));
    }
}
