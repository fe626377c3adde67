//! Result assembly: coordinates resolved to values and written as one xlsx
//! sheet, CSV or JSON.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};
use rust_xlsxwriter::{Format, FormatAlign, Workbook as XlsxWorkbook};
use serde::Serialize;
use serde_json::json;
use smeta_engine::{CellValue, Slot, OUTPUT_HEADERS};

use crate::error::ExportError;
use crate::processor::Processed;
use crate::xlsx::read_layout;

/// Excel's default column width in characters.
pub const DEFAULT_WIDTH: f64 = 8.43;
pub const MAX_AUTO_WIDTH: f64 = 60.0;

const COLUMNS: usize = OUTPUT_HEADERS.len();

// ============================================================================
// Formats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected xlsx, csv or json)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// A resolved output cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutValue {
    Blank,
    Number(f64),
    Text(String),
}

impl OutValue {
    fn from_cell(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => Self::Blank,
            CellValue::Number(n) => Self::Number(*n),
            CellValue::Text(s) if s.is_empty() => Self::Blank,
            other => Self::Text(other.raw_display().into_owned()),
        }
    }

    /// Text as it appears in a cell.
    pub fn display(&self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Number(n) => CellValue::Number(*n).raw_display().into_owned(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// One source file's rows with every coordinate replaced by its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFile {
    pub name: String,
    pub rows: Vec<[OutValue; COLUMNS]>,
}

pub fn resolve(processed: &Processed) -> ResolvedFile {
    let grid = &processed.grid;
    let rows = processed
        .extraction
        .rows
        .iter()
        .map(|row| {
            row.slots.clone().map(|slot| match slot {
                Some(Slot::Coord(c)) => OutValue::from_cell(grid.value_at(c)),
                Some(Slot::Text(t)) => OutValue::Text(t),
                None => OutValue::Blank,
            })
        })
        .collect();
    ResolvedFile { name: processed.name.clone(), rows }
}

// ============================================================================
// Column widths
// ============================================================================

/// Widths of columns A–F of a reference workbook's first sheet; columns
/// without an explicit width get the Excel default.
pub fn reference_widths(bytes: &[u8]) -> Result<[f64; COLUMNS], ExportError> {
    let layout = read_layout(bytes).map_err(|e| ExportError::Reference(e.to_string()))?;
    Ok(std::array::from_fn(|col| {
        layout.col_widths.get(&(col as u32)).copied().unwrap_or(DEFAULT_WIDTH)
    }))
}

pub fn reference_widths_path(path: &Path) -> Result<[f64; COLUMNS], ExportError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExportError::Reference(format!("{}: {}", path.display(), e)))?;
    reference_widths(&bytes)
}

/// Fit each column to its longest text: `len * 1.2 + 1`, clamped to
/// [8.43, 60]. Header text counts 1.1 times its length; separator rows
/// count toward column A.
pub fn auto_fit_widths(files: &[ResolvedFile]) -> [f64; COLUMNS] {
    let mut longest: [f64; COLUMNS] =
        std::array::from_fn(|col| OUTPUT_HEADERS[col].chars().count() as f64 * 1.1);

    if files.len() > 1 {
        for file in files {
            longest[0] = longest[0].max(file.name.chars().count() as f64);
        }
    }
    for file in files {
        for row in &file.rows {
            for (col, value) in row.iter().enumerate() {
                longest[col] = longest[col].max(value.display().chars().count() as f64);
            }
        }
    }

    longest.map(|len| (len * 1.2 + 1.0).max(DEFAULT_WIDTH).min(MAX_AUTO_WIDTH))
}

// ============================================================================
// Writers
// ============================================================================

#[derive(Debug, Clone)]
pub struct XlsxOptions {
    pub sheet_name: String,
    /// Fixed widths for A–F; auto-fit when `None`.
    pub widths: Option<[f64; COLUMNS]>,
}

/// Write the header row, then each file's rows. With more than one file,
/// every file is introduced by a bold separator row merged across A:F.
pub fn write_xlsx(path: &Path, files: &[ResolvedFile], options: &XlsxOptions) -> Result<(), ExportError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet().set_name(&options.sheet_name)?;

    let cell_format = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    let separator_format = cell_format.clone().set_bold();

    for (col, header) in OUTPUT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &cell_format)?;
    }

    let mut row: u32 = 1;
    for file in files {
        if files.len() > 1 {
            worksheet.merge_range(row, 0, row, (COLUMNS - 1) as u16, &file.name, &separator_format)?;
            row += 1;
        }
        for values in &file.rows {
            for (col, value) in values.iter().enumerate() {
                let col = col as u16;
                match value {
                    OutValue::Blank => worksheet.write_blank(row, col, &cell_format)?,
                    OutValue::Number(n) => worksheet.write_number_with_format(row, col, *n, &cell_format)?,
                    OutValue::Text(s) => worksheet.write_string_with_format(row, col, s, &cell_format)?,
                };
            }
            row += 1;
        }
    }

    let widths = options.widths.unwrap_or_else(|| auto_fit_widths(files));
    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    workbook.save(path)?;
    debug!("wrote {} rows to {}", row, path.display());
    Ok(())
}

/// CSV mirror of the xlsx layout: header, optional separator lines carrying
/// the file name in the first column, then values.
pub fn write_csv<W: Write>(writer: W, files: &[ResolvedFile]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(OUTPUT_HEADERS)?;
    for file in files {
        if files.len() > 1 {
            let mut separator = vec![file.name.clone()];
            separator.resize(COLUMNS, String::new());
            csv.write_record(&separator)?;
        }
        for values in &file.rows {
            csv.write_record(values.iter().map(OutValue::display))?;
        }
    }
    csv.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(writer: W, dialect: &str, files: &[ResolvedFile]) -> Result<(), ExportError> {
    let doc = json!({
        "dialect": dialect,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "headers": OUTPUT_HEADERS,
        "files": files,
    });
    serde_json::to_writer_pretty(writer, &doc)?;
    Ok(())
}

/// Resolve every successful extraction and write them in `format`.
pub fn export(
    path: &Path,
    format: OutputFormat,
    dialect: &str,
    processed: &[&Processed],
    options: &XlsxOptions,
) -> Result<usize, ExportError> {
    if processed.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let files: Vec<ResolvedFile> = processed.iter().map(|p| resolve(p)).collect();
    let rows: usize = files.iter().map(|f| f.rows.len()).sum();
    if rows == 0 {
        warn!("no rows extracted; writing headers only");
    }

    match format {
        OutputFormat::Xlsx => write_xlsx(path, &files, options)?,
        OutputFormat::Csv => write_csv(std::fs::File::create(path)?, &files)?,
        OutputFormat::Json => write_json(std::fs::File::create(path)?, dialect, &files)?,
    }
    Ok(rows)
}
