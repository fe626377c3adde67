// Processor entry points: workbook in, extraction out.

use std::path::Path;

use log::{error, info};
use smeta_engine::{DialectConfig, DialectError, DialectRegistry, Extraction, Grid};

use crate::error::ProcessError;
use crate::xlsx::{load_first_sheet, load_first_sheet_path};

/// An extraction together with the sheet it was taken from, so coordinates
/// can be resolved to values later.
#[derive(Debug, Clone)]
pub struct Processed {
    pub name: String,
    pub grid: Grid,
    pub extraction: Extraction,
}

/// Look up a dialect by dispatch name.
pub fn resolve_dialect<'r>(
    registry: &'r DialectRegistry,
    name: &str,
) -> Result<&'r DialectConfig, ProcessError> {
    registry.get(name).map_err(|e| match e {
        DialectError::UnknownDialect(n) => ProcessError::UnknownDialect(n),
        other => ProcessError::UnknownDialect(other.to_string()),
    })
}

/// Extract from an in-memory workbook.
pub fn process_bytes(name: &str, bytes: &[u8], dialect: &DialectConfig) -> Result<Processed, ProcessError> {
    let grid = load_first_sheet(bytes)?;
    let extraction = smeta_engine::run(&grid, dialect);
    info!("{}: {} rows extracted ({})", name, extraction.rows.len(), dialect.name);
    Ok(Processed { name: name.to_string(), grid, extraction })
}

/// Extract from a workbook on disk.
pub fn process_path(path: &Path, dialect: &DialectConfig) -> Result<Extraction, ProcessError> {
    let grid = load_first_sheet_path(path)?;
    let extraction = smeta_engine::run(&grid, dialect);
    info!("{}: {} rows extracted ({})", path.display(), extraction.rows.len(), dialect.name);
    Ok(extraction)
}

/// Like [`process_path`] but never fails: every error is logged and
/// reported as `None`.
pub fn process(path: &Path, dialect: &DialectConfig) -> Option<Extraction> {
    match process_path(path, dialect) {
        Ok(extraction) => Some(extraction),
        Err(e) => {
            error!("{}: {}", path.display(), e);
            None
        }
    }
}
