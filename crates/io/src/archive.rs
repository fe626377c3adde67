// Input collection: single workbooks and ZIP archives of workbooks, read
// fully into memory.

use std::io::{Cursor, Read};
use std::path::Path;

use log::{debug, warn};
use zip::ZipArchive;

use crate::error::ProcessError;

/// One workbook to process, with the name shown in reports and separators.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub fn is_workbook_name(name: &str) -> bool {
    has_extension(name, &["xlsx", "xlsm"])
}

pub fn is_archive_name(name: &str) -> bool {
    has_extension(name, &["zip"])
}

fn has_extension(name: &str, exts: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Largest archive member read into memory. Bigger members are skipped.
pub const MAX_MEMBER_BYTES: u64 = 256 * 1024 * 1024;

/// Workbook members of a ZIP archive, ordered by member path. Directories,
/// `__MACOSX/` entries, dot-files and non-workbook members are skipped.
pub fn expand_archive(bytes: &[u8]) -> Result<Vec<InputFile>, ProcessError> {
    expand_archive_with_limit(bytes, MAX_MEMBER_BYTES)
}

/// [`expand_archive`] with an explicit per-member size limit. The size a
/// member declares is only a hint; the limit applies to bytes actually read.
pub fn expand_archive_with_limit(bytes: &[u8], limit: u64) -> Result<Vec<InputFile>, ProcessError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ProcessError::Archive(e.to_string()))?;

    let mut members: Vec<(String, InputFile)> = Vec::new();
    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(f) => f,
            Err(e) => {
                warn!("archive member #{i} unreadable: {e}");
                continue;
            }
        };
        if file.is_dir() {
            continue;
        }
        let path = file.name().to_string();
        let base = path.rsplit('/').next().unwrap_or(&path).to_string();
        if path.starts_with("__MACOSX/") || base.starts_with('.') || !is_workbook_name(&base) {
            debug!("archive member '{path}' skipped");
            continue;
        }

        if file.size() > limit {
            warn!("archive member '{path}' skipped: declares {} bytes, limit is {limit}", file.size());
            continue;
        }
        let mut content = Vec::with_capacity(file.size().min(limit) as usize);
        if let Err(e) = file.by_ref().take(limit + 1).read_to_end(&mut content) {
            warn!("archive member '{path}' unreadable: {e}");
            continue;
        }
        if content.len() as u64 > limit {
            warn!("archive member '{path}' skipped: larger than {limit} bytes");
            continue;
        }
        members.push((path, InputFile { name: base, bytes: content }));
    }

    members.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(members.into_iter().map(|(_, f)| f).collect())
}

/// Load one command-line input: a workbook, or every workbook in an archive.
pub fn load_input(path: &Path) -> Result<Vec<InputFile>, ProcessError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if is_archive_name(&name) {
        let bytes = std::fs::read(path)
            .map_err(|e| ProcessError::Archive(format!("{}: {}", path.display(), e)))?;
        let members = expand_archive(&bytes)?;
        if members.is_empty() {
            return Err(ProcessError::Archive(format!("{name}: no .xlsx/.xlsm files inside")));
        }
        debug!("{name}: {} workbook(s) in archive", members.len());
        return Ok(members);
    }

    if !is_workbook_name(&name) {
        return Err(ProcessError::WorkbookUnreadable(format!(
            "{name}: unsupported file type (expected .xlsx, .xlsm or .zip)"
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| ProcessError::WorkbookUnreadable(format!("{}: {}", path.display(), e)))?;
    Ok(vec![InputFile { name, bytes }])
}
