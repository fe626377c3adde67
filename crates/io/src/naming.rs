// Safe names for output files and sheets derived from user-supplied file names.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Excel's sheet-name length limit.
pub const MAX_SHEET_NAME: usize = 31;

const MAX_FILE_NAME: usize = 200;

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}")))
}

/// Base name (no extension) reduced to letters, digits, `_`, space, `-`
/// and `.`, with runs of whitespace collapsed and `..` removed. Falls back
/// to a generated `file_xxxxxxxx` name when nothing survives.
pub fn safe_base_name(file_name: &str) -> String {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static RESERVED: OnceLock<Regex> = OnceLock::new();

    let base = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned = re(&DISALLOWED, r"[^\w\s.-]+").replace_all(&base, "_");
    let cleaned = re(&SPACES, r"\s+").replace_all(&cleaned, " ");
    let cleaned = re(&RESERVED, r#"[\\/:*?"<>|]+"#).replace_all(cleaned.trim(), "_");
    let cleaned = cleaned.replace("..", "_");

    if cleaned.is_empty() {
        generated_name("file")
    } else {
        cleaned
    }
}

/// Sheet title for a safe base name: at most 31 characters.
pub fn sheet_name(safe_base: &str) -> String {
    safe_base.chars().take(MAX_SHEET_NAME).collect()
}

/// `<safe base>_processed.xlsx`, or a generated name when that would be
/// unreasonably long.
pub fn output_file_name(source_name: &str) -> String {
    let name = format!("{}_processed.xlsx", safe_base_name(source_name));
    if name.len() > MAX_FILE_NAME {
        format!("{}.xlsx", generated_name("result"))
    } else {
        name
    }
}

fn generated_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_cyrillic_and_punctuation_subset() {
        assert_eq!(safe_base_name("Смета №5 (итог).xlsx"), "Смета _5 _итог_");
        assert_eq!(safe_base_name("object-1.v2.xlsm"), "object-1.v2");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(safe_base_name("  a   b\t c .xlsx"), "a b c");
    }

    #[test]
    fn test_removes_parent_references() {
        let name = safe_base_name("..evil...xlsx");
        assert!(!name.contains(".."), "got {name}");
    }

    #[test]
    fn test_generated_fallback() {
        let name = safe_base_name("$$$.xlsx");
        assert_eq!(name, "_");
        let blank = safe_base_name("   .xlsx");
        assert!(blank.starts_with("file_") && blank.len() == 13, "got {blank}");
        assert_ne!(safe_base_name(""), safe_base_name(""));
    }

    #[test]
    fn test_sheet_name_truncates_by_chars() {
        let long = "Локальный сметный расчет на капитальный ремонт";
        let sheet = sheet_name(long);
        assert_eq!(sheet.chars().count(), MAX_SHEET_NAME);
        assert!(long.starts_with(&sheet));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("Объект 1.xlsx"), "Объект 1_processed.xlsx");
        let long = format!("{}.xlsx", "я".repeat(150));
        let name = output_file_name(&long);
        assert!(name.starts_with("result_") && name.ends_with(".xlsx"), "got {name}");
    }
}
