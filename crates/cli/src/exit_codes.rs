//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                              |
//! |---------|------------|------------------------------------------|
//! | 0       | Universal  | Success                                  |
//! | 1       | Universal  | General error (unspecified)              |
//! | 2       | Universal  | CLI usage error (bad args, missing file) |
//! | 3-9     | Universal  | Output and settings errors               |
//! | 10-19   | process    | Extraction outcomes                      |
//! | 20-29   | dialect    | Dialect lookup and definitions           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use smeta_engine::DialectError;
use smeta_io::{ExportError, ProcessError};

// =============================================================================
// Universal (0-9)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Result could not be written (permissions, missing directory).
pub const EXIT_IO: u8 = 3;

/// Settings file given with --config is missing or malformed.
pub const EXIT_SETTINGS: u8 = 4;

// =============================================================================
// Process (10-19)
// =============================================================================

/// No input workbook could be read or processed.
pub const EXIT_NO_RESULTS: u8 = 10;

/// Some inputs failed and --strict was given.
pub const EXIT_PARTIAL: u8 = 11;

/// Inputs contained no .xlsx/.xlsm workbook at all.
pub const EXIT_NO_INPUT: u8 = 12;

/// A single workbook (inspect) could not be read.
pub const EXIT_UNREADABLE: u8 = 13;

// =============================================================================
// Dialect (20-29)
// =============================================================================

/// Dialect name not in the registry.
pub const EXIT_UNKNOWN_DIALECT: u8 = 20;

/// Dialect definition failed to parse or validate.
pub const EXIT_DIALECT_INVALID: u8 = 21;

/// Dialect directory from settings could not be read.
pub const EXIT_DIALECT_DIR: u8 = 22;

// =============================================================================
// Error Type Mapping
// =============================================================================

/// Map a DialectError to its exit code.
pub fn dialect_exit_code(err: &DialectError) -> u8 {
    match err {
        DialectError::UnknownDialect(_) => EXIT_UNKNOWN_DIALECT,
        DialectError::ConfigParse(_) | DialectError::ConfigValidation { .. } => EXIT_DIALECT_INVALID,
        DialectError::Io(_) => EXIT_DIALECT_DIR,
    }
}

/// Map a ProcessError to its exit code.
pub fn process_exit_code(err: &ProcessError) -> u8 {
    match err {
        ProcessError::UnknownDialect(_) => EXIT_UNKNOWN_DIALECT,
        ProcessError::WorkbookUnreadable(_) | ProcessError::EmptyWorkbook => EXIT_UNREADABLE,
        ProcessError::Archive(_) => EXIT_NO_INPUT,
    }
}

/// Map an ExportError to its exit code.
pub fn export_exit_code(err: &ExportError) -> u8 {
    match err {
        ExportError::NothingToExport => EXIT_NO_RESULTS,
        ExportError::Reference(_) => EXIT_ERROR,
        ExportError::Xlsx(_) | ExportError::Csv(_) | ExportError::Json(_) | ExportError::Io(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_within_ranges() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_SETTINGS,
            EXIT_NO_RESULTS,
            EXIT_PARTIAL,
            EXIT_NO_INPUT,
            EXIT_UNREADABLE,
            EXIT_UNKNOWN_DIALECT,
            EXIT_DIALECT_INVALID,
            EXIT_DIALECT_DIR,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(dialect_exit_code(&DialectError::UnknownDialect("x".into())), EXIT_UNKNOWN_DIALECT);
        assert_eq!(dialect_exit_code(&DialectError::ConfigParse("x".into())), EXIT_DIALECT_INVALID);
        assert_eq!(process_exit_code(&ProcessError::EmptyWorkbook), EXIT_UNREADABLE);
        assert_eq!(export_exit_code(&ExportError::NothingToExport), EXIT_NO_RESULTS);
    }
}
