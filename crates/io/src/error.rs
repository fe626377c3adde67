use thiserror::Error;

/// Failure to turn one input file into an extraction.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Missing, corrupt, encrypted or non-xlsx input.
    #[error("cannot read workbook: {0}")]
    WorkbookUnreadable(String),
    #[error("workbook has no sheets")]
    EmptyWorkbook,
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),
    #[error("archive error: {0}")]
    Archive(String),
}

impl ProcessError {
    /// Short stable tag for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkbookUnreadable(_) => "workbook_unreadable",
            Self::EmptyWorkbook => "empty_workbook",
            Self::UnknownDialect(_) => "unknown_dialect",
            Self::Archive(_) => "archive",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no file produced any data")]
    NothingToExport,
    #[error("cannot read reference workbook: {0}")]
    Reference(String),
    #[error("xlsx write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("json write failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
