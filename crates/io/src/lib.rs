// Workbook I/O for smeta: loading, batch processing, result export

pub mod archive;
pub mod batch;
pub mod error;
pub mod export;
pub mod naming;
pub mod processor;
pub mod xlsx;
pub mod xlsx_layout;

pub use archive::{expand_archive, expand_archive_with_limit, load_input, InputFile, MAX_MEMBER_BYTES};
pub use batch::{run_batch, BatchReport, NoProgress, ProgressCounter, ProgressSink};
pub use error::{ExportError, ProcessError};
pub use export::{OutputFormat, XlsxOptions};
pub use processor::{process, process_bytes, process_path, resolve_dialect, Processed};
