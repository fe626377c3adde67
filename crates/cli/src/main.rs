// smeta CLI - extract cost-estimate rows from .xlsx workbooks

mod exit_codes;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;

use smeta_config::Settings;
use smeta_engine::{classify_rows, DialectConfig, DialectRegistry, RowRole};
use smeta_io::batch::ProgressSink;
use smeta_io::export::{export, reference_widths_path};
use smeta_io::naming::{output_file_name, safe_base_name, sheet_name};
use smeta_io::xlsx::load_first_sheet_path;
use smeta_io::{load_input, resolve_dialect, run_batch, InputFile, OutputFormat, XlsxOptions};

use exit_codes::{
    dialect_exit_code, export_exit_code, process_exit_code, EXIT_DIALECT_INVALID, EXIT_IO,
    EXIT_NO_INPUT, EXIT_NO_RESULTS, EXIT_PARTIAL, EXIT_SETTINGS, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "smeta")]
#[command(about = "Extract line items from construction cost-estimate workbooks")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/smeta/settings.json)
    #[arg(long, global = true, env = "SMETA_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract rows from workbooks (or .zip archives of workbooks) into one result file
    #[command(after_help = "\
Examples:
  smeta process smeta.xlsx --dialect ГрандСМЕТА
  smeta process objects.zip -d Турбосметчик-2 -o result.xlsx
  smeta process a.xlsx b.xlsx -d \"Смета ру\" --format csv -o result.csv
  smeta process objects.zip -d ГрандСМЕТА --json --strict")]
    Process {
        /// Input .xlsx/.xlsm workbooks or .zip archives
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Dialect name (default: dialects.default from settings)
        #[arg(long, short = 'd')]
        dialect: Option<String>,

        /// Output file or directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output format: xlsx, csv or json
        #[arg(long, short = 'f', default_value = "xlsx")]
        format: OutputFormat,

        /// Print a JSON report of per-file outcomes to stdout
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any input failed
        #[arg(long)]
        strict: bool,
    },

    /// Show how each row of a workbook is classified
    #[command(after_help = "\
Examples:
  smeta inspect smeta.xlsx -d Турбосметчик-1
  smeta inspect smeta.xlsx -d ГрандСМЕТА --all --json")]
    Inspect {
        /// Workbook to inspect (first sheet)
        file: PathBuf,

        /// Dialect name (default: dialects.default from settings)
        #[arg(long, short = 'd')]
        dialect: Option<String>,

        /// Include unclassified rows
        #[arg(long)]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available dialects
    Dialects {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Work with dialect definitions
    #[command(subcommand)]
    Dialect(DialectCommands),
}

#[derive(Subcommand)]
enum DialectCommands {
    /// Check TOML dialect definitions
    #[command(after_help = "\
Examples:
  smeta dialect show ГрандСМЕТА > my-dialect.toml
  smeta dialect validate my-dialect.toml")]
    Validate {
        /// Dialect files (*.toml)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a dialect as TOML
    Show {
        /// Dialect name
        name: String,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  smeta-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = load_settings(cli.config.as_deref()).and_then(|settings| {
        init_logging(cli.verbose, cli.quiet, &settings.log_level);
        match cli.command {
            Commands::Process { inputs, dialect, output, format, json, strict } => {
                cmd_process(&settings, inputs, dialect, output, format, json, strict, cli.quiet)
            }
            Commands::Inspect { file, dialect, all, json } => cmd_inspect(&settings, file, dialect, all, json),
            Commands::Dialects { json } => cmd_dialects(&settings, json),
            Commands::Dialect(DialectCommands::Validate { files }) => cmd_dialect_validate(files),
            Commands::Dialect(DialectCommands::Show { name }) => cmd_dialect_show(&settings, name),
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn io_err(e: io::Error) -> CliError {
    CliError::io(e.to_string())
}

// ============================================================================
// Setup
// ============================================================================

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Settings::load_from(path).map_err(|e| {
            CliError::new(EXIT_SETTINGS, e.to_string())
                .with_hint("settings are JSON; lines starting with // are comments")
        }),
        None => Ok(Settings::load()),
    }
}

/// -q and -v win over RUST_LOG, which wins over `log.level` from settings.
fn init_logging(verbose: u8, quiet: bool, settings_level: &str) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings_level));
    builder.target(env_logger::Target::Stderr);
    if quiet {
        builder.filter_level(LevelFilter::Error);
    } else if verbose > 0 {
        builder.filter_level(match verbose {
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
    }
    let _ = builder.try_init();
}

fn load_registry(settings: &Settings) -> Result<DialectRegistry, CliError> {
    let mut registry = DialectRegistry::builtin();
    if let Some(dir) = &settings.dialects_directory {
        let loaded = registry.load_dir(dir).map_err(|e| {
            CliError::new(dialect_exit_code(&e), e.to_string())
                .with_hint(format!("check the dialect files in {}", dir.display()))
        })?;
        log::info!("{} dialect(s) loaded from {}", loaded, dir.display());
    }
    Ok(registry)
}

fn pick_dialect<'r>(
    registry: &'r DialectRegistry,
    settings: &Settings,
    requested: Option<String>,
) -> Result<&'r DialectConfig, CliError> {
    let known = || registry.names().collect::<Vec<_>>().join(", ");
    let name = requested
        .or_else(|| settings.default_dialect.clone())
        .ok_or_else(|| {
            CliError::args("no dialect given")
                .with_hint(format!("pass --dialect or set dialects.default; available: {}", known()))
        })?;
    resolve_dialect(registry, &name).map_err(|e| {
        CliError::new(process_exit_code(&e), e.to_string()).with_hint(format!("available: {}", known()))
    })
}

// ============================================================================
// process
// ============================================================================

/// Prints one line per file to stderr.
struct StderrProgress {
    quiet: bool,
}

impl ProgressSink for StderrProgress {
    fn file_finished(&self, _index: usize, name: &str, ok: bool) {
        if !self.quiet {
            eprintln!("  {} {}", if ok { "ok  " } else { "FAIL" }, name);
        }
    }
}

#[derive(Serialize)]
struct ProcessReport<'a> {
    dialect: &'a str,
    output: String,
    format: String,
    rows: usize,
    files: Vec<smeta_io::batch::OutcomeSummary>,
}

#[allow(clippy::too_many_arguments)]
fn cmd_process(
    settings: &Settings,
    inputs: Vec<PathBuf>,
    dialect: Option<String>,
    output: Option<PathBuf>,
    format: OutputFormat,
    json: bool,
    strict: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let registry = load_registry(settings)?;
    let dialect = pick_dialect(&registry, settings, dialect)?;

    let source_name = inputs
        .first()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut files: Vec<InputFile> = Vec::new();
    let mut load_failures: Vec<(String, String)> = Vec::new();
    for path in &inputs {
        match load_input(path) {
            Ok(mut loaded) => files.append(&mut loaded),
            Err(e) => {
                log::warn!("{}: {}", path.display(), e);
                load_failures.push((path.display().to_string(), e.to_string()));
            }
        }
    }

    if files.is_empty() {
        let message = match load_failures.as_slice() {
            [(path, reason)] => format!("{path}: {reason}"),
            _ => "no .xlsx/.xlsm workbook found in the inputs".to_string(),
        };
        return Err(CliError::new(EXIT_NO_INPUT, message)
            .with_hint("inputs must be .xlsx/.xlsm workbooks or .zip archives of them"));
    }

    let report = run_batch(files, dialect, &StderrProgress { quiet });
    let processed: Vec<_> = report.succeeded().collect();
    if processed.is_empty() {
        return Err(CliError::new(EXIT_NO_RESULTS, "no input file could be processed")
            .with_hint("the workbooks may be damaged or not .xlsx; run with -v for details"));
    }

    let out_path = output_path(output, settings, &source_name, format);
    let widths = reference_for(settings, dialect);
    let options = XlsxOptions {
        sheet_name: sheet_name(&safe_base_name(&source_name)),
        widths,
    };

    let rows = export(&out_path, format, &dialect.name, &processed, &options).map_err(|e| {
        CliError::new(export_exit_code(&e), format!("{}: {}", out_path.display(), e))
    })?;

    let failed = report.failure_count() + load_failures.len();

    if json {
        let mut files = report.summaries();
        for (file, error) in &load_failures {
            files.push(smeta_io::batch::OutcomeSummary {
                file: file.clone(),
                ok: false,
                rows: 0,
                error: Some(error.clone()),
            });
        }
        let doc = ProcessReport {
            dialect: &dialect.name,
            output: out_path.display().to_string(),
            format: format.to_string(),
            rows,
            files,
        };
        let text = serde_json::to_string_pretty(&doc).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
    } else if !quiet {
        println!("{}", report.summary());
        println!("wrote {} row(s) to {}", rows, out_path.display());
    }

    if failed > 0 {
        for (name, e) in report.failures() {
            eprintln!("failed: {}: {}", name, e);
        }
        for (path, reason) in &load_failures {
            eprintln!("failed: {}: {}", path, reason);
        }
        if strict {
            return Err(CliError::new(EXIT_PARTIAL, format!("{} input(s) failed", failed)));
        }
    }
    Ok(())
}

/// `-o` as given (a directory gets the generated name), else the settings
/// output directory, else the current directory.
fn output_path(output: Option<PathBuf>, settings: &Settings, source_name: &str, format: OutputFormat) -> PathBuf {
    let file_name = PathBuf::from(output_file_name(source_name)).with_extension(format.extension());
    match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => settings
            .output_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(file_name),
    }
}

/// Widths from the family's reference workbook, if configured and readable.
fn reference_for(settings: &Settings, dialect: &DialectConfig) -> Option<[f64; 6]> {
    let path = settings.reference.for_family(dialect.family_name())?;
    match reference_widths_path(path) {
        Ok(widths) => Some(widths),
        Err(e) => {
            log::warn!("{}: {}; fitting widths to content", path.display(), e);
            None
        }
    }
}

// ============================================================================
// inspect
// ============================================================================

fn describe(role: &RowRole) -> String {
    let total = |t: &Option<smeta_engine::CellRef>| t.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "-".into());
    match role {
        RowRole::SectionHeader { anchor, title } | RowRole::SubsectionHeader { anchor, title } => {
            format!("{} {}", anchor, title)
        }
        RowRole::SectionFooter { total: t } | RowRole::SubsectionFooter { total: t } | RowRole::ItemPrice { total: t } => {
            format!("total {}", total(t))
        }
        RowRole::Item | RowRole::Unclassified => String::new(),
    }
}

fn cmd_inspect(
    settings: &Settings,
    file: PathBuf,
    dialect: Option<String>,
    all: bool,
    json: bool,
) -> Result<(), CliError> {
    let registry = load_registry(settings)?;
    let dialect = pick_dialect(&registry, settings, dialect)?;

    let grid = load_first_sheet_path(&file)
        .map_err(|e| CliError::new(process_exit_code(&e), format!("{}: {}", file.display(), e)))?;

    let rows: Vec<_> = classify_rows(&grid, dialect)
        .into_iter()
        .filter(|r| all || r.role != RowRole::Unclassified)
        .collect();

    if json {
        let doc = serde_json::json!({
            "file": file.display().to_string(),
            "sheet": grid.name,
            "dialect": dialect.name,
            "rows": rows,
        });
        let text = serde_json::to_string_pretty(&doc).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    writeln!(out, "{} [{}] {}", file.display(), grid.name, dialect.name).map_err(io_err)?;
    writeln!(out, "{:>6}  {:<18} {}", "ROW", "ROLE", "DETAIL").map_err(io_err)?;
    for row in &rows {
        writeln!(out, "{:>6}  {:<18} {}", row.row, row.role.name(), describe(&row.role)).map_err(io_err)?;
    }
    Ok(())
}

// ============================================================================
// dialects
// ============================================================================

#[derive(Serialize)]
struct DialectEntry<'a> {
    name: &'a str,
    family: &'a str,
}

fn cmd_dialects(settings: &Settings, json: bool) -> Result<(), CliError> {
    let registry = load_registry(settings)?;
    let entries: Vec<DialectEntry> = registry
        .iter()
        .map(|d| DialectEntry { name: &d.name, family: d.family_name() })
        .collect();

    if json {
        let text = serde_json::to_string_pretty(&entries).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    let default = settings.default_dialect.as_deref();
    let marker = |name: &str| if Some(name) == default { " (default)" } else { "" };
    for family in registry.families() {
        let members = registry.members(&family);
        if members == [family.as_str()] {
            println!("{}{}", family, marker(&family));
            continue;
        }
        println!("{}:", family);
        for name in members {
            println!("  {}{}", name, marker(name));
        }
    }
    Ok(())
}

fn cmd_dialect_validate(files: Vec<PathBuf>) -> Result<(), CliError> {
    let mut invalid = 0;
    for path in &files {
        let result = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| DialectConfig::from_toml(&text).map_err(|e| e.to_string()));
        match result {
            Ok(dialect) => println!("ok: {} ({})", path.display(), dialect.name),
            Err(e) => {
                invalid += 1;
                eprintln!("invalid: {}: {}", path.display(), e);
            }
        }
    }
    if invalid > 0 {
        return Err(CliError::new(EXIT_DIALECT_INVALID, format!("{} of {} dialect file(s) invalid", invalid, files.len()))
            .with_hint("start from `smeta dialect show <name>` for a known-good layout"));
    }
    Ok(())
}

fn cmd_dialect_show(settings: &Settings, name: String) -> Result<(), CliError> {
    let registry = load_registry(settings)?;
    let dialect = pick_dialect(&registry, settings, Some(name))?;
    let text = dialect
        .to_toml()
        .map_err(|e| CliError::new(dialect_exit_code(&e), e.to_string()))?;
    print!("{}", text);
    Ok(())
}
