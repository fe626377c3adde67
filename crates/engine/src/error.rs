use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialectError {
    /// TOML parse / deserialization error.
    #[error("dialect parse error: {0}")]
    ConfigParse(String),
    /// Structurally valid config with inconsistent values.
    #[error("dialect '{dialect}': {message}")]
    ConfigValidation { dialect: String, message: String },
    /// Dispatch key not present in the registry.
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),
    /// IO error while reading dialect files.
    #[error("IO error: {0}")]
    Io(String),
}
