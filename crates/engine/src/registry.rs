use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};

use crate::builtin;
use crate::dialect::DialectConfig;
use crate::error::DialectError;

/// Dialects keyed by their dispatch name.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: BTreeMap<String, DialectConfig>,
}

impl DialectRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The five dialects shipped with the engine.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for dialect in builtin::all() {
            registry.insert(dialect);
        }
        registry
    }

    /// Add a dialect, replacing any existing one with the same name.
    pub fn insert(&mut self, dialect: DialectConfig) -> Option<DialectConfig> {
        self.dialects.insert(dialect.name.clone(), dialect)
    }

    pub fn get(&self, name: &str) -> Result<&DialectConfig, DialectError> {
        self.dialects
            .get(name.trim())
            .ok_or_else(|| DialectError::UnknownDialect(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dialects.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DialectConfig> {
        self.dialects.values()
    }

    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }

    /// Distinct family names, sorted.
    pub fn families(&self) -> Vec<String> {
        let mut families: Vec<String> =
            self.dialects.values().map(|d| d.family_name().to_string()).collect();
        families.sort();
        families.dedup();
        families
    }

    /// Dialect names belonging to `family`, sorted.
    pub fn members(&self, family: &str) -> Vec<&str> {
        self.dialects
            .values()
            .filter(|d| d.family_name() == family)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Load every `*.toml` file in `dir`. Returns the number loaded. A
    /// custom dialect with a built-in's name replaces it.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, DialectError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| DialectError::Io(format!("{}: {e}", dir.display())))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in &paths {
            let text = std::fs::read_to_string(path)
                .map_err(|e| DialectError::Io(format!("{}: {e}", path.display())))?;
            let dialect = DialectConfig::from_toml(&text).map_err(|e| match e {
                DialectError::ConfigParse(msg) => {
                    DialectError::ConfigParse(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?;
            debug!("loaded dialect '{}' from {}", dialect.name, path.display());
            if self.insert(dialect).is_some() {
                info!("{} overrides an existing dialect", path.display());
            }
        }
        Ok(paths.len())
    }
}
