// Configuration loading

pub mod settings;

pub use settings::{ReferenceWorkbooks, Settings, SettingsError};
