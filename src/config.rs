//! Configuration for FileCabinet
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CabinetError, Result};
use crate::validation::{ValidationPreset, ValidationRules, Validator};

/// Main configuration for a FileCabinet instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Which backend holds the records
    pub storage: StorageKind,

    /// Slot file used by the file backend
    pub data_file: PathBuf,

    // -------------------------------------------------------------------------
    // Validation Configuration
    // -------------------------------------------------------------------------
    /// Rule set applied to every write
    pub validation: ValidationPreset,

    /// Optional JSON file overriding the built-in presets
    pub rules_file: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------
    /// Log every store call with its arguments and outcome
    pub log_calls: bool,

    /// Log the elapsed time of every store call
    pub measure_time: bool,
}

/// Storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Memory,
    File,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::File => "file",
        }
    }

    /// Parse a backend name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(StorageKind::Memory),
            "file" => Some(StorageKind::File),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageKind::Memory,
            data_file: PathBuf::from("cabinet.db"),
            validation: ValidationPreset::Default,
            rules_file: None,
            log_calls: false,
            measure_time: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build the validator this config asks for
    ///
    /// Reads `rules_file` when set, otherwise uses the built-in preset.
    pub fn validator(&self) -> Result<Validator> {
        let rules = match &self.rules_file {
            Some(path) => ValidationRules::load(path, self.validation).map_err(|e| match e {
                CabinetError::Io(io) => CabinetError::Config(format!(
                    "Cannot read rules file {}: {}",
                    path.display(),
                    io
                )),
                other => other,
            })?,
            None => ValidationRules::preset(self.validation),
        };
        Ok(Validator::from_rules(&rules))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage backend
    pub fn storage(mut self, kind: StorageKind) -> Self {
        self.config.storage = kind;
        self
    }

    /// Set the slot file path (file backend only)
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_file = path.into();
        self
    }

    /// Set the validation preset
    pub fn validation(mut self, preset: ValidationPreset) -> Self {
        self.config.validation = preset;
        self
    }

    /// Load validation rules from a JSON file
    pub fn rules_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_file = Some(path.into());
        self
    }

    /// Enable call logging
    pub fn log_calls(mut self, enabled: bool) -> Self {
        self.config.log_calls = enabled;
        self
    }

    /// Enable call timing
    pub fn measure_time(mut self, enabled: bool) -> Self {
        self.config.measure_time = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
