//! Configuration management.
//!
//! This module provides:
//! - TOML-based configuration with logical sections and a `[[jobs]]` array
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Defaults for optional keys, one error listing every missing required key
//!
//! # Example
//!
//! ```no_run
//! use docgen_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("docgen.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.settings_mut().processing.cleanup_docx = false;
//! config.update_section(ConfigSection::Processing).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, EmailSettings, FieldBinding, FileSettings, JobEmailSettings, JobSettings,
    LoggingSettings, PathSettings, ProcessingSettings, RecordFilter, Settings,
};
