//! Reading and writing `docgen.toml`.
//!
//! Writes go through a temp file and a rename. `update_section` rewrites a
//! single table with `toml_edit`, so hand-written comments and the
//! `[[jobs]]` list survive `docgen configure`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Config file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Missing required config keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level keys the settings understand.
const VALID_SECTIONS: &[&str] = &["paths", "files", "logging", "processing", "email", "jobs"];

/// Owns the config path and the settings parsed from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Nothing is read until `load` or `load_or_create`.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Directory relative paths in the config are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Parse the config file. Unknown top-level tables are logged and ignored.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let (settings, unknown) = self.parse_and_check(&content)?;
        for key in unknown {
            tracing::warn!(key = %key, "Ignoring unknown config section");
        }
        self.settings = settings;
        Ok(())
    }

    /// Load the file, or write [`Settings::sample`] when there is none.
    ///
    /// Returns `true` when the starter file was written.
    pub fn load_or_create(&mut self) -> ConfigResult<bool> {
        if self.config_path.exists() {
            self.load()?;
            Ok(false)
        } else {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            self.settings = Settings::sample();
            self.save()?;
            Ok(true)
        }
    }

    /// Every missing required key, reported together.
    pub fn validate(&self) -> ConfigResult<()> {
        let missing = self.settings.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingKeys(missing))
        }
    }

    fn parse_and_check(&self, content: &str) -> ConfigResult<(Settings, Vec<String>)> {
        let doc: DocumentMut = content.parse()?;
        let settings: Settings = toml::from_str(content)?;

        let unknown = doc
            .iter()
            .map(|(key, _)| key)
            .filter(|key| !VALID_SECTIONS.contains(key))
            .map(str::to_string)
            .collect();

        Ok((settings, unknown))
    }

    /// Rewrite the whole file, annotated with section comments.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Replace one table in the file on disk with the in-memory values.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_toml = match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Files => toml::to_string_pretty(&self.settings.files)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
            ConfigSection::Processing => toml::to_string_pretty(&self.settings.processing)?,
            ConfigSection::Email => toml::to_string_pretty(&self.settings.email)?,
        };

        let section_doc: DocumentMut = section_toml.parse()?;
        let section_table = section_doc.as_table().clone();

        doc[section.table_name()] = Item::Table(section_table);

        self.atomic_write(&doc.to_string())?;

        Ok(())
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# docgen configuration\n");
        output.push_str("# Relative paths are resolved against this file's directory.\n\n");

        push_section(
            &mut output,
            "# Output and log directories",
            "paths",
            &toml::to_string_pretty(&self.settings.paths)?,
        );
        push_section(
            &mut output,
            "# Tabular data source (.csv, .xlsx, .xls, .ods)",
            "files",
            &toml::to_string_pretty(&self.settings.files)?,
        );
        push_section(
            &mut output,
            "# Logging configuration",
            "logging",
            &toml::to_string_pretty(&self.settings.logging)?,
        );
        push_section(
            &mut output,
            "# Batch processing: cleanup, delay in seconds, converter program",
            "processing",
            &toml::to_string_pretty(&self.settings.processing)?,
        );
        push_section(
            &mut output,
            "# SMTP account, required when a job sends mail",
            "email",
            &toml::to_string_pretty(&self.settings.email)?,
        );

        if !self.settings.jobs.is_empty() {
            #[derive(serde::Serialize)]
            struct Jobs<'a> {
                jobs: &'a [super::settings::JobSettings],
            }

            output.push_str("# Generation jobs, processed in order for every record\n");
            output.push_str(&toml::to_string_pretty(&Jobs {
                jobs: &self.settings.jobs,
            })?);
        }

        Ok(output)
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn push_section(output: &mut String, comment: &str, table: &str, body: &str) {
    output.push_str(comment);
    output.push('\n');
    output.push('[');
    output.push_str(table);
    output.push_str("]\n");
    for line in body.lines() {
        output.push_str(line);
        output.push('\n');
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_writes_sample() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("conf").join("docgen.toml");

        let mut manager = ConfigManager::new(&config_path);
        assert!(manager.load_or_create().unwrap());

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[[jobs]]"));

        let mut reloaded = ConfigManager::new(&config_path);
        assert!(!reloaded.load_or_create().unwrap());
        assert_eq!(reloaded.settings().jobs.len(), 1);
        assert!(reloaded.validate().is_ok());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("nope.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn validate_reports_all_missing_keys() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docgen.toml");
        fs::write(&config_path, "[paths]\noutput_folder = \"out\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();
        match manager.validate() {
            Err(ConfigError::MissingKeys(keys)) => {
                assert!(keys.contains(&"files.data_file".to_string()));
                assert_eq!(keys.len(), 2);
            }
            other => panic!("expected missing keys, got {:?}", other.err()),
        }
    }

    #[test]
    fn load_accepts_job_without_required_keys_and_validate_lists_them() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docgen.toml");
        fs::write(
            &config_path,
            "[files]\ndata_file = \"data.csv\"\n\n[[jobs]]\nname = \"letters\"\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();
        match manager.validate() {
            Err(ConfigError::MissingKeys(keys)) => assert_eq!(
                keys,
                vec!["jobs.letters.template", "jobs.letters.name_column"]
            ),
            other => panic!("expected missing keys, got {:?}", other.err()),
        }
    }

    #[test]
    fn update_section_keeps_jobs_and_comments() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docgen.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        manager.settings_mut().processing.cleanup_docx = false;
        manager.settings_mut().processing.delay_between_files = 3;
        manager.update_section(ConfigSection::Processing).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("cleanup_docx = false"));
        assert!(content.contains("# docgen configuration"));

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().processing.delay_between_files, 3);
        assert_eq!(reloaded.settings().jobs.len(), 1);
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docgen.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(!config_path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn base_dir_is_config_parent() {
        assert_eq!(ConfigManager::new("docgen.toml").base_dir(), PathBuf::from("."));
        assert_eq!(
            ConfigManager::new("/srv/run/docgen.toml").base_dir(),
            PathBuf::from("/srv/run")
        );
    }
}
