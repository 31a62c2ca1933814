//! HTML body templates.

use std::fs;
use std::path::{Path, PathBuf};

use super::{MailError, MailResult};

/// An HTML body with `{token}` markers, read once per batch.
#[derive(Debug, Clone)]
pub struct BodyTemplate {
    path: PathBuf,
    html: String,
}

impl BodyTemplate {
    pub fn load(path: impl AsRef<Path>) -> MailResult<Self> {
        let path = path.as_ref();
        let html = fs::read_to_string(path).map_err(|source| MailError::Template {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_html(path, html))
    }

    pub fn from_html(path: impl Into<PathBuf>, html: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            html: html.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace each `{token}` with its value, in the given order.
    ///
    /// Plain literal replacement; unknown markers stay as written.
    pub fn render(&self, values: &[(String, String)]) -> String {
        values.iter().fold(self.html.clone(), |html, (token, value)| {
            html.replace(&format!("{{{}}}", token), value)
        })
    }
}
