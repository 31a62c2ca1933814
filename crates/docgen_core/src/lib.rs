//! docgen core - batch document generation from templates and tabular data.
//!
//! This crate contains all generation logic with no CLI dependencies:
//! DOCX templating, record input, PDF conversion and merging, mail dispatch
//! and the batch orchestrator tying them together.

pub mod cleanup;
pub mod config;
pub mod convert;
pub mod document;
pub mod logging;
pub mod mail;
pub mod naming;
pub mod orchestrator;
pub mod pdf;
pub mod records;
pub mod substitute;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
