//! Output file naming.
//!
//! Names are derived from a record's display field: characters that are
//! invalid on common filesystems become `_`, spaces become `_`, and the 1-based
//! record position is appended for indexed categories. A [`NameRegistry`]
//! keeps names unique per directory for one batch run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Characters replaced with `_` in generated names.
pub const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace forbidden characters, then spaces, with `_`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// `<prefix>_<sanitized value>[_<position>]` where `position = index + 1`.
///
/// An empty prefix is omitted together with its separator.
pub fn base_name(prefix: &str, value: &str, index: Option<usize>) -> String {
    let mut name = String::new();
    if !prefix.is_empty() {
        name.push_str(prefix);
        name.push('_');
    }
    name.push_str(&sanitize(value));
    if let Some(index) = index {
        name.push('_');
        name.push_str(&(index + 1).to_string());
    }
    name
}

/// Attachment filename for a dispatched document.
pub fn attachment_name(prefix: &str, value: &str) -> String {
    format!("{}.pdf", base_name(prefix, value, None))
}

/// Names handed out per output directory during one batch.
#[derive(Debug, Default)]
pub struct NameRegistry {
    used: HashMap<PathBuf, HashSet<String>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique base name in `dir`.
    ///
    /// A non-indexed name that is already taken falls back to the indexed
    /// form; further collisions get a numeric suffix.
    pub fn reserve(
        &mut self,
        dir: &Path,
        prefix: &str,
        value: &str,
        index: usize,
        indexed: bool,
    ) -> String {
        let used = self.used.entry(dir.to_path_buf()).or_default();

        let mut candidate = base_name(prefix, value, indexed.then_some(index));
        if used.contains(&candidate) {
            candidate = base_name(prefix, value, Some(index));
        }
        if used.contains(&candidate) {
            let stem = candidate.clone();
            let mut n = 2;
            while used.contains(&candidate) {
                candidate = format!("{}_{}", stem, n);
                n += 1;
            }
        }

        used.insert(candidate.clone());
        candidate
    }

    /// Number of names reserved in `dir`.
    pub fn count(&self, dir: &Path) -> usize {
        self.used.get(dir).map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_forbidden_characters_and_spaces() {
        assert_eq!(sanitize(r#"A/B\C:D*E?F"G<H>I|J"#), "A_B_C_D_E_F_G_H_I_J");
        assert_eq!(sanitize("Иванов Иван Иванович"), "Иванов_Иван_Иванович");
    }

    #[test]
    fn base_name_appends_position() {
        assert_eq!(
            base_name("Сертификат", "Иванов И.И.", Some(0)),
            "Сертификат_Иванов_И.И._1"
        );
        assert_eq!(base_name("", "Report: final", None), "Report__final");
    }

    #[test]
    fn attachment_uses_prefix() {
        assert_eq!(
            attachment_name("Приглашение_на_конференцию", "Петров П.П."),
            "Приглашение_на_конференцию_Петров_П.П..pdf"
        );
    }

    #[test]
    fn identical_names_with_different_indices_are_distinct() {
        let mut registry = NameRegistry::new();
        let dir = Path::new("out");
        let a = registry.reserve(dir, "C", "Same Name", 3, true);
        let b = registry.reserve(dir, "C", "Same Name", 7, true);
        assert_ne!(a, b);
        assert_eq!(registry.count(dir), 2);
    }

    #[test]
    fn non_indexed_collision_falls_back_to_index() {
        let mut registry = NameRegistry::new();
        let dir = Path::new("out");
        assert_eq!(registry.reserve(dir, "D", "Same", 0, false), "D_Same");
        assert_eq!(registry.reserve(dir, "D", "Same", 4, false), "D_Same_5");
        assert_eq!(registry.reserve(dir, "D", "Same", 4, false), "D_Same_5_2");
    }

    #[test]
    fn directories_are_independent() {
        let mut registry = NameRegistry::new();
        let a = registry.reserve(Path::new("a"), "X", "n", 0, false);
        let b = registry.reserve(Path::new("b"), "X", "n", 0, false);
        assert_eq!(a, b);
    }
}
