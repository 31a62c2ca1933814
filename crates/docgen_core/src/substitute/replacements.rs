//! Ordered placeholder → value mapping and single-pass matching.

use crate::document::Alignment;

/// One placeholder binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Literal token, e.g. `{ФИО_участника}`.
    pub token: String,
    pub value: String,
    /// Paragraph alignment applied when this token is matched.
    pub alignment: Option<Alignment>,
}

/// A located token occurrence in a container's text (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    /// Index into [`ReplacementMap::entries`].
    pub entry: usize,
}

/// Ordered mapping from placeholder literal to substitution value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementMap {
    entries: Vec<Replacement>,
}

impl ReplacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{field}`
    pub fn placeholder(field: &str) -> String {
        format!("{{{}}}", field)
    }

    /// `{field*}`: the justified variant.
    pub fn justified_placeholder(field: &str) -> String {
        format!("{{{}*}}", field)
    }

    /// Insert or replace a token without alignment.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.insert_aligned(token, value, None)
    }

    /// Insert or replace a token. Re-inserting keeps the original position.
    pub fn insert_aligned(
        &mut self,
        token: impl Into<String>,
        value: impl Into<String>,
        alignment: Option<Alignment>,
    ) -> &mut Self {
        let token = token.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.token == token) {
            Some(existing) => {
                existing.value = value;
                existing.alignment = alignment;
            }
            None => self.entries.push(Replacement {
                token,
                value,
                alignment,
            }),
        }
        self
    }

    /// Bind a field name: `{field}` with the given alignment and `{field*}`
    /// with justified alignment.
    pub fn bind_field(
        &mut self,
        field: &str,
        value: &str,
        alignment: Option<Alignment>,
    ) -> &mut Self {
        self.insert_aligned(Self::placeholder(field), value, alignment);
        self.insert_aligned(
            Self::justified_placeholder(field),
            value,
            Some(Alignment::Justify),
        )
    }

    pub fn entries(&self) -> &[Replacement] {
        &self.entries
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.token == token)
            .map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find non-overlapping token occurrences, scanning left to right.
    ///
    /// At each position the longest token that matches wins, so `{Name*}` is
    /// never shadowed by a shorter token sharing its prefix. Scanning resumes
    /// after the matched token; values are never looked at.
    pub fn find_matches(&self, text: &str) -> Vec<Match> {
        let mut order: Vec<usize> = (0..self.entries.len())
            .filter(|&i| !self.entries[i].token.is_empty())
            .collect();
        if order.is_empty() {
            return Vec::new();
        }
        order.sort_by(|&a, &b| self.entries[b].token.len().cmp(&self.entries[a].token.len()));

        let mut matches = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let rest = &text[pos..];
            let found = order
                .iter()
                .copied()
                .find(|&i| rest.starts_with(self.entries[i].token.as_str()));
            match found {
                Some(entry) => {
                    let end = pos + self.entries[entry].token.len();
                    matches.push(Match {
                        start: pos,
                        end,
                        entry,
                    });
                    pos = end;
                }
                None => {
                    pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
                }
            }
        }
        matches
    }

    /// Apply precomputed matches to `text`.
    pub fn render(&self, text: &str, matches: &[Match]) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for m in matches {
            out.push_str(&text[cursor..m.start]);
            out.push_str(&self.entries[m.entry].value);
            cursor = m.end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// Replace every token in `text`.
    pub fn apply(&self, text: &str) -> String {
        let matches = self.find_matches(text);
        self.render(text, &matches)
    }

    /// Paragraph alignment for `matches`.
    ///
    /// `Justify` wins whenever a match carries it. Otherwise the last match
    /// (in text order) with an alignment decides.
    pub fn alignment_for(&self, matches: &[Match]) -> Option<Alignment> {
        let aligned = matches.iter().filter_map(|m| self.entries[m.entry].alignment);
        let mut chosen = None;
        for alignment in aligned {
            if alignment == Alignment::Justify {
                return Some(alignment);
            }
            chosen = Some(alignment);
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_all_occurrences() {
        let mut map = ReplacementMap::new();
        map.insert("{A}", "1").insert("{B}", "2");
        assert_eq!(map.apply("{A}+{B}={A}{B}"), "1+2=12");
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        let mut map = ReplacementMap::new();
        map.insert("{A}", "1");
        assert_eq!(map.apply("{A} {Z}"), "1 {Z}");
    }

    #[test]
    fn longest_token_wins() {
        let mut map = ReplacementMap::new();
        map.bind_field("Name", "Ivanov", Some(Alignment::Center));
        let matches = map.find_matches("{Name*}");
        assert_eq!(matches.len(), 1);
        assert_eq!(map.entries()[matches[0].entry].token, "{Name*}");
        assert_eq!(map.alignment_for(&matches), Some(Alignment::Justify));
    }

    #[test]
    fn values_are_not_rescanned() {
        let mut map = ReplacementMap::new();
        map.insert("{A}", "{B}").insert("{B}", "x");
        assert_eq!(map.apply("{A}{B}"), "{B}x");
    }

    #[test]
    fn handles_multibyte_text() {
        let mut map = ReplacementMap::new();
        map.bind_field("ФИО_участника", "Иванов И.И.", None);
        assert_eq!(map.apply("Уважаемый {ФИО_участника}!"), "Уважаемый Иванов И.И.!");
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut map = ReplacementMap::new();
        map.insert("{A}", "1").insert("{B}", "2").insert("{A}", "3");
        assert_eq!(map.len(), 2);
        assert_eq!(map.entries()[0].value, "3");
        assert_eq!(map.get("{B}"), Some("2"));
    }

    #[test]
    fn last_aligned_match_wins() {
        let mut map = ReplacementMap::new();
        map.insert_aligned("{A}", "a", Some(Alignment::Center))
            .insert_aligned("{B}", "b", Some(Alignment::Right))
            .insert("{C}", "c");
        let matches = map.find_matches("{B} {A} {C}");
        assert_eq!(map.alignment_for(&matches), Some(Alignment::Center));
    }

    #[test]
    fn justified_title_beats_centered_name() {
        let mut map = ReplacementMap::new();
        map.bind_field("ФИО", "Иванов И.И.", Some(Alignment::Center))
            .bind_field("Название_доклада", "О квантовых точках", None);

        let title_first = map.find_matches("{Название_доклада*} {ФИО}");
        assert_eq!(map.alignment_for(&title_first), Some(Alignment::Justify));
        let name_first = map.find_matches("{ФИО} {Название_доклада*}");
        assert_eq!(map.alignment_for(&name_first), Some(Alignment::Justify));
    }
}
