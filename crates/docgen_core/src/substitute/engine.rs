//! Run-preserving placeholder substitution for a single text container.

use serde::{Deserialize, Serialize};

use super::replacements::{Match, ReplacementMap};
use crate::document::{Run, RunFormat, TextContainer};

/// How runs are rebuilt after substitution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionMode {
    /// One run with the complete properties of the original first run.
    Collapse,
    /// One run per literal segment and per inserted value, each with the
    /// first run's formatting attributes.
    #[default]
    Segments,
}

/// Substitute tokens in `container`. Returns `true` if anything matched.
///
/// A container with no match is left untouched, run boundaries included.
pub fn substitute<C>(container: &mut C, map: &ReplacementMap, mode: SubstitutionMode) -> bool
where
    C: TextContainer + ?Sized,
{
    let text = container.text();
    let matches = map.find_matches(&text);
    if matches.is_empty() {
        return false;
    }

    let runs = match mode {
        SubstitutionMode::Collapse => {
            let rendered = map.render(&text, &matches);
            let run = match container.runs().first() {
                Some(first) => first.restyled(rendered),
                None => Run::new(rendered),
            };
            vec![run]
        }
        SubstitutionMode::Segments => {
            let format = container
                .runs()
                .first()
                .map(|r| r.format.clone())
                .unwrap_or_default();
            segment_runs(&text, map, &matches, &format)
        }
    };

    container.replace_runs(runs);
    if let Some(alignment) = map.alignment_for(&matches) {
        container.set_alignment(alignment);
    }
    true
}

fn segment_runs(
    text: &str,
    map: &ReplacementMap,
    matches: &[Match],
    format: &RunFormat,
) -> Vec<Run> {
    let mut runs = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;
    for m in matches {
        if m.start > cursor {
            runs.push(Run::styled(&text[cursor..m.start], format.clone()));
        }
        runs.push(Run::styled(
            map.entries()[m.entry].value.as_str(),
            format.clone(),
        ));
        cursor = m.end;
    }
    if cursor < text.len() {
        runs.push(Run::styled(&text[cursor..], format.clone()));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Alignment, Paragraph, Underline};
    use crate::document::xml::Element;

    fn bold() -> RunFormat {
        RunFormat {
            bold: Some(true),
            font_size: Some(32),
            ..Default::default()
        }
    }

    fn split_placeholder() -> Paragraph {
        Paragraph::from_runs(
            vec![
                Run {
                    text: "{ФИО".into(),
                    format: bold(),
                    properties: Some(Element::new("w:rPr").with_child(Element::new("w:b"))),
                },
                Run::styled("_участника}", RunFormat {
                    underline: Some(Underline::Single),
                    ..Default::default()
                }),
            ],
            None,
        )
    }

    fn map() -> ReplacementMap {
        let mut map = ReplacementMap::new();
        map.bind_field("ФИО_участника", "Иванов И.И.", None);
        map
    }

    #[test]
    fn collapse_joins_split_placeholder() {
        let mut p = split_placeholder();
        assert!(substitute(&mut p, &map(), SubstitutionMode::Collapse));

        assert_eq!(p.text(), "Иванов И.И.");
        assert_eq!(p.runs().len(), 1);
        assert_eq!(p.runs()[0].format, bold());
        assert!(p.runs()[0].properties.is_some());
    }

    #[test]
    fn segments_split_around_values() {
        let mut p = Paragraph::from_runs(
            vec![Run::styled("Dear {ФИО_участника}, welcome", bold())],
            None,
        );
        assert!(substitute(&mut p, &map(), SubstitutionMode::Segments));

        let texts: Vec<&str> = p.runs().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Dear ", "Иванов И.И.", ", welcome"]);
        assert!(p.runs().iter().all(|r| r.format == bold()));
        assert!(p.runs().iter().all(|r| r.properties.is_none()));
    }

    #[test]
    fn segments_skip_empty_literals() {
        let mut p = split_placeholder();
        assert!(substitute(&mut p, &map(), SubstitutionMode::Segments));

        assert_eq!(p.runs().len(), 1);
        assert_eq!(p.text(), "Иванов И.И.");
        assert_eq!(p.runs()[0].format, bold());
    }

    #[test]
    fn empty_values_are_still_emitted() {
        let mut map = ReplacementMap::new();
        map.insert("{X}", "");
        let mut p = Paragraph::from_runs(vec![Run::new("a{X}b")], None);
        substitute(&mut p, &map, SubstitutionMode::Segments);
        let texts: Vec<&str> = p.runs().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "", "b"]);
    }

    #[test]
    fn no_match_leaves_runs_untouched() {
        let mut p = split_placeholder();
        let before = p.clone();
        let mut other = ReplacementMap::new();
        other.insert("{Other}", "x");

        for mode in [SubstitutionMode::Collapse, SubstitutionMode::Segments] {
            assert!(!substitute(&mut p, &other, mode));
            assert_eq!(p, before);
            assert!(!p.is_modified());
        }
    }

    #[test]
    fn zero_run_paragraph_is_unchanged() {
        let mut p = Paragraph::default();
        assert!(!substitute(&mut p, &map(), SubstitutionMode::Collapse));
        assert!(p.runs().is_empty());
    }

    #[test]
    fn justified_variant_sets_alignment() {
        let mut p = Paragraph::from_runs(vec![Run::new("{ФИО_участника*}")], None);
        substitute(&mut p, &map(), SubstitutionMode::Segments);
        assert_eq!(p.text(), "Иванов И.И.");
        assert_eq!(p.alignment(), Some(Alignment::Justify));
    }

    #[test]
    fn field_alignment_applies() {
        let mut map = ReplacementMap::new();
        map.bind_field("Name", "A", Some(Alignment::Center));
        let mut p = Paragraph::from_runs(vec![Run::new("{Name}")], Some(Alignment::Left));
        substitute(&mut p, &map, SubstitutionMode::Collapse);
        assert_eq!(p.alignment(), Some(Alignment::Center));
    }

    #[test]
    fn unmapped_placeholder_survives() {
        let mut p = Paragraph::from_runs(vec![Run::new("{ФИО_участника} / {Unknown}")], None);
        substitute(&mut p, &map(), SubstitutionMode::Segments);
        assert_eq!(p.text(), "Иванов И.И. / {Unknown}");
    }
}
