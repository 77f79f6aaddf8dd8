//! Applies a replacement mapping to text.
//!
//! Occurrences are located in the original text only. Accepted spans claim
//! their own regions first; other occurrences follow, longer originals
//! first, and one overlapping a claimed region is skipped. Claimed regions
//! are then substituted back to front. Output is never searched again, so
//! replacements cannot be rewritten and an original contained in another
//! original cannot split it.

use super::registry::ReplacementRegistry;
use crate::domain::{CharOffsets, Span};
use std::ops::Range;

type Claim<'a> = (Range<usize>, &'a str);

/// Rewrites each accepted span, then every other occurrence of its original,
/// with the registry replacement. Originals not in the registry are left
/// alone.
pub fn apply(text: &str, spans: &[Span], registry: &ReplacementRegistry) -> String {
    let offsets = CharOffsets::new(text);
    let mut reserved: Vec<Claim<'_>> = Vec::new();
    let mut pairs = Vec::new();

    for span in spans {
        let Some(entry) = registry.get(span.text()) else {
            continue;
        };
        pairs.push((entry.original.as_str(), entry.replacement.as_str()));

        // offsets from another text (or a stale run) fall back to literal search
        let Some(range) = offsets
            .to_byte(span.start())
            .zip(offsets.to_byte(span.end()))
            .map(|(start, end)| start..end)
        else {
            continue;
        };
        if text.get(range.clone()) == Some(span.text()) && is_free(&reserved, &range) {
            reserved.push((range, entry.replacement.as_str()));
        }
    }

    rewrite(text, reserved, pairs)
}

/// Rewrites every literal occurrence of each original in `mapping`.
pub fn apply_mapping<'a, I>(text: &str, mapping: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    rewrite(text, Vec::new(), mapping)
}

fn is_free(claimed: &[Claim<'_>], range: &Range<usize>) -> bool {
    claimed
        .iter()
        .all(|(taken, _)| range.end <= taken.start || taken.end <= range.start)
}

fn rewrite<'a, I>(text: &str, mut claimed: Vec<Claim<'a>>, mapping: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = mapping
        .into_iter()
        .filter(|(original, _)| !original.is_empty())
        .collect();
    pairs.sort_by(|a, b| {
        b.0.chars()
            .count()
            .cmp(&a.0.chars().count())
            .then_with(|| a.0.cmp(b.0))
    });
    pairs.dedup_by(|a, b| a.0 == b.0);

    for (original, replacement) in pairs {
        for (pos, _) in text.match_indices(original) {
            let range = pos..pos + original.len();
            if is_free(&claimed, &range) {
                claimed.push((range, replacement));
            }
        }
    }

    claimed.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut output = text.to_string();
    for (range, replacement) in claimed {
        output.replace_range(range, replacement);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityKind;

    #[test]
    fn test_all_occurrences_replaced() {
        let out = apply_mapping(
            "Jean Dupont met Jean Dupont.",
            [("Jean Dupont", "Luc Martin")],
        );
        assert_eq!(out, "Luc Martin met Luc Martin.");
    }

    #[test]
    fn test_replacement_output_not_rescanned() {
        // "Marie" appears inside the replacement of "Jean"
        let out = apply_mapping("Jean et Marie", [("Jean", "Marie Curie"), ("Marie", "Anne")]);
        assert_eq!(out, "Marie Curie et Anne");
    }

    #[test]
    fn test_longest_original_claims_first() {
        let out = apply_mapping(
            "Jean Dupont and Jean",
            [("Jean", "Paul"), ("Jean Dupont", "Luc Martin")],
        );
        assert_eq!(out, "Luc Martin and Paul");
    }

    #[test]
    fn test_multibyte_text() {
        let out = apply_mapping("Zoé écrit à Zoé", [("Zoé", "Léa")]);
        assert_eq!(out, "Léa écrit à Léa");
    }

    #[test]
    fn test_apply_uses_registry() {
        let mut registry = ReplacementRegistry::seeded(3);
        let span = Span::new("34 ans", EntityKind::Age, 0, 6);
        let replacement = registry.resolve(span.text(), span.kind()).to_string();
        let unknown = Span::new("Paris", EntityKind::Other("GPE".to_string()), 10, 15);

        let out = apply("34 ans et Paris", &[span, unknown], &registry);
        assert_eq!(out, format!("{replacement} et Paris"));
    }

    #[test]
    fn test_accepted_span_wins_over_longer_occurrence() {
        // "Anne Marie" overlaps the second "Marie Curie" but was accepted there
        let text = "Marie Curie et Anne Marie Curie.";
        let mut registry = ReplacementRegistry::seeded(1);
        let spans = vec![
            Span::new("Marie Curie", EntityKind::Person, 0, 11),
            Span::new("Anne Marie", EntityKind::Person, 15, 25),
        ];
        for span in &spans {
            registry.resolve(span.text(), span.kind());
        }
        let first = registry.get("Marie Curie").unwrap().replacement.clone();
        let second = registry.get("Anne Marie").unwrap().replacement.clone();

        let out = apply(text, &spans, &registry);
        assert_eq!(out, format!("{first} et {second} Curie."));
    }

    #[test]
    fn test_stale_span_offsets_are_ignored() {
        let mut registry = ReplacementRegistry::seeded(2);
        let span = Span::new("Jean Dupont", EntityKind::Person, 40, 51);
        let replacement = registry.resolve(span.text(), span.kind()).to_string();

        let out = apply("Hi Jean Dupont", &[span], &registry);
        assert_eq!(out, format!("Hi {replacement}"));
    }

    #[test]
    fn test_empty_mapping_is_identity() {
        assert_eq!(apply_mapping("unchanged", std::iter::empty()), "unchanged");
        assert_eq!(apply_mapping("unchanged", [("", "x")]), "unchanged");
    }
}
