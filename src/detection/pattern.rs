//! Regex rule detector.
//!
//! Always available and deterministic, this is the fallback for every other
//! detector variant.

use super::{Detection, Detector, DetectorUsed};
use crate::domain::validation::{is_conservative_person, is_plausible_age};
use crate::domain::{resolve_overlaps, CharOffsets, CompiledRules, EntityKind, Span};
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Detector applying the ordered `(kind, pattern)` rule table.
///
/// - EMAIL: `local@domain.tld`
/// - AGE: `<n> ans` / `<n> years old`, value within the plausible range
/// - PERSON: two consecutive capitalized tokens, neither a stop-word
#[derive(Debug, Clone)]
pub struct PatternDetector {
    rules: Arc<CompiledRules>,
}

impl PatternDetector {
    pub fn new(rules: Arc<CompiledRules>) -> Self {
        Self { rules }
    }

    /// All rule matches that pass their kind check, in rule order.
    pub fn candidates(&self, text: &str) -> Vec<Span> {
        let offsets = CharOffsets::new(text);
        let mut spans = Vec::new();

        for (kind, regex) in self.rules.patterns() {
            let found = scan(regex, text, &offsets, kind, |matched| {
                self.accepts(kind, matched)
            });
            spans.extend(found);
        }

        spans
    }

    fn accepts(&self, kind: &EntityKind, matched: &str) -> bool {
        match kind {
            EntityKind::Person => is_conservative_person(matched, &self.rules),
            EntityKind::Age => is_plausible_age(matched, &self.rules),
            EntityKind::Email | EntityKind::Organization | EntityKind::Other(_) => true,
        }
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new(CompiledRules::builtin())
    }
}

impl Detector for PatternDetector {
    fn detect_with_source(&self, text: &str) -> Detection {
        let spans = resolve_overlaps(self.candidates(text)).into_vec();
        debug!(spans = spans.len(), "pattern detection finished");
        Detection {
            spans,
            detector_used: DetectorUsed::Pattern,
        }
    }

    fn name(&self) -> &str {
        "pattern"
    }
}

/// Collects matches of `regex` accepted by `accept`.
///
/// After a rejected match the search resumes at the match's second token, so
/// `"Contact Jean Dupont"` still yields `"Jean Dupont"` once `"Contact Jean"`
/// is turned down.
pub(crate) fn scan<F>(
    regex: &Regex,
    text: &str,
    offsets: &CharOffsets,
    kind: &EntityKind,
    mut accept: F,
) -> Vec<Span>
where
    F: FnMut(&str) -> bool,
{
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(found) = regex.find_at(text, pos) else {
            break;
        };

        if found.start() == found.end() {
            pos = next_char_boundary(text, found.end());
            continue;
        }

        if accept(found.as_str()) {
            spans.push(offsets.span(text, kind.clone(), found.start(), found.end()));
            pos = found.end();
        } else {
            pos = found
                .as_str()
                .char_indices()
                .find(|(_, c)| c.is_whitespace())
                .map_or(found.end(), |(i, c)| found.start() + i + c.len_utf8());
        }
    }

    spans
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| pos + c.len_utf8())
}
