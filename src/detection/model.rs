//! Named-entity model detector.
//!
//! The model itself is a seam ([`NerModel`]). The shipped backend is a
//! gazetteer model read from `<model_dir>/<lang>.toml`; French is tried
//! before English. Without any model the detector behaves exactly like
//! [`PatternDetector`].

use super::pattern::{scan, PatternDetector};
use super::{Detection, Detector, DetectorKind, DetectorUsed};
use crate::domain::validation::{is_plausible_age, is_valid_person_name};
use crate::domain::{AcceptedSpans, CharOffsets, CompiledRules, EntityKind, Span};
use crate::error::{AnonymizerError, AnonymizerResult};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model languages in load order.
pub const MODEL_LANGUAGES: [&str; 2] = ["fr", "en"];

/// An entity reported by a model, with character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntity {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// A loaded named-entity model.
pub trait NerModel: Send + Sync + fmt::Debug {
    /// Language code of the model (`fr`, `en`).
    fn language(&self) -> &str;

    /// Entities found in `text`. Labels use the model's own vocabulary.
    fn entities(&self, text: &str) -> Vec<ModelEntity>;
}

#[derive(Debug, Deserialize)]
struct LexiconFile {
    language: Option<String>,
    #[serde(default)]
    entries: Vec<LexiconEntry>,
    #[serde(default)]
    patterns: Vec<LexiconEntry>,
}

#[derive(Debug, Deserialize)]
struct LexiconEntry {
    text: Option<String>,
    pattern: Option<String>,
    label: String,
}

/// Gazetteer model: literal entries matched on word boundaries plus
/// optional regex rules, each tagged with a model label.
///
/// ```toml
/// language = "fr"
///
/// [[entries]]
/// text = "Holokia"
/// label = "ORG"
///
/// [[patterns]]
/// pattern = "\\bM(?:me|\\.) \\p{Lu}\\p{Ll}+"
/// label = "PER"
/// ```
#[derive(Debug, Clone)]
pub struct LexiconModel {
    language: String,
    rules: Vec<(Regex, String)>,
}

impl LexiconModel {
    pub fn load(path: &Path, language: &str) -> AnonymizerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AnonymizerError::io(path, e))?;
        Self::from_toml(&raw, language)
    }

    /// Parses a lexicon; the file's own `language` key wins over `language`.
    pub fn from_toml(raw: &str, language: &str) -> AnonymizerResult<Self> {
        let file: LexiconFile = toml::from_str(raw)?;
        let mut rules = Vec::new();

        for entry in file.entries.iter().chain(file.patterns.iter()) {
            let source = match (&entry.pattern, &entry.text) {
                (Some(pattern), _) => pattern.clone(),
                (None, Some(text)) => format!(r"\b{}\b", regex::escape(text)),
                (None, None) => {
                    return Err(AnonymizerError::Config(format!(
                        "lexicon entry labeled '{}' has neither text nor pattern",
                        entry.label
                    )))
                }
            };
            let regex = Regex::new(&source).map_err(|e| AnonymizerError::Pattern {
                pattern: source.clone(),
                reason: e.to_string(),
            })?;
            rules.push((regex, entry.label.clone()));
        }

        Ok(Self {
            language: file.language.unwrap_or_else(|| language.to_string()),
            rules,
        })
    }
}

impl NerModel for LexiconModel {
    fn language(&self) -> &str {
        &self.language
    }

    fn entities(&self, text: &str) -> Vec<ModelEntity> {
        let offsets = CharOffsets::new(text);
        self.rules
            .iter()
            .flat_map(|(regex, label)| {
                let offsets = &offsets;
                regex.find_iter(text).map(move |m| ModelEntity {
                    label: label.clone(),
                    start: offsets.to_char(m.start()),
                    end: offsets.to_char(m.end()),
                })
            })
            .collect()
    }
}

/// Finds the first loadable model in `model_dir`, French before English.
pub fn load_model(model_dir: &Path) -> AnonymizerResult<Box<dyn NerModel>> {
    for language in MODEL_LANGUAGES {
        let path = model_dir.join(format!("{language}.toml"));
        if !path.is_file() {
            continue;
        }
        match LexiconModel::load(&path, language) {
            Ok(model) => {
                info!(language, path = %path.display(), "loaded NER model");
                return Ok(Box::new(model));
            }
            Err(e) => warn!(language, error = %e, "failed to load NER model"),
        }
    }

    Err(AnonymizerError::DetectorUnavailable {
        detector: "model".to_string(),
        reason: format!("no model for {:?} in '{}'", MODEL_LANGUAGES, model_dir.display()),
    })
}

/// Detector combining a NER model with supplemental regex and first-name
/// passes.
#[derive(Debug)]
pub struct ModelDetector {
    rules: Arc<CompiledRules>,
    model: Option<Box<dyn NerModel>>,
    fallback: PatternDetector,
}

impl ModelDetector {
    /// Loads a model from `model_dir`, degrading to pattern detection when
    /// none is available.
    pub fn load(model_dir: Option<&Path>, rules: Arc<CompiledRules>) -> Self {
        let model = match model_dir.map(load_model) {
            Some(Ok(model)) => Some(model),
            Some(Err(e)) => {
                warn!(error = %e, "NER model unavailable, using pattern detection");
                None
            }
            None => {
                warn!("no model directory configured, using pattern detection");
                None
            }
        };
        Self::from_parts(model, rules)
    }

    pub fn with_model(model: Box<dyn NerModel>, rules: Arc<CompiledRules>) -> Self {
        Self::from_parts(Some(model), rules)
    }

    pub fn unavailable(rules: Arc<CompiledRules>) -> Self {
        Self::from_parts(None, rules)
    }

    fn from_parts(model: Option<Box<dyn NerModel>>, rules: Arc<CompiledRules>) -> Self {
        Self {
            fallback: PatternDetector::new(Arc::clone(&rules)),
            rules,
            model,
        }
    }

    /// Language of the loaded model, if any.
    pub fn language(&self) -> Option<&str> {
        self.model.as_deref().map(|model| model.language())
    }

    fn model_spans(&self, model: &dyn NerModel, text: &str, offsets: &CharOffsets) -> Vec<Span> {
        let mut spans = Vec::new();

        for entity in model.entities(text) {
            let kind = EntityKind::from_label(&entity.label);
            if !matches!(
                kind,
                EntityKind::Person | EntityKind::Organization | EntityKind::Email
            ) {
                continue;
            }
            let Some(raw) = offsets.slice(text, entity.start, entity.end) else {
                debug!(?entity, "model entity outside text bounds");
                continue;
            };

            let leading = raw.chars().take_while(|c| c.is_whitespace()).count();
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if kind == EntityKind::Person && !is_valid_person_name(trimmed, &self.rules) {
                continue;
            }

            let start = entity.start + leading;
            spans.push(Span::new(trimmed, kind, start, start + trimmed.chars().count()));
        }

        spans
    }
}

impl Detector for ModelDetector {
    fn detect_with_source(&self, text: &str) -> Detection {
        let Some(model) = self.model.as_deref() else {
            return Detection {
                spans: self.fallback.detect(text),
                detector_used: DetectorUsed::Fallback {
                    from: DetectorKind::Model,
                },
            };
        };

        let offsets = CharOffsets::new(text);
        let mut accepted = AcceptedSpans::new();

        for span in self.model_spans(model, text, &offsets) {
            accepted.offer(span);
        }

        let rules = &self.rules;
        for regex in rules.patterns_for(&EntityKind::Age) {
            for span in scan(regex, text, &offsets, &EntityKind::Age, |m| {
                is_plausible_age(m, rules)
            }) {
                accepted.offer(span);
            }
        }
        for span in scan(rules.age_context(), text, &offsets, &EntityKind::Age, |_| true) {
            accepted.offer(span);
        }
        for regex in rules.patterns_for(&EntityKind::Email) {
            for span in scan(regex, text, &offsets, &EntityKind::Email, |_| true) {
                accepted.offer(span);
            }
        }
        for span in scan(
            rules.first_name_token(),
            text,
            &offsets,
            &EntityKind::Person,
            |token| rules.is_first_name(token) && is_valid_person_name(token, rules),
        ) {
            accepted.offer(span);
        }

        debug!(spans = accepted.len(), language = model.language(), "model detection finished");
        Detection {
            spans: accepted.into_vec(),
            detector_used: DetectorUsed::Model {
                language: model.language().to_string(),
            },
        }
    }

    fn name(&self) -> &str {
        "model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedModel(Vec<ModelEntity>);

    impl NerModel for FixedModel {
        fn language(&self) -> &str {
            "en"
        }

        fn entities(&self, _text: &str) -> Vec<ModelEntity> {
            self.0.clone()
        }
    }

    fn entity(label: &str, start: usize, end: usize) -> ModelEntity {
        ModelEntity {
            label: label.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_labels_mapped_and_persons_filtered() {
        let text = "Marie Curie works at Holokia in Casablanca with NASA.";
        let model = FixedModel(vec![
            entity("PER", 0, 11),
            entity("ORG", 21, 28),
            entity("GPE", 32, 42),
            entity("PER", 48, 52),
        ]);
        let detector = ModelDetector::with_model(Box::new(model), CompiledRules::builtin());
        let detection = detector.detect_with_source(text);

        let found: Vec<(&str, &EntityKind)> =
            detection.spans.iter().map(|s| (s.text(), s.kind())).collect();
        assert_eq!(
            found,
            vec![
                ("Marie Curie", &EntityKind::Person),
                ("Holokia", &EntityKind::Organization),
            ]
        );
        assert_eq!(
            detection.detector_used,
            DetectorUsed::Model {
                language: "en".to_string()
            }
        );
    }

    #[test]
    fn test_supplemental_passes_do_not_overlap_model_spans() {
        let text = "Paul Martin, 41 years old, paul@example.org; ask Sarah.";
        let model = FixedModel(vec![entity("PER", 0, 11)]);
        let detector = ModelDetector::with_model(Box::new(model), CompiledRules::builtin());
        let spans = detector.detect(text);

        let texts: Vec<&str> = spans.iter().map(Span::text).collect();
        assert_eq!(texts, vec!["Paul Martin", "41 years old", "paul@example.org", "Sarah"]);
    }

    #[test]
    fn test_missing_model_degrades_to_patterns() {
        let detector = ModelDetector::unavailable(CompiledRules::builtin());
        let detection = detector.detect_with_source("Contact Jean Dupont");
        assert!(detection.detector_used.is_fallback());
        assert_eq!(detection.spans[0].text(), "Jean Dupont");
        assert!(detector.language().is_none());
    }

    #[test]
    fn test_lexicon_model() {
        let model = LexiconModel::from_toml(
            r#"
            [[entries]]
            text = "Holokia"
            label = "ORG"

            [[patterns]]
            pattern = "\\bDr\\. \\p{Lu}\\p{Ll}+"
            label = "PER"
            "#,
            "fr",
        )
        .unwrap();
        assert_eq!(model.language(), "fr");

        let found = model.entities("Le Dr. Zoé travaille chez Holokia.");
        assert_eq!(found.len(), 2);
        assert!(found.contains(&entity("ORG", 26, 33)));
        assert!(found.contains(&entity("PER", 3, 10)));
    }

    #[test]
    fn test_load_prefers_french() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en.toml"), "language = \"en\"").unwrap();
        std::fs::write(dir.path().join("fr.toml"), "language = \"fr\"").unwrap();

        let detector = ModelDetector::load(Some(dir.path()), CompiledRules::builtin());
        assert_eq!(detector.language(), Some("fr"));

        std::fs::remove_file(dir.path().join("fr.toml")).unwrap();
        let detector = ModelDetector::load(Some(dir.path()), CompiledRules::builtin());
        assert_eq!(detector.language(), Some("en"));
    }

    #[test]
    fn test_load_without_models_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(dir.path()).unwrap_err();
        assert!(matches!(err, AnonymizerError::DetectorUnavailable { .. }));
    }
}
