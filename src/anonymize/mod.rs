//! Anonymization pipeline: detector → resolver → registry → rewriter.
//!
//! A [`Pipeline`] is immutable and may be shared between threads; every run
//! gets its own [`ReplacementRegistry`].

pub mod registry;
pub mod result;
pub mod rewriter;

pub use registry::{RegistryEntry, ReplacementRegistry, Synthesizer};
pub use result::{AnonymizationResult, Statistics};
pub use rewriter::{apply, apply_mapping};

use crate::config::{AnonymizerConfig, Locale};
use crate::detection::{Detector, DetectorBackend, DetectorUsed, PatternDetector};
use crate::domain::{resolve_overlaps, CompiledRules, Span};
use crate::error::{AnonymizerError, AnonymizerResult};
use std::sync::Arc;
use tracing::{debug, info};

/// What one pipeline run produced, before it is turned into a result.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub anonymized_text: String,
    /// Accepted spans in acceptance order.
    pub spans: Vec<Span>,
    pub detector_used: DetectorUsed,
}

/// Orchestrates one anonymization run per input.
#[derive(Debug)]
pub struct Pipeline {
    detector: DetectorBackend,
    rules: Arc<CompiledRules>,
    locale: Locale,
    seed: Option<u64>,
}

impl Pipeline {
    pub fn new(detector: DetectorBackend, rules: Arc<CompiledRules>) -> Self {
        Self {
            detector,
            rules,
            locale: Locale::default(),
            seed: None,
        }
    }

    /// Pattern detection with the built-in rules.
    pub fn pattern() -> Self {
        let rules = CompiledRules::builtin();
        Self::new(
            DetectorBackend::Pattern(PatternDetector::new(Arc::clone(&rules))),
            rules,
        )
    }

    pub fn from_config(config: &AnonymizerConfig) -> AnonymizerResult<Self> {
        let rules = config.load_rules()?;
        let detector = DetectorBackend::from_config(config, Arc::clone(&rules));
        info!(detector = %config.detector, locale = %config.locale, "pipeline configured");

        Ok(Self {
            detector,
            rules,
            locale: config.locale,
            seed: config.seed,
        })
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn detector(&self) -> &DetectorBackend {
        &self.detector
    }

    /// Fresh registry for one run.
    pub fn new_registry(&self) -> ReplacementRegistry {
        ReplacementRegistry::new(Synthesizer::new(
            Arc::clone(&self.rules),
            self.locale,
            self.seed,
        ))
    }

    /// Detects, registers and rewrites `text`, growing `registry`.
    pub fn run(&self, text: &str, registry: &mut ReplacementRegistry) -> AnonymizerResult<RunOutput> {
        if text.trim().is_empty() {
            return Err(AnonymizerError::EmptyInput("no text provided".to_string()));
        }

        let detection = self.detector.detect_with_source(text);
        let accepted = resolve_overlaps(detection.spans);

        for span in accepted.iter() {
            registry.resolve(span.text(), span.kind());
        }
        let anonymized_text = rewriter::apply(text, accepted.as_slice(), registry);

        debug!(
            spans = accepted.len(),
            entries = registry.len(),
            detector = %detection.detector_used,
            "run finished"
        );
        Ok(RunOutput {
            anonymized_text,
            spans: accepted.into_vec(),
            detector_used: detection.detector_used,
        })
    }

    /// Anonymizes free text. Never fails; errors become a failed result.
    pub fn anonymize(&self, text: &str) -> AnonymizationResult {
        let mut registry = self.new_registry();
        match self.run(text, &mut registry) {
            Ok(output) => AnonymizationResult::completed(
                text,
                output.anonymized_text,
                &registry,
                &output.detector_used,
                "text",
            ),
            Err(e) => AnonymizationResult::failed(text, &e, "text"),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::pattern()
    }
}
