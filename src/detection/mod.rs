//! Detectors: turn text into candidate spans.
//!
//! All variants sit behind the [`Detector`] trait and are selected through
//! the closed [`DetectorKind`] enum. Every variant other than
//! [`PatternDetector`] falls back to it on failure, so detection itself never
//! fails; the fallback only shows in [`DetectorUsed`].

pub mod external;
pub mod model;
pub mod pattern;

pub use external::{CompletionClient, ExternalModelDetector, ProcessClient};
pub use model::{LexiconModel, ModelDetector, ModelEntity, NerModel};
pub use pattern::PatternDetector;

use crate::config::AnonymizerConfig;
use crate::domain::{CompiledRules, Span};
use crate::error::AnonymizerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Detector variants, in increasing cost and decreasing determinism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Pattern,
    #[serde(alias = "spacy")]
    Model,
    #[serde(alias = "llm")]
    External,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Model => "model",
            Self::External => "external",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorKind {
    type Err = AnonymizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" | "regex" => Ok(Self::Pattern),
            "model" | "spacy" | "ner" => Ok(Self::Model),
            "external" | "llm" => Ok(Self::External),
            other => Err(AnonymizerError::Config(format!(
                "unknown detector '{other}' (expected pattern, model or external)"
            ))),
        }
    }
}

/// Which detector actually produced a set of spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorUsed {
    Pattern,
    Model { language: String },
    External { model: String },
    /// The requested detector failed and pattern detection ran instead.
    Fallback { from: DetectorKind },
}

impl DetectorUsed {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

impl fmt::Display for DetectorUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::Model { language } => write!(f, "model:{language}"),
            Self::External { model } => write!(f, "external:{model}"),
            Self::Fallback { from } => write!(f, "pattern (fallback from {from})"),
        }
    }
}

/// Spans from one detection pass together with their provenance.
#[derive(Debug, Clone)]
pub struct Detection {
    pub spans: Vec<Span>,
    pub detector_used: DetectorUsed,
}

/// Capability shared by all detector variants.
///
/// `detect` must be a pure function of its input. Spans may overlap and come
/// in any order; the pipeline resolves conflicts.
pub trait Detector: Send + Sync {
    /// Detects candidate spans and reports which detector produced them.
    fn detect_with_source(&self, text: &str) -> Detection;

    /// Detects candidate spans.
    fn detect(&self, text: &str) -> Vec<Span> {
        self.detect_with_source(text).spans
    }

    /// Returns a human-readable name for this detector.
    fn name(&self) -> &str;
}

/// The closed set of detectors a pipeline can run.
#[derive(Debug)]
pub enum DetectorBackend {
    Pattern(PatternDetector),
    Model(ModelDetector),
    External(ExternalModelDetector),
}

impl DetectorBackend {
    /// Builds the detector selected in `config`.
    pub fn from_config(config: &AnonymizerConfig, rules: Arc<CompiledRules>) -> Self {
        match config.detector {
            DetectorKind::Pattern => Self::Pattern(PatternDetector::new(rules)),
            DetectorKind::Model => {
                Self::Model(ModelDetector::load(config.model_dir.as_deref(), rules))
            }
            DetectorKind::External => {
                let client = ProcessClient::new(
                    &config.external.program,
                    config.external.command_args(),
                    &config.external.model,
                );
                Self::External(
                    ExternalModelDetector::new(Box::new(client), rules)
                        .with_timeout(config.external.timeout()),
                )
            }
        }
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::Pattern(_) => DetectorKind::Pattern,
            Self::Model(_) => DetectorKind::Model,
            Self::External(_) => DetectorKind::External,
        }
    }

    fn inner(&self) -> &dyn Detector {
        match self {
            Self::Pattern(detector) => detector,
            Self::Model(detector) => detector,
            Self::External(detector) => detector,
        }
    }
}

impl Detector for DetectorBackend {
    fn detect_with_source(&self, text: &str) -> Detection {
        self.inner().detect_with_source(text)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}
