//! PII anonymization engine with consistent synthetic replacements.
//!
//! This library detects personal data (person names, email addresses,
//! organizations, ages) in free text and in documents, and replaces every
//! occurrence with a plausible synthetic value. Within one run the same
//! original always maps to the same replacement.
//!
//! # Features
//!
//! - **Pluggable detection**: regex rules, a named-entity model, or an
//!   external text-generation process, each falling back to the rules
//! - **Stable substitution**: value-keyed registry, position-safe rewriting
//! - **Documents**: plain text, DOCX and PDF extraction and reconstruction
//! - **Rule tables as data**: stop-words, first names and pools in TOML
//!
//! # Architecture
//!
//! - [`domain`]: spans, rule tables, validity predicates, conflict resolution
//! - [`detection`]: detector variants behind the [`Detector`] trait
//! - [`anonymize`]: registry, rewriter and the [`Pipeline`]
//! - [`document`]: container formats and the [`DocumentProcessor`]
//! - [`config`]: TOML configuration
//! - [`error`]: error handling
//!
//! # Quick Start
//!
//! ```
//! use anonymizer::Pipeline;
//!
//! let result = Pipeline::pattern()
//!     .with_seed(7)
//!     .anonymize("Contact Jean Dupont at jean.dupont@example.com, aged 34 ans.");
//!
//! assert!(result.success);
//! assert!(!result.anonymized_text.contains("Jean Dupont"));
//! assert_eq!(result.statistics.entities_found, 3);
//! ```
//!
//! # Documents
//!
//! ```no_run
//! use anonymizer::{DocumentProcessor, Pipeline};
//! use std::path::Path;
//!
//! let processor = DocumentProcessor::new(Pipeline::pattern());
//! let outcome = processor.process(Path::new("cv.docx"), None);
//! if let Some(path) = outcome.output {
//!     println!("written to {}", path.display());
//! }
//! ```

pub mod anonymize;
pub mod config;
pub mod detection;
pub mod document;
pub mod domain;
pub mod error;

pub use anonymize::{
    AnonymizationResult, Pipeline, RegistryEntry, ReplacementRegistry, Statistics,
};
pub use config::{AnonymizerConfig, ExternalConfig, Locale};
pub use detection::{
    Detection, Detector, DetectorBackend, DetectorKind, DetectorUsed, ExternalModelDetector,
    ModelDetector, PatternDetector,
};
pub use document::{ContainerFormat, DocumentOutcome, DocumentProcessor};
pub use domain::{CompiledRules, EntityKind, RuleSet, Span};
pub use error::{AnonymizerError, AnonymizerResult};
