//! Domain model: spans, rule tables, validity predicates and conflict
//! resolution.
//!
//! Nothing in here performs I/O; detectors and the pipeline build on these
//! pieces.

pub mod resolver;
pub mod rules;
pub mod span;
pub mod validation;

pub use resolver::{resolve, resolve_overlaps, AcceptedSpans};
pub use rules::{CompiledRules, PatternRule, RuleSet};
pub use span::{CharOffsets, EntityKind, Span};
