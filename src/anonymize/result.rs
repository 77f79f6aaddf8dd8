//! Caller-facing outcome of one anonymization run.

use super::registry::{RegistryEntry, ReplacementRegistry};
use crate::detection::DetectorUsed;
use crate::domain::EntityKind;
use crate::error::{AnonymizerError, AnonymizerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts reported with every result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub entities_found: usize,
    /// Equal to `entities_found`: every registered entity is rewritten.
    pub entities_anonymized: usize,
    pub detector_used: String,
}

/// Result of anonymizing a text or a document.
///
/// Failures are values, not errors: `success` is false and `error` holds a
/// readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizationResult {
    pub success: bool,
    pub original_text: String,
    pub anonymized_text: String,
    pub mapping: BTreeMap<String, String>,
    pub kind_by_original: BTreeMap<String, EntityKind>,
    /// Registry entries in first-seen order.
    pub replacements: Vec<RegistryEntry>,
    pub statistics: Statistics,
    /// `text` or `document:<format>`.
    pub workflow: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnonymizationResult {
    pub fn completed(
        original_text: &str,
        anonymized_text: String,
        registry: &ReplacementRegistry,
        detector_used: &DetectorUsed,
        workflow: &str,
    ) -> Self {
        let replacements = registry.export();
        let mapping = replacements
            .iter()
            .map(|e| (e.original.clone(), e.replacement.clone()))
            .collect();
        let kind_by_original = replacements
            .iter()
            .map(|e| (e.original.clone(), e.kind.clone()))
            .collect();

        Self {
            success: true,
            original_text: original_text.to_string(),
            anonymized_text,
            mapping,
            kind_by_original,
            statistics: Statistics {
                entities_found: replacements.len(),
                entities_anonymized: replacements.len(),
                detector_used: detector_used.to_string(),
            },
            replacements,
            workflow: workflow.to_string(),
            error: None,
        }
    }

    pub fn failed(original_text: &str, error: &AnonymizerError, workflow: &str) -> Self {
        Self {
            success: false,
            original_text: original_text.to_string(),
            anonymized_text: String::new(),
            mapping: BTreeMap::new(),
            kind_by_original: BTreeMap::new(),
            replacements: Vec::new(),
            statistics: Statistics {
                detector_used: "none".to_string(),
                ..Statistics::default()
            },
            workflow: workflow.to_string(),
            error: Some(error.to_string()),
        }
    }

    pub fn to_json(&self) -> AnonymizerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
