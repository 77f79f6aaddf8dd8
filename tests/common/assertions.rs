//! Custom assertions for anonymization testing.
//!
//! Provides domain-specific assertions that make tests more readable
//! and provide better error messages.

use anonymizer::{AnonymizationResult, Span};
use std::path::Path;

/// Asserts that no original survives in the output and every replacement
/// made it in.
///
/// # Panics
/// Panics on the first original still present or replacement missing.
pub fn assert_fully_anonymized(result: &AnonymizationResult) {
    assert!(result.success, "run failed: {:?}", result.error);
    for (original, replacement) in &result.mapping {
        // a synthetic value may itself contain a short original
        let masked = result
            .mapping
            .values()
            .any(|value| value.contains(original.as_str()));
        assert!(
            !result.anonymized_text.contains(original.as_str()) || masked,
            "Original '{}' should be replaced but was found in '{}'",
            original,
            result.anonymized_text
        );
        assert!(
            result.anonymized_text.contains(replacement.as_str()),
            "Replacement '{}' missing from '{}'",
            replacement,
            result.anonymized_text
        );
    }
}

/// Asserts that no two spans overlap.
///
/// # Panics
/// Panics naming the first overlapping pair.
pub fn assert_non_overlapping(spans: &[Span]) {
    for (i, a) in spans.iter().enumerate() {
        for b in &spans[i + 1..] {
            assert!(
                a.end() <= b.start() || b.end() <= a.start(),
                "Spans overlap: {:?} and {:?}",
                a,
                b
            );
        }
    }
}

/// Asserts the PDF at `path` loads and its text does not contain `pattern`.
///
/// # Panics
/// Panics if the PDF is unreadable or the pattern is still present.
pub fn assert_pdf_lacks(path: &Path, pattern: &str) {
    let text = pdf_extract::extract_text(path)
        .unwrap_or_else(|e| panic!("Failed to extract text from '{}': {}", path.display(), e));
    assert!(
        !text.contains(pattern),
        "Pattern '{}' should be anonymized but was found in '{}'",
        pattern,
        path.display()
    );
}

/// Asserts the PDF at `path` contains `pattern`.
///
/// # Panics
/// Panics if the PDF is unreadable or the pattern is absent.
pub fn assert_pdf_contains(path: &Path, pattern: &str) {
    let text = pdf_extract::extract_text(path)
        .unwrap_or_else(|e| panic!("Failed to extract text from '{}': {}", path.display(), e));
    assert!(
        text.contains(pattern),
        "Pattern '{}' should be preserved but was not found in '{}'",
        pattern,
        path.display()
    );
}
