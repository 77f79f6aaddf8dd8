//! Plain UTF-8 text files.

use super::{ContainerFormat, DocumentAdapter, ExtractedDocument};
use crate::error::{AnonymizerError, AnonymizerResult};
use std::path::Path;

/// The whole file is one block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAdapter;

impl DocumentAdapter for TextAdapter {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::PlainText
    }

    fn extract(&self, path: &Path) -> AnonymizerResult<ExtractedDocument> {
        let bytes = std::fs::read(path).map_err(|e| AnonymizerError::io(path, e))?;
        let full_text = String::from_utf8(bytes).map_err(|e| AnonymizerError::Extraction {
            path: path.to_path_buf(),
            reason: format!("not valid UTF-8: {e}"),
        })?;

        Ok(ExtractedDocument {
            blocks: vec![full_text.clone()],
            full_text,
        })
    }

    fn rebuild(&self, _source: &Path, blocks: &[String], output: &Path) -> AnonymizerResult<()> {
        std::fs::write(output, blocks.concat()).map_err(|e| AnonymizerError::io(output, e))
    }
}
