//! Word documents (`.docx`).
//!
//! Blocks are the non-empty top-level paragraphs. On rebuild a paragraph
//! whose text changed loses its run structure: all runs collapse into one
//! carrying the first run's formatting. Unchanged paragraphs are untouched.

use super::{ContainerFormat, DocumentAdapter, ExtractedDocument};
use crate::error::{AnonymizerError, AnonymizerResult};
use docx_rs::{read_docx, Docx, DocumentChild, Paragraph, ParagraphChild, Run, RunChild};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxAdapter;

fn load(path: &Path) -> AnonymizerResult<Docx> {
    let bytes = std::fs::read(path).map_err(|e| AnonymizerError::io(path, e))?;
    read_docx(&bytes).map_err(|e| AnonymizerError::Extraction {
        path: path.to_path_buf(),
        reason: format!("not a readable docx package: {e}"),
    })
}

/// Concatenated text of the paragraph's runs.
pub fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

fn text_paragraphs(docx: &mut Docx) -> impl Iterator<Item = &mut Paragraph> {
    docx.document.children.iter_mut().filter_map(|child| match child {
        DocumentChild::Paragraph(paragraph) if !paragraph_text(paragraph).trim().is_empty() => {
            Some(paragraph.as_mut())
        }
        _ => None,
    })
}

fn replace_runs(paragraph: &mut Paragraph, text: &str) {
    let first = paragraph.children.iter().find_map(|child| match child {
        ParagraphChild::Run(run) => Some(run.run_property.clone()),
        _ => None,
    });
    let mut run = Run::new().add_text(text);
    if let Some(property) = first {
        run.run_property = property;
    }

    let position = paragraph
        .children
        .iter()
        .position(|child| matches!(child, ParagraphChild::Run(_)))
        .unwrap_or(paragraph.children.len());
    paragraph
        .children
        .retain(|child| !matches!(child, ParagraphChild::Run(_)));
    paragraph
        .children
        .insert(position.min(paragraph.children.len()), ParagraphChild::Run(Box::new(run)));
}

impl DocumentAdapter for DocxAdapter {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Word
    }

    fn extract(&self, path: &Path) -> AnonymizerResult<ExtractedDocument> {
        let mut docx = load(path)?;
        let blocks: Vec<String> = text_paragraphs(&mut docx)
            .map(|paragraph| paragraph_text(paragraph))
            .collect();

        Ok(ExtractedDocument {
            full_text: blocks.join("\n"),
            blocks,
        })
    }

    fn rebuild(&self, source: &Path, blocks: &[String], output: &Path) -> AnonymizerResult<()> {
        let mut docx = load(source)?;

        let mut count = 0;
        for (paragraph, block) in text_paragraphs(&mut docx).zip(blocks) {
            count += 1;
            if paragraph_text(paragraph) != *block {
                replace_runs(paragraph, block);
            }
        }
        if count != blocks.len() {
            return Err(AnonymizerError::Reconstruction {
                format: "docx".to_string(),
                reason: format!("{} blocks for {count} paragraphs", blocks.len()),
            });
        }

        let mut buf = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buf)
            .map_err(|e| AnonymizerError::Reconstruction {
                format: "docx".to_string(),
                reason: e.to_string(),
            })?;
        std::fs::write(output, buf.into_inner()).map_err(|e| AnonymizerError::io(output, e))
    }
}
