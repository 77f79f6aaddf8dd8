//! Container formats: text extraction and reconstruction.
//!
//! A document is flattened into one full text for detection, so the registry
//! sees every entity once. The resulting mapping is then reapplied to each
//! block separately and the blocks are written back into a container of the
//! same format.

pub mod docx;
pub mod pdf;
pub mod text;

pub use self::docx::DocxAdapter;
pub use self::pdf::PdfAdapter;
pub use self::text::TextAdapter;

use crate::anonymize::{apply_mapping, AnonymizationResult, Pipeline};
use crate::error::{AnonymizerError, AnonymizerResult};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extensions accepted by [`ContainerFormat::from_path`], for messages.
pub const SUPPORTED_FORMATS: &str = ".txt, .pdf, .docx";

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    PlainText,
    Word,
    Pdf,
}

impl ContainerFormat {
    /// Detects the format from the file extension (case-insensitive).
    ///
    /// `.doc` is accepted by name; the bytes still have to be a docx package.
    pub fn from_path(path: &Path) -> AnonymizerResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => Ok(Self::PlainText),
            "docx" | "doc" => Ok(Self::Word),
            "pdf" => Ok(Self::Pdf),
            other => Err(AnonymizerError::UnsupportedInput {
                kind: if other.is_empty() {
                    "(no extension)".to_string()
                } else {
                    format!(".{other}")
                },
                supported: SUPPORTED_FORMATS.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::Word => "docx",
            Self::Pdf => "pdf",
        }
    }

    pub fn adapter(&self) -> Box<dyn DocumentAdapter> {
        match self {
            Self::PlainText => Box::new(TextAdapter),
            Self::Word => Box::new(DocxAdapter),
            Self::Pdf => Box::new(PdfAdapter::default()),
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text pulled out of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Flattened text the detector runs on.
    pub full_text: String,
    /// Per-container units (paragraphs, pages) in document order.
    pub blocks: Vec<String>,
}

/// Extraction and reconstruction for one container format.
pub trait DocumentAdapter: Send + Sync {
    fn format(&self) -> ContainerFormat;

    fn extract(&self, path: &Path) -> AnonymizerResult<ExtractedDocument>;

    /// Writes `blocks` (same count and order as extracted) to `output`.
    /// `source` is the original file, for formats that keep its structure.
    fn rebuild(&self, source: &Path, blocks: &[String], output: &Path) -> AnonymizerResult<()>;
}

/// `<dir>/<stem>_anonymized.<ext>` next to `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{stem}_anonymized.{}", ext.to_string_lossy()),
        None => format!("{stem}_anonymized"),
    };
    input.with_file_name(name)
}

/// Outcome of processing one file.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub result: AnonymizationResult,
    /// Written file, when the run succeeded.
    pub output: Option<PathBuf>,
}

/// Runs a [`Pipeline`] over files.
#[derive(Debug, Default)]
pub struct DocumentProcessor {
    pipeline: Pipeline,
}

impl DocumentProcessor {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Extracts the full text of a supported file.
    pub fn extract_text(&self, input: &Path) -> AnonymizerResult<String> {
        let format = ContainerFormat::from_path(input)?;
        ensure_exists(input)?;
        Ok(format.adapter().extract(input)?.full_text)
    }

    /// Anonymizes `input` into `output` (or the default output path).
    ///
    /// Never fails: every error ends up in a result with `success == false`.
    pub fn process(&self, input: &Path, output: Option<&Path>) -> DocumentOutcome {
        match self.try_process(input, output) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(input = %input.display(), error = %e, "document processing failed");
                let workflow = match ContainerFormat::from_path(input) {
                    Ok(format) => format!("document:{format}"),
                    Err(_) => "document".to_string(),
                };
                DocumentOutcome {
                    result: AnonymizationResult::failed("", &e, &workflow),
                    output: None,
                }
            }
        }
    }

    pub fn try_process(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> AnonymizerResult<DocumentOutcome> {
        let format = ContainerFormat::from_path(input)?;
        ensure_exists(input)?;
        let adapter = format.adapter();

        let document = adapter.extract(input)?;
        let mut registry = self.pipeline.new_registry();
        let run = self.pipeline.run(&document.full_text, &mut registry)?;

        let blocks: Vec<String> = document
            .blocks
            .iter()
            .map(|block| apply_mapping(block, registry.pairs()))
            .collect();

        let output = output.map_or_else(|| default_output_path(input), Path::to_path_buf);
        adapter.rebuild(input, &blocks, &output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            format = %format,
            entities = registry.len(),
            "document anonymized"
        );

        let result = AnonymizationResult::completed(
            &document.full_text,
            run.anonymized_text,
            &registry,
            &run.detector_used,
            &format!("document:{format}"),
        );
        Ok(DocumentOutcome {
            result,
            output: Some(output),
        })
    }
}

fn ensure_exists(input: &Path) -> AnonymizerResult<()> {
    if input.is_file() {
        Ok(())
    } else {
        Err(AnonymizerError::io(
            input,
            std::io::Error::new(std::io::ErrorKind::NotFound, "input file does not exist"),
        ))
    }
}
