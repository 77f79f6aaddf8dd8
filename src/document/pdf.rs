//! PDF documents.
//!
//! Text is read per page with `lopdf`; when that yields nothing the whole
//! document goes through `pdf-extract` as a single block. Output is a new
//! PDF: the original layout is not preserved. The paragraph-flow layout
//! starts every source page on a new page; if it cannot be produced the
//! plain line layout is tried before giving up.

use super::{ContainerFormat, DocumentAdapter, ExtractedDocument};
use crate::error::{AnonymizerError, AnonymizerResult};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, warn};

const A4_WIDTH: f32 = 210.0;
const A4_HEIGHT: f32 = 297.0;
const LAYER: &str = "Layer 1";

/// Page geometry and typography of generated PDFs.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLayout {
    pub margin_mm: f32,
    pub font_size: f32,
    pub line_height_mm: f32,
    pub paragraph_gap_mm: f32,
    /// Maximum characters per line.
    pub wrap_width: usize,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            margin_mm: 20.0,
            font_size: 11.0,
            line_height_mm: 5.5,
            paragraph_gap_mm: 3.0,
            wrap_width: 90,
        }
    }
}

impl PdfLayout {
    /// Fixed-size fallback layout.
    pub fn simple() -> Self {
        Self {
            margin_mm: 15.0,
            font_size: 10.0,
            line_height_mm: 4.5,
            paragraph_gap_mm: 0.0,
            wrap_width: 85,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfAdapter {
    layout: PdfLayout,
}

impl PdfAdapter {
    pub fn with_layout(layout: PdfLayout) -> Self {
        Self { layout }
    }
}

fn reconstruction(reason: impl Display) -> AnonymizerError {
    AnonymizerError::Reconstruction {
        format: "pdf".to_string(),
        reason: reason.to_string(),
    }
}

/// Non-empty page texts in page order.
fn page_texts(path: &Path) -> Vec<String> {
    let document = match lopdf::Document::load(path) {
        Ok(document) => document,
        Err(e) => {
            debug!(error = %e, "lopdf could not load document");
            return Vec::new();
        }
    };

    document
        .get_pages()
        .keys()
        .filter_map(|&number| match document.extract_text(&[number]) {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                debug!(page = number, error = %e, "page text extraction failed");
                None
            }
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Greedy word wrap; words longer than `width` are split.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(width) {
            let piece: String = piece.iter().collect();
            let piece_len = piece.chars().count();

            if current_len > 0 && current_len + 1 + piece_len > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Writes lines top to bottom, adding pages as needed.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    font: IndirectFontRef,
    layout: &'a PdfLayout,
    layer: PdfLayerReference,
    y: f32,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference, layer: PdfLayerReference, layout: &'a PdfLayout) -> AnonymizerResult<Self> {
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(reconstruction)?;
        Ok(Self {
            doc,
            font,
            layout,
            layer,
            y: A4_HEIGHT - layout.margin_mm,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(A4_WIDTH), Mm(A4_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = A4_HEIGHT - self.layout.margin_mm;
    }

    fn line(&mut self, text: &str) {
        if self.y < self.layout.margin_mm {
            self.new_page();
        }
        self.layer.use_text(
            text,
            self.layout.font_size,
            Mm(self.layout.margin_mm),
            Mm(self.y),
            &self.font,
        );
        self.y -= self.layout.line_height_mm;
    }

    fn gap(&mut self) {
        self.y -= self.layout.paragraph_gap_mm;
    }
}

/// Paragraph flow: each block on fresh pages, blank lines as paragraph gaps.
pub fn render_structured(blocks: &[String], layout: &PdfLayout) -> AnonymizerResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new("Anonymized document", Mm(A4_WIDTH), Mm(A4_HEIGHT), LAYER);
    let first = doc.get_page(page).get_layer(layer);
    {
        let mut writer = PageWriter::new(&doc, first, layout)?;
        for (index, block) in blocks.iter().enumerate() {
            if index > 0 {
                writer.new_page();
            }
            for line in block.lines() {
                if line.trim().is_empty() {
                    writer.gap();
                    continue;
                }
                for wrapped in wrap_line(line, layout.wrap_width) {
                    writer.line(&wrapped);
                }
            }
        }
    }
    doc.save_to_bytes().map_err(reconstruction)
}

/// Plain line layout over the joined blocks.
pub fn render_simple(blocks: &[String], layout: &PdfLayout) -> AnonymizerResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new("Anonymized document", Mm(A4_WIDTH), Mm(A4_HEIGHT), LAYER);
    let first = doc.get_page(page).get_layer(layer);
    {
        let mut writer = PageWriter::new(&doc, first, layout)?;
        for line in blocks.join("\n\n").lines() {
            let wrapped = wrap_line(line, layout.wrap_width);
            if wrapped.is_empty() {
                writer.line("");
            }
            for piece in wrapped {
                writer.line(&piece);
            }
        }
    }
    doc.save_to_bytes().map_err(reconstruction)
}

impl DocumentAdapter for PdfAdapter {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Pdf
    }

    fn extract(&self, path: &Path) -> AnonymizerResult<ExtractedDocument> {
        let mut blocks = page_texts(path);

        if blocks.is_empty() {
            let text = pdf_extract::extract_text(path).map_err(|e| AnonymizerError::Extraction {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            let text = text.trim();
            if text.is_empty() {
                return Err(AnonymizerError::Extraction {
                    path: path.to_path_buf(),
                    reason: "no extractable text".to_string(),
                });
            }
            blocks.push(text.to_string());
        }

        Ok(ExtractedDocument {
            full_text: blocks.join("\n\n"),
            blocks,
        })
    }

    fn rebuild(&self, _source: &Path, blocks: &[String], output: &Path) -> AnonymizerResult<()> {
        let bytes = match render_structured(blocks, &self.layout) {
            Ok(bytes) => bytes,
            Err(structured) => {
                warn!(error = %structured, "structured PDF layout failed, using simple layout");
                render_simple(blocks, &PdfLayout::simple()).map_err(|simple| {
                    reconstruction(format!("structured: {structured}; simple: {simple}"))
                })?
            }
        };
        std::fs::write(output, bytes).map_err(|e| AnonymizerError::io(output, e))
    }
}
