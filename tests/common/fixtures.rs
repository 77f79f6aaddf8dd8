//! Test fixtures and document builders.

use anyhow::Result;
use docx_rs::{Docx, Paragraph, Run};
use printpdf::*;
use std::fs;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

/// The canonical contact sentence used across tests.
pub const CONTACT_TEXT: &str = "Contact Jean Dupont at jean.dupont@example.com, aged 34 ans.";

/// Builder for test PDFs, one page per `with_page` call.
///
/// # Example
///
/// ```no_run
/// # use std::path::Path;
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// TestPdfBuilder::new()
///     .with_page(&["Contact Jean Dupont", "jean.dupont@example.com"])
///     .with_page(&["Second page"])
///     .build(Path::new("/tmp/test.pdf"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestPdfBuilder {
    pages: Vec<Vec<String>>,
}

impl TestPdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page with the given lines.
    pub fn with_page(mut self, lines: &[&str]) -> Self {
        self.pages
            .push(lines.iter().map(|line| line.to_string()).collect());
        self
    }

    /// Builds the PDF and writes it to the specified path.
    pub fn build(self, output_path: &Path) -> Result<PathBuf> {
        let (doc, page1, layer1) = PdfDocument::new("Test Document", Mm(210.0), Mm(297.0), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        for (index, lines) in self.pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(page1).get_layer(layer1)
            } else {
                let (page, layer) = doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
                doc.get_page(page).get_layer(layer)
            };
            for (row, line) in lines.iter().enumerate() {
                layer.use_text(line.as_str(), 12.0, Mm(20.0), Mm(270.0 - 8.0 * row as f32), &font);
            }
        }

        doc.save(&mut BufWriter::new(fs::File::create(output_path)?))?;
        Ok(output_path.to_path_buf())
    }
}

/// Writes a DOCX with one paragraph per entry; an entry's runs are given as a
/// slice so tests can split text across runs. Empty slices give empty
/// paragraphs.
pub fn create_docx(path: &Path, paragraphs: &[&[&str]]) -> Result<PathBuf> {
    let mut docx = Docx::new();
    for runs in paragraphs {
        let mut paragraph = Paragraph::new();
        for (i, text) in runs.iter().enumerate() {
            let run = Run::new().add_text(*text);
            paragraph = paragraph.add_run(if i == 0 { run.bold() } else { run });
        }
        docx = docx.add_paragraph(paragraph);
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf)?;
    fs::write(path, buf.into_inner())?;
    Ok(path.to_path_buf())
}

/// Reads paragraph texts back out of a DOCX.
pub fn read_docx_paragraphs(path: &Path) -> Result<Vec<String>> {
    let docx = docx_rs::read_docx(&fs::read(path)?)?;
    Ok(docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            docx_rs::DocumentChild::Paragraph(p) => Some(anonymizer::document::docx::paragraph_text(p)),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect())
}

/// Writes a plain text file.
pub fn create_text_file(path: &Path, content: &str) -> Result<PathBuf> {
    fs::write(path, content)?;
    Ok(path.to_path_buf())
}

/// A minimal model directory with a French lexicon.
pub fn create_model_dir(dir: &Path) -> Result<PathBuf> {
    let model_dir = dir.join("models");
    fs::create_dir_all(&model_dir)?;
    fs::write(
        model_dir.join("fr.toml"),
        r#"
language = "fr"

[[entries]]
text = "Holokia"
label = "ORG"

[[entries]]
text = "Technopark Casablanca"
label = "PER"

[[patterns]]
pattern = "\\b\\p{Lu}\\p{Ll}+ \\p{Lu}\\p{Ll}+\\b"
label = "PER"
"#,
    )?;
    Ok(model_dir)
}
