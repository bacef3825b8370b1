//! Document rendering: lay the final transcript out as a paginated PDF.
//!
//! The writer builds the document object by object with `pdf-writer`, so
//! there is no external PDF toolkit to install. Text is set in the builtin
//! Helvetica base font.

use std::fs;
use std::path::Path;

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};
use tracing::info;

use crate::chunk::split_chunks;
use crate::error::Vid2TextError;

// A4 in points (1/72 inch).
const PAGE_WIDTH_PT: f32 = 595.0;
const PAGE_HEIGHT_PT: f32 = 842.0;
const MARGIN_PT: f32 = 54.0;
const FONT_SIZE_PT: f32 = 11.0;
const LEADING_PT: f32 = 14.0;
const FONT_NAME: &[u8] = b"F1";

/// Fits Helvetica at 11pt inside the margins for average text.
const MAX_CHARS_PER_LINE: usize = 86;
const LINES_PER_PAGE: usize = 52;

/// Writes the final transcript to disk as a document.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, text: &str, path: &Path) -> Result<(), Vid2TextError>;
}

/// Production renderer producing a paginated A4 PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn render(&self, text: &str, path: &Path) -> Result<(), Vid2TextError> {
        let lines = layout_lines(text, MAX_CHARS_PER_LINE);
        let pages: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();

        let mut pdf = Pdf::new();
        let mut ref_counter = std::iter::successors(Some(1), |n| Some(n + 1));
        let catalog_ref = Ref::new(ref_counter.next().unwrap());
        let page_tree_ref = Ref::new(ref_counter.next().unwrap());
        let font_ref = Ref::new(ref_counter.next().unwrap());

        pdf.catalog(catalog_ref).pages(page_tree_ref);
        pdf.type1_font(font_ref).base_font(Name(b"Helvetica"));

        let page_refs: Vec<Ref> = pages
            .iter()
            .map(|_| Ref::new(ref_counter.next().unwrap()))
            .collect();

        for (page_ref, page_lines) in page_refs.iter().zip(&pages) {
            let content_ref = Ref::new(ref_counter.next().unwrap());

            let mut page = pdf.page(*page_ref);
            page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH_PT, PAGE_HEIGHT_PT));
            page.parent(page_tree_ref);
            page.contents(content_ref);
            let mut resources = page.resources();
            resources.fonts().pair(Name(FONT_NAME), font_ref);
            resources.finish();
            page.finish();

            let mut content = Content::new();
            content.begin_text();
            content.set_font(Name(FONT_NAME), FONT_SIZE_PT);
            let mut y = PAGE_HEIGHT_PT - MARGIN_PT;
            for line in *page_lines {
                y -= LEADING_PT;
                if line.is_empty() {
                    continue;
                }
                let bytes = encode_text(line);
                content.set_text_matrix([1.0, 0.0, 0.0, 1.0, MARGIN_PT, y]);
                content.show(Str(&bytes));
            }
            content.end_text();
            pdf.stream(content_ref, &content.finish());
        }

        pdf.pages(page_tree_ref)
            .kids(page_refs)
            .count(pages.len() as i32);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Vid2TextError::RenderFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }
        info!(path = %path.display(), pages = pages.len(), "writing document");
        fs::write(path, pdf.finish()).map_err(|e| Vid2TextError::RenderFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

/// Break the transcript into display lines: paragraphs wrap at word
/// boundaries, blank lines survive as paragraph gaps.
fn layout_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for logical in text.split('\n') {
        if logical.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.extend(
            split_chunks(logical, width)
                .into_iter()
                .filter(|line| !line.is_empty()),
        );
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// TODO: embed a TrueType font so non-ASCII OCR output survives; the builtin
// Helvetica encoding covers ASCII only.
fn encode_text(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c {
            '\t' => b' ',
            c if c.is_ascii_graphic() || c == ' ' => c as u8,
            _ => b'?',
        })
        .collect()
}
