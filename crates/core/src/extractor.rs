use crate::error::IngestError;
use crate::traits::PdfExtractor;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if text.trim().is_empty() {
                debug!(page = page_no, "skipping page without text");
                continue;
            }

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(path)
}

/// Concatenates page texts in page order, each followed by a newline.
pub fn join_pages(pages: &[PageText]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|page| page.text.len() + 1).sum());
    for page in pages {
        text.push_str(&page.text);
        text.push('\n');
    }
    text
}
