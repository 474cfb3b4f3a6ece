use crate::error::{IngestError, QaError};
use crate::extractor::{join_pages, PageText};
use crate::models::DocumentFingerprint;
use crate::traits::PdfExtractor;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::io::Write;
use tracing::warn;
use uuid::Uuid;

const PDF_SUFFIX: &str = ".pdf";

/// Text pulled out of one uploaded document.
#[derive(Debug, Clone)]
pub struct ExtractedUpload {
    pub fingerprint: DocumentFingerprint,
    pub text: String,
}

pub fn is_pdf_file_name(file_name: &str) -> bool {
    file_name
        .len()
        .checked_sub(PDF_SUFFIX.len())
        .and_then(|start| file_name.get(start..))
        .is_some_and(|suffix| suffix.eq_ignore_ascii_case(PDF_SUFFIX))
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Writes the upload to a scratch file, extracts its pages and removes the
/// file again on every path.
pub fn extract_upload_pages(
    extractor: &dyn PdfExtractor,
    bytes: &[u8],
) -> Result<Vec<PageText>, IngestError> {
    let mut scratch = tempfile::Builder::new()
        .prefix("qa-upload-")
        .suffix(".pdf")
        .tempfile()?;
    scratch.write_all(bytes)?;
    scratch.flush()?;

    let pages = extractor.extract_pages(scratch.path());

    let scratch_path = scratch.path().to_path_buf();
    if let Err(error) = scratch.close() {
        warn!(path = %scratch_path.display(), %error, "failed to remove scratch upload");
    }

    pages
}

/// Validates and extracts an uploaded file. Does not touch session state.
pub fn extract_upload(
    extractor: &dyn PdfExtractor,
    file_name: &str,
    bytes: &[u8],
) -> Result<ExtractedUpload, QaError> {
    if !is_pdf_file_name(file_name) {
        return Err(QaError::InvalidFileType);
    }

    let pages = extract_upload_pages(extractor, bytes)?;
    let text = join_pages(&pages);
    if text.trim().is_empty() {
        return Err(QaError::EmptyDocument);
    }

    Ok(ExtractedUpload {
        fingerprint: DocumentFingerprint {
            document_id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            checksum: digest_bytes(bytes),
            page_count: pages.len(),
            uploaded_at: Utc::now(),
        },
        text,
    })
}
