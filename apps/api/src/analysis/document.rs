//! Resume document text extraction for multipart uploads.

use bytes::Bytes;
use tracing::warn;

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Returns true when the upload looks like a PDF by content type, file name or magic bytes.
pub fn is_pdf(content_type: Option<&str>, file_name: Option<&str>, data: &[u8]) -> bool {
    content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"))
        || data.starts_with(PDF_MAGIC)
}

/// Extracts plain text from an uploaded resume. PDFs are parsed off the async runtime.
pub async fn extract_resume_text(
    data: Bytes,
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<String, AppError> {
    if !is_pdf(content_type, file_name, &data) {
        return String::from_utf8(data.to_vec())
            .map_err(|_| AppError::Validation("resume must be a PDF or UTF-8 text".to_string()));
    }

    let extracted = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| {
        warn!("PDF extraction task failed: {e}");
        AppError::UnprocessableEntity("resume PDF could not be read".to_string())
    })?;

    extracted.map_err(|e| {
        warn!("PDF extraction failed: {e}");
        AppError::UnprocessableEntity("resume PDF could not be read".to_string())
    })
}
