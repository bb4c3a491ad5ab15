use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("cannot read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdf-extract failed: {0}")]
    Pdf(String),
    #[error("converter aborted: {0}")]
    Aborted(String),
}

/// Turns document bytes into plain text.
pub trait TextConverter: Send + Sync {
    fn convert(&self, bytes: &[u8]) -> Result<String, ConversionError>;
}

/// Native PDF text extraction via the `pdf-extract` crate.
#[derive(Debug, Default)]
pub struct PdfExtractConverter;

impl TextConverter for PdfExtractConverter {
    fn convert(&self, bytes: &[u8]) -> Result<String, ConversionError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ConversionError::Pdf(e.to_string()))
    }
}
