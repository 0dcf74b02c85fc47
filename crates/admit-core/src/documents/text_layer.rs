//! Text extraction from the embedded PDF text layer using lopdf and pdf-extract.

use std::path::Path;

use lopdf::Document;
use tracing::debug;

use super::{Result, TextRecognizer};
use crate::error::RecognitionError;

/// Reads the text a PDF already carries. Scanned documents yield little or
/// no text with this backend.
#[derive(Debug, Default)]
pub struct TextLayerRecognizer;

impl TextLayerRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from PDF bytes, decrypting empty-password documents.
    pub fn extract_from_bytes(&self, data: &[u8]) -> Result<String> {
        let mut doc = Document::load_mem(data).map_err(|e| RecognitionError::Parse(e.to_string()))?;

        let page_count = doc.get_pages().len();
        let text = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(RecognitionError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| RecognitionError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            pdf_extract::extract_text_from_mem(&decrypted)
        } else {
            pdf_extract::extract_text_from_mem(data)
        }
        .map_err(|e| RecognitionError::Engine(e.to_string()))?;

        debug!("Extracted {} chars from {} pages", text.len(), page_count);
        Ok(text)
    }
}

impl TextRecognizer for TextLayerRecognizer {
    fn name(&self) -> &str {
        "text-layer"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, path: &Path) -> Result<String> {
        let data = std::fs::read(path)
            .map_err(|e| RecognitionError::Parse(format!("{}: {}", path.display(), e)))?;
        self.extract_from_bytes(&data)
    }
}
