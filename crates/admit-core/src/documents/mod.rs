//! Document retrieval and text recognition.

mod archive;
mod tesseract;
mod text_layer;

pub use archive::{clear_directory, extract_archive, find_documents, partition_priority};
pub use tesseract::TesseractRecognizer;
pub use text_layer::TextLayerRecognizer;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::RecognitionError;
use crate::models::config::{RecognitionConfig, RecognitionEngine};

/// Result type for recognition operations.
pub type Result<T> = std::result::Result<T, RecognitionError>;

/// Trait for turning a document into plain text.
pub trait TextRecognizer {
    /// Short backend name for logs and summaries.
    fn name(&self) -> &str;

    /// Whether the backend can run on this machine.
    fn is_available(&self) -> bool;

    /// Recognize the text of a whole document.
    fn recognize(&self, path: &Path) -> Result<String>;
}

/// Recognizer for the configured engine.
pub fn create_recognizer(config: &RecognitionConfig) -> Box<dyn TextRecognizer> {
    match config.engine {
        RecognitionEngine::TextLayer => Box::new(TextLayerRecognizer::new()),
        RecognitionEngine::Tesseract => Box::new(TesseractRecognizer::from_config(config)),
    }
}

/// Text of one recognized document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentText {
    pub path: PathBuf,
    pub text: String,
}

/// Recognize every document, skipping the ones that fail.
pub fn recognize_all(recognizer: &dyn TextRecognizer, documents: &[PathBuf]) -> Vec<DocumentText> {
    let mut texts = Vec::with_capacity(documents.len());

    for path in documents {
        match recognizer.recognize(path) {
            Ok(text) => {
                debug!("Recognized {} chars from {}", text.len(), path.display());
                texts.push(DocumentText {
                    path: path.clone(),
                    text,
                });
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    texts
}

/// Concatenate document texts, one document per block.
pub fn join_texts(texts: &[DocumentText]) -> String {
    texts
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
