//! OCR of rendered PDF pages through the `pdftoppm` and `tesseract` commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace, warn};

use super::{Result, TextRecognizer};
use crate::error::RecognitionError;
use crate::models::config::RecognitionConfig;

/// Renders every page with poppler and recognizes it with tesseract.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    dpi: u32,
    languages: String,
    page_segmentation_mode: u8,
}

impl TesseractRecognizer {
    pub fn new(dpi: u32, languages: impl Into<String>, page_segmentation_mode: u8) -> Self {
        Self {
            dpi,
            languages: languages.into(),
            page_segmentation_mode,
        }
    }

    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self::new(config.dpi, config.languages.clone(), config.page_segmentation_mode)
    }

    fn render_pages(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = out_dir.join("page");
        let output = Command::new("pdftoppm")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| RecognitionError::Unavailable(format!("pdftoppm failed to start: {}", e)))?;

        if !output.status.success() {
            return Err(RecognitionError::Render(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mut pages: Vec<PathBuf> = fs::read_dir(out_dir)
            .map_err(|e| RecognitionError::Render(e.to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png")))
            .collect();
        // pdftoppm zero-pads page numbers, so name order is page order.
        pages.sort();

        debug!("Rendered {} pages of {}", pages.len(), pdf.display());
        Ok(pages)
    }

    fn recognize_page(&self, image: &Path) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .output()
            .map_err(|e| RecognitionError::Unavailable(format!("tesseract failed to start: {}", e)))?;

        if !output.status.success() {
            return Err(RecognitionError::Engine(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn command_runs(program: &str, arg: &str) -> bool {
    Command::new(program).arg(arg).output().is_ok()
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        command_runs("tesseract", "--version") && command_runs("pdftoppm", "-v")
    }

    fn recognize(&self, path: &Path) -> Result<String> {
        let work_dir = tempfile::tempdir().map_err(|e| RecognitionError::Render(e.to_string()))?;
        let pages = self.render_pages(path, work_dir.path())?;

        let mut texts = Vec::with_capacity(pages.len());
        for (idx, page) in pages.iter().enumerate() {
            match self.recognize_page(page) {
                Ok(text) => {
                    trace!("Page {} of {}: {} chars", idx + 1, path.display(), text.len());
                    texts.push(text);
                }
                Err(e) => warn!("OCR failed for page {} of {}: {}", idx + 1, path.display(), e),
            }
        }

        Ok(texts.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = RecognitionConfig::default();
        let recognizer = TesseractRecognizer::from_config(&config);
        assert_eq!(recognizer.dpi, 200);
        assert_eq!(recognizer.languages, "deu+eng");
        assert_eq!(recognizer.page_segmentation_mode, 6);
    }

    #[test]
    fn test_missing_command_is_unavailable() {
        assert!(!command_runs("admit-no-such-command-4711", "--version"));
    }
}
