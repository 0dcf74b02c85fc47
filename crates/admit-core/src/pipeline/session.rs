//! Interactive portal session and its offline directory implementation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SessionError;
use crate::evaluation::claimed::PageSnapshot;
use crate::evaluation::rules::patterns::APPLICANT_NUMBER;

/// An applicant row of the portal's result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantRef {
    /// Position in the result list, starting at zero.
    pub index: usize,
    /// Applicant number shown in the list row, if any.
    pub list_number: Option<String>,
    /// Session-specific handle used to open the applicant.
    pub handle: String,
}

/// Browser-side collaborator driving the applicant portal.
pub trait InteractiveSession {
    /// Candidate rows of the result list, in list order.
    fn list_applicants(&mut self) -> Result<Vec<ApplicantRef>, SessionError>;

    /// Open the detail page of an applicant and capture its fields.
    fn open_applicant(&mut self, applicant: &ApplicantRef) -> Result<PageSnapshot, SessionError>;

    /// Download the applicant's document archive into `download_dir`.
    ///
    /// `None` when the applicant has no documents.
    fn download_documents(
        &mut self,
        applicant: &ApplicantRef,
        download_dir: &Path,
    ) -> Result<Option<PathBuf>, SessionError>;

    /// Return to the result list.
    fn close_applicant(&mut self, applicant: &ApplicantRef) -> Result<(), SessionError>;
}

const PAGE_FILE: &str = "page.json";

/// Session over a directory with one sub-directory per applicant.
///
/// Each applicant directory may hold a `page.json` page snapshot and one or
/// more `*.zip` document archives; the last archive by name is the one
/// "downloaded".
pub struct DirectorySession {
    root: PathBuf,
}

impl DirectorySession {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn applicant_dir(&self, applicant: &ApplicantRef) -> PathBuf {
        self.root.join(&applicant.handle)
    }
}

impl InteractiveSession for DirectorySession {
    fn list_applicants(&mut self) -> Result<Vec<ApplicantRef>, SessionError> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| SessionError::Listing(format!("{}: {}", self.root.display(), e)))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        let applicants: Vec<ApplicantRef> = names
            .into_iter()
            .enumerate()
            .map(|(index, handle)| ApplicantRef {
                index,
                list_number: APPLICANT_NUMBER.captures(&handle).map(|caps| caps[1].to_string()),
                handle,
            })
            .collect();

        info!("Found {} applicants in {}", applicants.len(), self.root.display());
        Ok(applicants)
    }

    fn open_applicant(&mut self, applicant: &ApplicantRef) -> Result<PageSnapshot, SessionError> {
        let dir = self.applicant_dir(applicant);
        let open_error = |reason: String| SessionError::Open {
            applicant: applicant.handle.clone(),
            reason,
        };

        if !dir.is_dir() {
            return Err(open_error(format!("{} is not a directory", dir.display())));
        }

        let page_path = dir.join(PAGE_FILE);
        if !page_path.exists() {
            debug!("No page snapshot for {}", applicant.handle);
            return Ok(PageSnapshot::default());
        }

        let content = fs::read_to_string(&page_path).map_err(|e| open_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| open_error(format!("{}: {}", page_path.display(), e)))
    }

    fn download_documents(
        &mut self,
        applicant: &ApplicantRef,
        download_dir: &Path,
    ) -> Result<Option<PathBuf>, SessionError> {
        let dir = self.applicant_dir(applicant);
        let entries = fs::read_dir(&dir).map_err(|e| SessionError::Download(e.to_string()))?;

        let archive = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip")))
            .max();

        let Some(archive) = archive else {
            return Ok(None);
        };

        let file_name = archive
            .file_name()
            .ok_or_else(|| SessionError::Download(format!("invalid archive path {}", archive.display())))?;
        fs::create_dir_all(download_dir).map_err(|e| SessionError::Download(e.to_string()))?;
        let target = download_dir.join(file_name);
        fs::copy(&archive, &target).map_err(|e| SessionError::Download(e.to_string()))?;

        debug!("Downloaded {} for {}", target.display(), applicant.handle);
        Ok(Some(target))
    }

    fn close_applicant(&mut self, _applicant: &ApplicantRef) -> Result<(), SessionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_list_applicants() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("b-1234567")).unwrap();
        fs::create_dir_all(root.path().join("a_draft")).unwrap();
        fs::write(root.path().join("readme.txt"), "x").unwrap();

        let mut session = DirectorySession::new(root.path());
        let applicants = session.list_applicants().unwrap();
        assert_eq!(
            applicants,
            vec![
                ApplicantRef {
                    index: 0,
                    list_number: None,
                    handle: "a_draft".to_string(),
                },
                ApplicantRef {
                    index: 1,
                    list_number: Some("1234567".to_string()),
                    handle: "b-1234567".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_open_and_download() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("1234567");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("page.json"), r#"{"applicant_number": "1234567"}"#).unwrap();
        fs::write(dir.join("docs_2023.zip"), "old").unwrap();
        fs::write(dir.join("docs_2024.zip"), "new").unwrap();

        let mut session = DirectorySession::new(root.path());
        let applicant = session.list_applicants().unwrap().remove(0);

        let page = session.open_applicant(&applicant).unwrap();
        assert_eq!(page.applicant_number.as_deref(), Some("1234567"));

        let downloads = root.path().join("downloads");
        let archive = session.download_documents(&applicant, &downloads).unwrap().unwrap();
        assert_eq!(archive, downloads.join("docs_2024.zip"));
        assert_eq!(fs::read_to_string(archive).unwrap(), "new");
    }

    #[test]
    fn test_missing_page_and_archive() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("99999")).unwrap();

        let mut session = DirectorySession::new(root.path());
        let applicant = session.list_applicants().unwrap().remove(0);
        assert_eq!(session.open_applicant(&applicant).unwrap(), PageSnapshot::default());
        assert_eq!(
            session.download_documents(&applicant, &root.path().join("dl")).unwrap(),
            None
        );
    }

    #[test]
    fn test_invalid_page_snapshot() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("55555");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("page.json"), "{not json").unwrap();

        let mut session = DirectorySession::new(root.path());
        let applicant = session.list_applicants().unwrap().remove(0);
        assert!(matches!(
            session.open_applicant(&applicant),
            Err(SessionError::Open { .. })
        ));
    }
}
