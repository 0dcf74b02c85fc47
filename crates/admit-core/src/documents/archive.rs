//! Downloaded archives and the documents inside them.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};
use tracing::{debug, info, trace, warn};
use zip::ZipArchive;

use crate::error::DocumentError;

/// Remove everything inside `dir`, creating it when missing.
pub fn clear_directory(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return fs::create_dir_all(dir);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    trace!("Cleared {}", dir.display());
    Ok(())
}

/// Extract a ZIP archive into a fresh `target_dir`.
///
/// Entries whose path would leave the target directory are skipped.
/// Returns the number of extracted files.
pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<usize, DocumentError> {
    let archive_error = |reason: String| DocumentError::Archive {
        path: archive_path.to_path_buf(),
        reason,
    };

    if target_dir.exists() {
        fs::remove_dir_all(target_dir).map_err(|e| archive_error(e.to_string()))?;
    }
    fs::create_dir_all(target_dir).map_err(|e| archive_error(e.to_string()))?;

    let file = File::open(archive_path).map_err(|e| archive_error(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| archive_error(e.to_string()))?;
        let name = entry.name().to_string();

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!("Skipping archive entry outside target directory: {}", name);
            continue;
        };
        let out_path = target_dir.join(relative);

        let extract_error = |e: io::Error| DocumentError::Extract {
            entry: name.clone(),
            reason: e.to_string(),
        };

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(extract_error)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(extract_error)?;
        }
        let mut out = File::create(&out_path).map_err(extract_error)?;
        io::copy(&mut entry, &mut out).map_err(extract_error)?;
        extracted += 1;
    }

    info!(
        "Extracted {} files from {} to {}",
        extracted,
        archive_path.display(),
        target_dir.display()
    );
    Ok(extracted)
}

/// All PDFs below `dir`, excluding names containing any of `excluded_fragments`.
///
/// The extension is matched case-insensitively; results are sorted.
pub fn find_documents(dir: &Path, excluded_fragments: &[String]) -> Result<Vec<PathBuf>, DocumentError> {
    let pattern = format!("{}/**/*.pdf", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };

    let excluded: Vec<String> = excluded_fragments.iter().map(|f| f.to_lowercase()).collect();
    let mut documents = Vec::new();

    for entry in glob_with(&pattern, options).map_err(|e| DocumentError::Pattern(e.to_string()))? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Unreadable path while searching documents: {}", e);
                continue;
            }
        };

        if !path.is_file() {
            continue;
        }

        let name = file_name_lower(&path);
        if excluded.iter().any(|f| name.contains(f.as_str())) {
            debug!("Skipping excluded document {}", path.display());
            continue;
        }

        documents.push(path);
    }

    documents.sort();
    debug!("Found {} documents in {}", documents.len(), dir.display());
    Ok(documents)
}

/// Documents whose file name contains one of the grade-priority `keywords`.
pub fn partition_priority(documents: &[PathBuf], keywords: &[String]) -> Vec<PathBuf> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    documents
        .iter()
        .filter(|doc| {
            let name = file_name_lower(doc);
            keywords.iter().any(|k| name.contains(k.as_str()))
        })
        .cloned()
        .collect()
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
