//! Module mapping and institution whitelist tables.
//!
//! Both tables are loaded once per run and shared read-only by every
//! applicant evaluation.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::models::config::KeyOrder;

const MODULE_COLUMNS: [&str; 2] = ["module", "modul"];
const CATEGORY_COLUMNS: [&str; 2] = ["category", "kategorie"];

/// Module-name fragment to requirement category, keys lowercased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleMapping {
    entries: Vec<(String, String)>,
}

impl ModuleMapping {
    /// Build a mapping from `(module, category)` pairs.
    ///
    /// Keys are trimmed and lowercased; a repeated key keeps its first
    /// position and takes the last category, as a table lookup would.
    pub fn from_entries<I, K, C>(entries: I, order: KeyOrder) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: AsRef<str>,
        C: AsRef<str>,
    {
        let mut mapping: Vec<(String, String)> = Vec::new();

        for (key, category) in entries {
            let key = key.as_ref().trim().to_lowercase();
            let category = category.as_ref().trim().to_string();
            if key.is_empty() || category.is_empty() {
                continue;
            }

            match mapping.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = category,
                None => mapping.push((key, category)),
            }
        }

        if order == KeyOrder::LongestFirst {
            // Stable sort keeps table order among keys of equal length.
            mapping.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        }

        Self { entries: mapping }
    }

    /// Load the mapping table.
    ///
    /// The table needs a header row with a `module`/`modul` and a
    /// `category`/`Kategorie` column. A missing file yields an empty
    /// mapping, leaving only the fallback keywords to match.
    pub fn load(path: &Path, order: KeyOrder) -> Result<Self, CatalogError> {
        if !path.exists() {
            warn!("Module mapping file not found: {}", path.display());
            return Ok(Self::default());
        }

        let read_error = |source: csv::Error| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(read_error)?;

        let headers = reader.headers().map_err(read_error)?.clone();
        let find_column = |names: &[&str]| -> Option<usize> {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(n)))
        };

        let module_idx = find_column(&MODULE_COLUMNS[..]).ok_or_else(|| CatalogError::MissingColumn {
            path: path.to_path_buf(),
            expected: MODULE_COLUMNS.join(", "),
        })?;
        let category_idx = find_column(&CATEGORY_COLUMNS[..]).ok_or_else(|| CatalogError::MissingColumn {
            path: path.to_path_buf(),
            expected: CATEGORY_COLUMNS.join(", "),
        })?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_error)?;
            if let (Some(module), Some(category)) = (record.get(module_idx), record.get(category_idx)) {
                rows.push((module.to_string(), category.to_string()));
            }
        }

        let mapping = Self::from_entries(rows, order);
        info!("Loaded module mapping with {} entries from {}", mapping.len(), path.display());
        Ok(mapping)
    }

    /// Entries in matching order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }

    /// First key contained in `line_lower` whose category is accepted.
    pub fn find<'a>(&'a self, line_lower: &str, accepts: impl Fn(&str) -> bool) -> Option<(&'a str, &'a str)> {
        self.entries()
            .find(|(key, category)| line_lower.contains(key) && accepts(category))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Institution names whose graduates are admitted without evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Whitelist {
    entries: Vec<String>,
}

impl Whitelist {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim().to_lowercase();
            if !entry.is_empty() && !list.contains(&entry) {
                list.push(entry);
            }
        }
        Self { entries: list }
    }

    /// Load the whitelist table; the header row is skipped and only the
    /// first column is read. No path means an empty whitelist.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let Some(path) = path else {
            info!("No whitelist configured");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Whitelist file not found: {}", path.display());
            return Ok(Self::default());
        }

        let read_error = |source: csv::Error| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(read_error)?;

        let mut names = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_error)?;
            if let Some(name) = record.get(0) {
                names.push(name.to_string());
            }
        }

        let whitelist = Self::from_entries(names);
        info!("Loaded whitelist with {} entries", whitelist.len());
        Ok(whitelist)
    }

    /// The first entry found in `text`, compared case-insensitively.
    pub fn check(&self, text: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }

        let lower = text.to_lowercase();
        let hit = self.entries.iter().find(|entry| lower.contains(entry.as_str()));
        if let Some(entry) = hit {
            debug!("Whitelist entry '{}' found in document text", entry);
        }
        hit.map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_mapping_longest_first() {
        let mapping = ModuleMapping::from_entries(
            [("Statistik", "Statistik"), ("Statistik II", "VWL"), ("Markt", "BWL")],
            KeyOrder::LongestFirst,
        );
        let keys: Vec<&str> = mapping.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["statistik ii", "statistik", "markt"]);
        assert_eq!(mapping.find("statistik ii 6 cp", |_| true), Some(("statistik ii", "VWL")));
    }

    #[test]
    fn test_mapping_table_order() {
        let mapping = ModuleMapping::from_entries(
            [("Statistik", "Statistik"), ("Statistik II", "VWL")],
            KeyOrder::Table,
        );
        assert_eq!(mapping.find("statistik ii", |_| true), Some(("statistik", "Statistik")));
    }

    #[test]
    fn test_mapping_skips_rejected_categories() {
        let mapping = ModuleMapping::from_entries(
            [("marketing", "Marketing"), ("market", "BWL")],
            KeyOrder::LongestFirst,
        );
        assert_eq!(mapping.find("marketing i", |c| c == "BWL"), Some(("market", "BWL")));
        assert_eq!(mapping.find("recht", |_| true), None);
    }

    #[test]
    fn test_load_mapping_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping.csv");
        fs::write(
            &path,
            "modul,Kategorie\nMikroökonomie 1,VWL\n Deskriptive Statistik ,Statistik\n,BWL\n",
        )
        .unwrap();

        let mapping = ModuleMapping::load(&path, KeyOrder::Table).unwrap();
        let entries: Vec<(&str, &str)> = mapping.entries().collect();
        assert_eq!(
            entries,
            vec![("mikroökonomie 1", "VWL"), ("deskriptive statistik", "Statistik")]
        );
    }

    #[test]
    fn test_load_mapping_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping.csv");
        fs::write(&path, "name,bucket\nx,y\n").unwrap();

        let err = ModuleMapping::load(&path, KeyOrder::Table).unwrap_err();
        assert!(matches!(err, CatalogError::MissingColumn { .. }));
    }

    #[test]
    fn test_load_mapping_missing_file() {
        let dir = TempDir::new().unwrap();
        let mapping = ModuleMapping::load(&dir.path().join("absent.csv"), KeyOrder::Table).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_whitelist_load_and_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unis.csv");
        fs::write(&path, "Universität\nMusteruniversität\n\nTU Beispiel,extra\n").unwrap();

        let whitelist = Whitelist::load(Some(&path)).unwrap();
        assert_eq!(whitelist.len(), 2);
        assert_eq!(
            whitelist.check("Zeugnis der MUSTERUNIVERSITÄT Beispielstadt"),
            Some("musteruniversität")
        );
        assert_eq!(whitelist.check("Hochschule Irgendwo"), None);
    }

    #[test]
    fn test_empty_whitelist_never_matches() {
        let whitelist = Whitelist::load(None).unwrap();
        assert!(whitelist.is_empty());
        assert_eq!(whitelist.check("anything"), None);
    }
}
