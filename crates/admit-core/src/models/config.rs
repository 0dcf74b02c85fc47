//! Configuration structures for an evaluation run.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{AdmitError, ConfigError};

/// String-keyed map that keeps insertion order.
///
/// Requirement categories are reported in the order they appear in the
/// configuration file, so the map must not reorder its keys.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert a value, replacing an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map with string keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Main configuration for an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Minimum credit-point total per requirement category, in report order.
    #[serde(alias = "REQUIREMENTS")]
    pub requirements: OrderedMap<f64>,

    /// Worst admissible grade (inclusive).
    #[serde(alias = "REQ_NOTE_MAX")]
    pub max_grade: f64,

    /// Portal label fragment to category, for claimed credit fields.
    #[serde(alias = "DOM_ECTS_MAP")]
    pub dom_credit_map: OrderedMap<String>,

    /// Single-column institution whitelist table.
    #[serde(alias = "WHITELIST_UNIS", skip_serializing_if = "Option::is_none")]
    pub whitelist_path: Option<PathBuf>,

    /// Two-column module to category table.
    #[serde(alias = "MODULE_MAP_CSV", skip_serializing_if = "Option::is_none")]
    pub module_map_path: Option<PathBuf>,

    /// Base directory for tables and run output.
    #[serde(alias = "RESSOURCES_DIR", skip_serializing_if = "Option::is_none")]
    pub resources_dir: Option<PathBuf>,

    /// Directory receiving downloaded archives.
    #[serde(alias = "DOWNLOAD_DIR", skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    /// Directory receiving extracted archives.
    #[serde(alias = "EXTRACT_DIR", skip_serializing_if = "Option::is_none")]
    pub extract_dir: Option<PathBuf>,

    /// Report file.
    #[serde(alias = "OUTPUT_CSV", skip_serializing_if = "Option::is_none")]
    pub output_csv: Option<PathBuf>,

    /// Module line matching.
    pub matching: MatchingConfig,

    /// Grade extraction.
    pub grading: GradingConfig,

    /// Claimed-value extraction from the applicant page.
    pub claimed: ClaimedConfig,

    /// Document discovery.
    pub documents: DocumentConfig,

    /// Text recognition backend.
    pub recognition: RecognitionConfig,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            requirements: OrderedMap::new(),
            max_grade: 2.4,
            dom_credit_map: OrderedMap::new(),
            whitelist_path: None,
            module_map_path: None,
            resources_dir: None,
            download_dir: None,
            extract_dir: None,
            output_csv: None,
            matching: MatchingConfig::default(),
            grading: GradingConfig::default(),
            claimed: ClaimedConfig::default(),
            documents: DocumentConfig::default(),
            recognition: RecognitionConfig::default(),
        }
    }
}

/// Order in which mapping keys are tried against a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    /// Longer module names first; equal lengths keep table order.
    LongestFirst,
    /// Exactly the order of the mapping table.
    Table,
}

impl Default for KeyOrder {
    fn default() -> Self {
        Self::LongestFirst
    }
}

/// Module matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Keywords per category, tried when no mapping key hits a line.
    pub fallback_keywords: OrderedMap<Vec<String>>,

    /// Number of lines searched for a credit value, starting at the match.
    pub vicinity_lines: usize,

    /// Largest credit value accepted as a module credit.
    pub max_credit_value: f64,

    /// Mapping key iteration order.
    pub key_order: KeyOrder,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        fn keywords(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }

        Self {
            fallback_keywords: [
                ("VWL", keywords(&["volkswirtschaft", "vwl", "mikroökonom", "makroökonom"])),
                ("Statistik", keywords(&["statistik", "ökonomet", "quantitative methoden"])),
                (
                    "BWL",
                    keywords(&[
                        "betriebswirtschaft",
                        "business administration",
                        "management",
                        "finanz",
                        "rechnungswesen",
                    ]),
                ),
            ]
            .into_iter()
            .collect(),
            vicinity_lines: 3,
            max_credit_value: 50.0,
            key_order: KeyOrder::default(),
        }
    }
}

/// Grade extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Labels marking the line (or the line before) holding the final grade.
    pub labels: Vec<String>,

    /// Claimed/document grade difference reported as a discrepancy.
    pub discrepancy_threshold: f64,

    /// File name fragments of documents searched for the grade first.
    pub priority_document_keywords: Vec<String>,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            labels: [
                "gesamtnote",
                "abschlussnote",
                "endnote",
                "note",
                "final grade",
                "grade",
                "overall grade",
                "gesamtergebnis",
                "endgültige note",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            discrepancy_threshold: 0.1,
            priority_document_keywords: ["zeugnis", "vpd", "certificate", "urkunde", "bachelor-zeugnis"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Claimed-value extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimedConfig {
    /// Label of the dedicated result field holding the declared grade.
    pub grade_label: String,

    /// Locators tried in order when the labelled field is absent.
    pub grade_fallback_locators: Vec<String>,

    /// Phrase shared by all "credits in category" labels.
    pub credit_label_phrase: String,
}

impl Default for ClaimedConfig {
    fn default() -> Self {
        Self {
            grade_label: "Ergebnis MZB-Note".to_string(),
            grade_fallback_locators: vec![
                "summary_result_2".to_string(),
                "summary_result_1".to_string(),
                "Abschlussnote".to_string(),
                "Gesamtnote".to_string(),
            ],
            credit_label_phrase: "CP im Bereich".to_string(),
        }
    }
}

/// Document discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// File name fragments of documents never recognized (cover sheets).
    pub excluded_name_fragments: Vec<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            excluded_name_fragments: vec!["deckblatt".to_string()],
        }
    }
}

/// Text recognition backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionEngine {
    /// Embedded PDF text layer.
    TextLayer,
    /// Rendered pages through the tesseract command.
    Tesseract,
}

impl Default for RecognitionEngine {
    fn default() -> Self {
        Self::TextLayer
    }
}

/// Text recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Backend used for all documents.
    pub engine: RecognitionEngine,

    /// DPI for rendering PDF pages to images.
    pub dpi: u32,

    /// Tesseract language list.
    pub languages: String,

    /// Tesseract page segmentation mode.
    pub page_segmentation_mode: u8,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            engine: RecognitionEngine::default(),
            dpi: 200,
            languages: "deu+eng".to_string(),
            page_segmentation_mode: 6,
        }
    }
}

/// Directories and files of a run after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    pub resources_dir: PathBuf,
    pub download_dir: PathBuf,
    pub extract_dir: PathBuf,
    pub module_map: PathBuf,
    pub output_csv: PathBuf,
}

impl AdmissionConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AdmitError::Config(ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Requirement categories in configuration order.
    pub fn categories(&self) -> Vec<String> {
        self.requirements.keys().map(str::to_string).collect()
    }

    /// Check the contract an evaluation run relies on.
    ///
    /// Tables naming unknown categories are only logged; those entries
    /// can never match and are skipped during matching.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requirements.is_empty() {
            return Err(ConfigError::NoRequirements);
        }

        for (category, value) in self.requirements.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(ConfigError::InvalidThreshold {
                    category: category.to_string(),
                    value: *value,
                });
            }
        }

        if !self.max_grade.is_finite() || self.max_grade <= 0.0 {
            return Err(ConfigError::InvalidMaxGrade(self.max_grade));
        }

        for category in self.matching.fallback_keywords.keys() {
            if !self.requirements.contains_key(category) {
                warn!("Fallback keywords for unconfigured category '{}' are ignored", category);
            }
        }

        for (label, category) in self.dom_credit_map.iter() {
            if !self.requirements.contains_key(category) {
                warn!("Page label '{}' maps to unconfigured category '{}'", label, category);
            }
        }

        Ok(())
    }

    /// Resolve run directories, filling in defaults below the resources directory.
    pub fn resolved_paths(&self) -> RunPaths {
        let resources_dir = self
            .resources_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("ressources"));
        let download_dir = self
            .download_dir
            .clone()
            .unwrap_or_else(|| resources_dir.join("downloads"));
        let extract_dir = self
            .extract_dir
            .clone()
            .unwrap_or_else(|| download_dir.join("extracted"));
        let module_map = self
            .module_map_path
            .clone()
            .unwrap_or_else(|| resources_dir.join("modul_mengen_stat_vwl_bwl.csv"));
        let output_csv = self
            .output_csv
            .clone()
            .unwrap_or_else(|| resources_dir.join("bewerber_evaluierung.csv"));

        RunPaths {
            resources_dir,
            download_dir,
            extract_dir,
            module_map,
            output_csv,
        }
    }
}
