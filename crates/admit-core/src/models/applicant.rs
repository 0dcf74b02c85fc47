//! Per-applicant data models produced by an evaluation run.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::OrderedMap;

/// Credit-point totals per requirement category, in configuration order.
pub type CategorySums = OrderedMap<f64>;

impl OrderedMap<f64> {
    /// A zero total for every category.
    pub fn zeroed<S: AsRef<str>>(categories: &[S]) -> Self {
        categories.iter().map(|c| (c.as_ref(), 0.0)).collect()
    }

    /// Add to a category total. Unknown categories are ignored.
    pub fn add(&mut self, category: &str, value: f64) {
        if let Some(current) = self.get(category).copied() {
            self.insert(category, current + value);
        }
    }

    /// Value of a category, zero when absent.
    pub fn value(&self, category: &str) -> f64 {
        self.get(category).copied().unwrap_or(0.0)
    }

    /// Every total rounded to two decimals.
    pub fn rounded(&self) -> Self {
        self.iter().map(|(k, v)| (k, round2(*v))).collect()
    }
}

/// Round to two decimals, the precision of all persisted credit totals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render a number the way it appears in reasons and reports (`6.0`, `2.35`).
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}

/// Outcome of an applicant evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// Grade and every credit requirement met.
    Satisfied,
    /// At least one failing reason.
    NotSatisfied,
    /// Institution on the whitelist; nothing else evaluated.
    WhitelistAdmitted,
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Satisfied => write!(f, "Satisfied"),
            Self::NotSatisfied => write!(f, "Not satisfied"),
            Self::WhitelistAdmitted => write!(f, "Admitted (whitelist)"),
        }
    }
}

/// Values the applicant declared in the portal's structured fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedValues {
    pub grade: Option<f64>,
    pub credits: CategorySums,
}

impl ClaimedValues {
    /// No grade and zero credits for every category.
    pub fn empty<S: AsRef<str>>(categories: &[S]) -> Self {
        Self {
            grade: None,
            credits: CategorySums::zeroed(categories),
        }
    }
}

/// A document line attributed to a category with its credit value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMatch {
    /// Mapping key that hit, or `Fallback: <first keyword>`.
    pub label: String,
    pub category: String,
    pub credits: f64,
    /// Index of the matched line among the non-empty lines of the text.
    pub line: usize,
}

impl fmt::Display for ModuleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.label, self.category, format_value(self.credits))
    }
}

/// Output of one module matching pass over a document text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchReport {
    /// Totals per category, rounded to two decimals.
    pub sums: CategorySums,
    pub matched: Vec<ModuleMatch>,
    /// Normalized lines that could not be attributed, without duplicates.
    pub unrecognized: Vec<String>,
}

/// Status and explanation produced by the requirement evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: EvaluationStatus,
    pub reasons: Vec<String>,
}

impl Evaluation {
    pub const ALL_SATISFIED: &'static str = "All criteria satisfied";

    /// Reasons joined with `; `, or the fixed all-clear text.
    pub fn reason_text(&self) -> String {
        if self.reasons.is_empty() {
            Self::ALL_SATISFIED.to_string()
        } else {
            self.reasons.join("; ")
        }
    }
}

/// One evaluated applicant, serialized into exactly one report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicantRecord {
    pub id: String,
    pub claimed: ClaimedValues,
    pub ocr_grade: Option<f64>,
    pub ocr_credits: CategorySums,
    /// `None` when matching did not apply (whitelist admission).
    pub matched_modules: Option<Vec<ModuleMatch>>,
    /// `None` when matching did not apply (whitelist admission).
    pub unrecognized_lines: Option<Vec<String>>,
    pub status: EvaluationStatus,
    pub reasons: String,
}
