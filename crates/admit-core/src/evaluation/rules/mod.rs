//! Rule-based extractors for applicant documents.

pub mod credits;
pub mod grade;
pub mod normalize;
pub mod patterns;

pub use credits::{select_credit, CreditCandidate, CreditExtractor};
pub use grade::{extract_grade_from_text, extract_grade_token, parse_grade, GradeExtractor, GradeMode};
pub use normalize::normalize_line;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A value found in text together with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte range in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Parse a decimal written with either `.` or `,` as separator.
///
/// Unparseable input yields `None`; a miss is never an error.
pub fn parse_decimal(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}
