//! Grade extraction.

use tracing::{debug, warn};

use super::patterns::{GRADE_LOOSE, GRADE_STRICT};
use super::{parse_decimal, ExtractionMatch, FieldExtractor};

/// Which grade token pattern to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeMode {
    /// `1,0` to `4,9` with exactly one decimal, on word boundaries.
    Strict,
    /// Any single digit with an optional one-digit fraction.
    Loose,
}

/// Grade token extractor.
pub struct GradeExtractor {
    mode: GradeMode,
}

impl GradeExtractor {
    pub fn new(mode: GradeMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(GradeMode::Strict)
    }

    pub fn loose() -> Self {
        Self::new(GradeMode::Loose)
    }
}

impl FieldExtractor for GradeExtractor {
    type Output = ExtractionMatch<f64>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let pattern = match self.mode {
            GradeMode::Strict => &*GRADE_STRICT,
            GradeMode::Loose => &*GRADE_LOOSE,
        };

        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let token = caps.get(1)?;
                let value = parse_grade(token.as_str())?;
                Some(ExtractionMatch::new(value, token.as_str()).with_position(token.start(), token.end()))
            })
            .collect()
    }
}

/// Parse a grade string, accepting `,` or `.` as decimal separator.
pub fn parse_grade(s: &str) -> Option<f64> {
    parse_decimal(s)
}

/// First strict grade token, else first loose one.
pub fn extract_grade_token(text: &str) -> Option<f64> {
    GradeExtractor::strict()
        .extract(text)
        .or_else(|| GradeExtractor::loose().extract(text))
        .map(|m| m.value)
}

/// Find the final grade in recognized document text.
///
/// A line carrying one of `labels` supplies the grade from itself or, when
/// it has none, from the following line. Without a labelled grade the first
/// strict grade token anywhere in the text is used.
pub fn extract_grade_from_text(text: &str, labels: &[String]) -> Option<f64> {
    let labels: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let strict = GradeExtractor::strict();

    for (idx, line) in lines.iter().enumerate() {
        let low = line.to_lowercase();
        if !labels.iter().any(|label| low.contains(label.as_str())) {
            continue;
        }

        if let Some(m) = strict.extract(line) {
            debug!("Document grade {} from labelled line '{}'", m.value, truncate(line));
            return Some(m.value);
        }

        if let Some(m) = lines.get(idx + 1).and_then(|next| strict.extract(next)) {
            debug!("Document grade {} from line after label '{}'", m.value, truncate(line));
            return Some(m.value);
        }
    }

    if let Some(m) = strict.extract(text) {
        debug!("Document grade {} from unlabelled text", m.value);
        return Some(m.value);
    }

    warn!("No grade found in document text");
    None
}

fn truncate(line: &str) -> String {
    line.chars().take(60).collect()
}
