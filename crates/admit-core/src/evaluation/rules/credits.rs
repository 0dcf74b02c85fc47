//! Credit-point (ECTS) extraction.

use super::patterns::CREDIT_POINTS;
use super::{parse_decimal, ExtractionMatch, FieldExtractor};

/// Values above this are preferred as module credits; smaller ones are
/// often grades or partial points printed next to a "CP" column.
const TYPICAL_MODULE_MINIMUM: f64 = 4.0;

/// Credit-point value extractor (`<number> CP`).
pub struct CreditExtractor {
    max_value: f64,
}

impl CreditExtractor {
    /// Create an extractor accepting values in `(0, max_value]`.
    pub fn new(max_value: f64) -> Self {
        Self { max_value }
    }
}

impl Default for CreditExtractor {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl FieldExtractor for CreditExtractor {
    type Output = ExtractionMatch<f64>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in CREDIT_POINTS.captures_iter(text) {
            let Some(number) = caps.get(1) else { continue };
            let Some(value) = parse_decimal(number.as_str()) else { continue };

            if value > 0.0 && value <= self.max_value {
                let full_match = &caps[0];
                results.push(
                    ExtractionMatch::new(value, full_match)
                        .with_position(number.start(), number.end()),
                );
            }
        }

        results
    }
}

/// A credit value found near a matched module line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditCandidate {
    pub value: f64,
    /// Line offset from the matched module line.
    pub offset: usize,
}

/// Pick the credit value for a module from the candidates in its vicinity.
///
/// Preference: the largest value above 4, else the largest whole or half
/// value, else the largest value. Ties keep the earliest candidate.
pub fn select_credit(candidates: &[CreditCandidate]) -> Option<CreditCandidate> {
    let largest = |filter: &dyn Fn(&CreditCandidate) -> bool| {
        candidates
            .iter()
            .filter(|c| filter(c))
            .fold(None::<CreditCandidate>, |best, c| match best {
                Some(b) if b.value >= c.value => Some(b),
                _ => Some(*c),
            })
    };

    largest(&|c| c.value > TYPICAL_MODULE_MINIMUM)
        .or_else(|| largest(&|c| is_whole_or_half(c.value)))
        .or_else(|| largest(&|_| true))
}

fn is_whole_or_half(value: f64) -> bool {
    value % 0.5 < 0.001
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(values: &[(f64, usize)]) -> Vec<CreditCandidate> {
        values
            .iter()
            .map(|&(value, offset)| CreditCandidate { value, offset })
            .collect()
    }

    #[test]
    fn test_extract_credit_values() {
        let extractor = CreditExtractor::default();
        let values: Vec<f64> = extractor
            .extract_all("Mikro 6,0 CP | Makro 7.5cp | Seminar 3 CP")
            .into_iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(values, vec![6.0, 7.5, 3.0]);
    }

    #[test]
    fn test_extract_credit_range() {
        let extractor = CreditExtractor::new(50.0);
        assert!(extractor.extract("0 CP").is_none());
        assert!(extractor.extract("180 CP").is_none());
        assert_eq!(extractor.extract("50 CP").map(|m| m.value), Some(50.0));
        assert!(extractor.extract("Note 2,3").is_none());
    }

    #[test]
    fn test_select_prefers_values_above_four() {
        let picked = select_credit(&candidates(&[(3.0, 0), (7.5, 2), (5.0, 1)])).unwrap();
        assert_eq!(picked, CreditCandidate { value: 7.5, offset: 2 });
    }

    #[test]
    fn test_select_prefers_whole_or_half() {
        let picked = select_credit(&candidates(&[(2.5, 0), (3.3, 1)])).unwrap();
        assert_eq!(picked.value, 2.5);
    }

    #[test]
    fn test_select_falls_back_to_maximum() {
        let picked = select_credit(&candidates(&[(1.3, 0), (2.7, 1)])).unwrap();
        assert_eq!(picked, CreditCandidate { value: 2.7, offset: 1 });
    }

    #[test]
    fn test_select_ties_keep_first() {
        let picked = select_credit(&candidates(&[(6.0, 0), (6.0, 1)])).unwrap();
        assert_eq!(picked.offset, 0);
        assert!(select_credit(&[]).is_none());
    }
}
