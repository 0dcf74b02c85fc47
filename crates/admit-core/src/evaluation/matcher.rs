//! Attribution of document lines to requirement categories.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use crate::catalog::ModuleMapping;
use crate::models::applicant::{CategorySums, MatchReport, ModuleMatch};
use crate::models::config::MatchingConfig;

use super::rules::{normalize_line, select_credit, CreditCandidate, CreditExtractor, FieldExtractor};

/// Line indices already used by a match within one document scan.
///
/// A cursor lives for exactly one [`ModuleMatcher::match_modules`] call.
#[derive(Debug, Default)]
pub struct ScanCursor {
    consumed: HashSet<usize>,
}

impl ScanCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, index: usize) -> bool {
        self.consumed.contains(&index)
    }

    /// Mark `start..=start + offset` as consumed.
    pub fn consume(&mut self, start: usize, offset: usize) {
        self.consumed.extend(start..=start + offset);
    }
}

/// Category hit for a single line.
#[derive(Debug, Clone, PartialEq)]
struct CategoryHit {
    label: String,
    category: String,
}

/// Matches module lines against the mapping table and fallback keywords.
pub struct ModuleMatcher<'a> {
    mapping: &'a ModuleMapping,
    config: &'a MatchingConfig,
    categories: Vec<String>,
    credits: CreditExtractor,
}

impl<'a> ModuleMatcher<'a> {
    pub fn new(mapping: &'a ModuleMapping, config: &'a MatchingConfig, categories: &[String]) -> Self {
        Self {
            mapping,
            config,
            categories: categories.to_vec(),
            credits: CreditExtractor::new(config.max_credit_value),
        }
    }

    /// Scan `text` line by line, summing credit points per category.
    pub fn match_modules(&self, text: &str) -> MatchReport {
        let mut sums = CategorySums::zeroed(&self.categories);
        let mut matched = Vec::new();
        let mut unrecognized: Vec<String> = Vec::new();

        if text.trim().is_empty() {
            warn!("Module matching called with empty text");
            return MatchReport {
                sums,
                matched,
                unrecognized,
            };
        }

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let mut cursor = ScanCursor::new();

        for (idx, line) in lines.iter().enumerate() {
            if cursor.is_consumed(idx) {
                continue;
            }

            let Some(hit) = self.categorize(line) else {
                add_unrecognized(&mut unrecognized, line);
                continue;
            };

            match self.credit_in_vicinity(&lines, idx) {
                Some(candidate) => {
                    trace!(
                        "Line {} '{}' -> {} with {} CP at offset {}",
                        idx, line, hit.category, candidate.value, candidate.offset
                    );
                    sums.add(&hit.category, candidate.value);
                    matched.push(ModuleMatch {
                        label: hit.label,
                        category: hit.category,
                        credits: candidate.value,
                        line: idx,
                    });
                    cursor.consume(idx, candidate.offset);
                }
                None => {
                    trace!("Line {} '{}' matched {} without credit value", idx, line, hit.category);
                    add_unrecognized(&mut unrecognized, line);
                }
            }
        }

        let sums = sums.rounded();
        debug!(
            "Module matching finished: {} matches, {} unrecognized lines, sums {:?}",
            matched.len(),
            unrecognized.len(),
            sums
        );

        MatchReport {
            sums,
            matched,
            unrecognized,
        }
    }

    fn categorize(&self, line: &str) -> Option<CategoryHit> {
        let low = line.to_lowercase();

        if let Some((key, category)) = self.mapping.find(&low, |c| self.is_configured(c)) {
            return Some(CategoryHit {
                label: key.to_string(),
                category: category.to_string(),
            });
        }

        self.categories.iter().find_map(|category| {
            let keywords = self.config.fallback_keywords.get(category)?;
            let first = keywords.first()?;
            keywords
                .iter()
                .any(|kw| low.contains(&kw.to_lowercase()))
                .then(|| CategoryHit {
                    label: format!("Fallback: {}", first),
                    category: category.clone(),
                })
        })
    }

    fn credit_in_vicinity(&self, lines: &[&str], start: usize) -> Option<CreditCandidate> {
        let window = self.config.vicinity_lines.min(lines.len() - start);

        let candidates: Vec<CreditCandidate> = (0..window)
            .flat_map(|offset| {
                self.credits
                    .extract_all(lines[start + offset])
                    .into_iter()
                    .map(move |m| CreditCandidate { value: m.value, offset })
            })
            .collect();

        select_credit(&candidates)
    }

    fn is_configured(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

fn add_unrecognized(unrecognized: &mut Vec<String>, line: &str) {
    let cleaned = normalize_line(line);
    if !cleaned.is_empty() && !unrecognized.contains(&cleaned) {
        unrecognized.push(cleaned);
    }
}
