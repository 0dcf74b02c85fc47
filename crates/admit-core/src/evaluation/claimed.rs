//! Values the applicant declared on the portal's detail page.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::models::applicant::{CategorySums, ClaimedValues};
use crate::models::config::{ClaimedConfig, OrderedMap};

use super::rules::patterns::{APPLICANT_NUMBER, DECIMAL_VALUE};
use super::rules::{extract_grade_token, parse_decimal};

/// Read access to the structured fields of an applicant detail page.
///
/// Every lookup is best effort; a missing element is `None` or empty.
pub trait PageAccessor {
    /// Value bound to the label whose whitespace-normalized text equals `label`.
    fn labeled_field(&self, label: &str) -> Option<String>;

    /// Text of the element identified by an opaque locator.
    fn locate(&self, locator: &str) -> Option<String>;

    /// Every label containing `phrase`, with the text of its adjacent value element.
    fn labels_containing(&self, phrase: &str) -> Vec<(String, Option<String>)>;

    /// Text of the element carrying the applicant number.
    fn applicant_number_text(&self) -> Option<String>;
}

/// A label and the value element next to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledField {
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Captured state of a detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSnapshot {
    /// Text of the applicant number element.
    pub applicant_number: Option<String>,
    /// Labelled fields in page order.
    pub fields: Vec<LabeledField>,
    /// Element texts by locator.
    pub locators: OrderedMap<String>,
}

fn normalize_space(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl PageAccessor for PageSnapshot {
    fn labeled_field(&self, label: &str) -> Option<String> {
        let wanted = normalize_space(label);
        self.fields
            .iter()
            .find(|f| normalize_space(&f.label) == wanted)
            .and_then(|f| f.value.clone())
    }

    fn locate(&self, locator: &str) -> Option<String> {
        self.locators.get(locator).cloned()
    }

    fn labels_containing(&self, phrase: &str) -> Vec<(String, Option<String>)> {
        self.fields
            .iter()
            .filter(|f| normalize_space(&f.label).contains(phrase))
            .map(|f| (f.label.clone(), f.value.clone()))
            .collect()
    }

    fn applicant_number_text(&self) -> Option<String> {
        self.applicant_number.clone()
    }
}

/// The applicant number shown on a page: its first run of five or more digits.
pub fn applicant_number<P: PageAccessor + ?Sized>(page: &P) -> Option<String> {
    let text = page.applicant_number_text()?;
    APPLICANT_NUMBER
        .captures(&text)
        .map(|caps| caps[1].to_string())
}

/// Extracts declared grade and credit points from a detail page.
pub struct ClaimedExtractor<'a> {
    config: &'a ClaimedConfig,
    dom_map: &'a OrderedMap<String>,
    categories: Vec<String>,
}

impl<'a> ClaimedExtractor<'a> {
    pub fn new(config: &'a ClaimedConfig, dom_map: &'a OrderedMap<String>, categories: &[String]) -> Self {
        Self {
            config,
            dom_map,
            categories: categories.to_vec(),
        }
    }

    pub fn extract<P: PageAccessor + ?Sized>(&self, page: &P) -> ClaimedValues {
        let claimed = ClaimedValues {
            grade: self.extract_grade(page),
            credits: self.extract_credits(page),
        };
        debug!("Claimed values: grade {:?}, credits {:?}", claimed.grade, claimed.credits);
        claimed
    }

    /// Declared grade from the result field, else from the fallback locators.
    pub fn extract_grade<P: PageAccessor + ?Sized>(&self, page: &P) -> Option<f64> {
        if let Some(grade) = page
            .labeled_field(&self.config.grade_label)
            .and_then(|text| extract_grade_token(text.trim()))
        {
            trace!("Claimed grade {} from '{}'", grade, self.config.grade_label);
            return Some(grade);
        }

        for locator in &self.config.grade_fallback_locators {
            let Some(text) = page.locate(locator) else { continue };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if let Some(grade) = extract_grade_token(text) {
                trace!("Claimed grade {} from fallback '{}'", grade, locator);
                return Some(grade);
            }
        }

        warn!("No claimed grade found on the applicant page");
        None
    }

    /// Declared credit points per category, additive over labels.
    pub fn extract_credits<P: PageAccessor + ?Sized>(&self, page: &P) -> CategorySums {
        let mut credits = CategorySums::zeroed(&self.categories);

        for (label, value) in page.labels_containing(&self.config.credit_label_phrase) {
            let text = label.trim().to_lowercase();
            let Some(category) = self.category_for(&text) else {
                trace!("Credit label '{}' has no configured category", label.trim());
                continue;
            };

            let parsed = value.as_deref().and_then(|v| {
                DECIMAL_VALUE
                    .captures(v.trim())
                    .and_then(|caps| parse_decimal(&caps[1]))
            });

            match parsed {
                Some(v) => {
                    trace!("Claimed credits {} -> {}", category, v);
                    credits.add(category, v);
                }
                None => warn!("No credit value next to label '{}'", label.trim()),
            }
        }

        credits.rounded()
    }

    fn category_for(&self, label_lower: &str) -> Option<&str> {
        let mapped = self.dom_map.iter().find_map(|(fragment, category)| {
            (label_lower.contains(&fragment.to_lowercase()) && self.is_configured(category))
                .then_some(category.as_str())
        });

        mapped.or_else(|| {
            self.categories
                .iter()
                .find(|c| label_lower.contains(&c.to_lowercase()))
                .map(String::as_str)
        })
    }

    fn is_configured(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}
