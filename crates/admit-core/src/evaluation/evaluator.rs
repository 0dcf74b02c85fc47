//! Requirement evaluation of an applicant's grade and credit totals.

use std::fmt;

use tracing::debug;

use crate::models::applicant::{format_value, CategorySums, Evaluation, EvaluationStatus};
use crate::models::config::{AdmissionConfig, OrderedMap};

/// Absorbs float error in grade differences such as `2.4 - 2.3`.
const DISCREPANCY_TOLERANCE: f64 = 1e-9;

/// Where the evaluated grade came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeSource {
    Document,
    Claimed,
}

impl fmt::Display for GradeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Claimed => write!(f, "claimed"),
        }
    }
}

/// Checks grade and credit totals against the configured thresholds.
pub struct RequirementEvaluator<'a> {
    requirements: &'a OrderedMap<f64>,
    max_grade: f64,
    discrepancy_threshold: f64,
}

impl<'a> RequirementEvaluator<'a> {
    pub fn new(config: &'a AdmissionConfig) -> Self {
        Self {
            requirements: &config.requirements,
            max_grade: config.max_grade,
            discrepancy_threshold: config.grading.discrepancy_threshold,
        }
    }

    /// Evaluate one applicant.
    ///
    /// Every rule runs; failing and informational reasons accumulate in
    /// rule order. Only failing reasons change the status.
    pub fn evaluate(
        &self,
        claimed_grade: Option<f64>,
        document_grade: Option<f64>,
        document_sums: &CategorySums,
        matched_count: usize,
        unrecognized_count: usize,
    ) -> Evaluation {
        let mut reasons = Vec::new();
        let mut satisfied = true;

        let (grade, source) = match document_grade {
            Some(g) => (Some(g), GradeSource::Document),
            None => (claimed_grade, GradeSource::Claimed),
        };

        match grade {
            None => {
                reasons.push(format!("Grade missing (source: {})", source));
                satisfied = false;
            }
            Some(g) if g > self.max_grade => {
                reasons.push(format!(
                    "Grade too low ({} > {})",
                    format_value(g),
                    format_value(self.max_grade)
                ));
                satisfied = false;
            }
            Some(_) => {}
        }

        if let (Some(claimed), Some(document)) = (claimed_grade, document_grade) {
            if (claimed - document).abs() >= self.discrepancy_threshold - DISCREPANCY_TOLERANCE {
                reasons.push(format!(
                    "Grade discrepancy (claimed: {}, document: {})",
                    format_value(claimed),
                    format_value(document)
                ));
            }
        }

        if self.requirements.is_empty() {
            reasons.push("No credit requirements configured".to_string());
            satisfied = false;
        } else {
            for (category, required) in self.requirements.iter() {
                let achieved = document_sums.value(category);
                if achieved < *required {
                    reasons.push(format!(
                        "{} insufficient ({} < {})",
                        category,
                        format_value(achieved),
                        format_value(*required)
                    ));
                    satisfied = false;
                }
            }
        }

        if unrecognized_count > 0 {
            reasons.push(format!("{} unrecognized module line(s)", unrecognized_count));
        }

        let status = if satisfied {
            EvaluationStatus::Satisfied
        } else {
            EvaluationStatus::NotSatisfied
        };

        debug!(
            "Evaluated grade {:?} ({}), {} matched modules: {}",
            grade, source, matched_count, status
        );

        Evaluation { status, reasons }
    }
}
