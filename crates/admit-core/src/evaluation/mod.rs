//! Document matching and requirement evaluation.

pub mod claimed;
pub mod evaluator;
pub mod matcher;
pub mod rules;

pub use claimed::{applicant_number, ClaimedExtractor, LabeledField, PageAccessor, PageSnapshot};
pub use evaluator::{GradeSource, RequirementEvaluator};
pub use matcher::{ModuleMatcher, ScanCursor};
pub use rules::{extract_grade_from_text, normalize_line, parse_grade};
