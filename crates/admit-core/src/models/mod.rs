//! Configuration and applicant data models.

pub mod applicant;
pub mod config;

pub use applicant::{
    format_value, round2, ApplicantRecord, CategorySums, ClaimedValues, Evaluation,
    EvaluationStatus, MatchReport, ModuleMatch,
};
pub use config::{AdmissionConfig, KeyOrder, OrderedMap, RecognitionEngine, RunPaths};
