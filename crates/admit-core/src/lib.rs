//! Core library for applicant document evaluation.
//!
//! This crate provides:
//! - Line normalization, grade and credit-point extraction from document text
//! - Module-to-category matching with credit summation
//! - Claimed-value extraction from applicant detail pages
//! - Requirement evaluation with explainable reasons
//! - Archive extraction, PDF discovery and text recognition
//! - The per-applicant evaluation run and its CSV report

pub mod catalog;
pub mod documents;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod report;

pub use catalog::{ModuleMapping, Whitelist};
pub use documents::{create_recognizer, TesseractRecognizer, TextLayerRecognizer, TextRecognizer};
pub use error::{AdmitError, Result};
pub use evaluation::{
    ClaimedExtractor, ModuleMatcher, PageAccessor, PageSnapshot, RequirementEvaluator,
};
pub use models::applicant::{ApplicantRecord, Evaluation, EvaluationStatus, MatchReport};
pub use models::config::AdmissionConfig;
pub use pipeline::{Assessor, DirectorySession, EvaluationRun, InteractiveSession, RunSummary};
pub use report::ReportWriter;
