//! Error types for the admit-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the admit library.
#[derive(Error, Debug)]
pub enum AdmitError {
    /// Configuration contract violation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Module mapping or whitelist table could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Document retrieval error (archives, document discovery).
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Text recognition error.
    #[error("recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Interactive session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Report writing error.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when the configuration cannot be used for a run.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No credit requirement categories are configured.
    #[error("no credit requirements configured")]
    NoRequirements,

    /// A requirement threshold is negative or not a number.
    #[error("invalid threshold for {category}: {value}")]
    InvalidThreshold { category: String, value: f64 },

    /// The maximum grade is not a positive number.
    #[error("invalid maximum grade: {0}")]
    InvalidMaxGrade(f64),

    /// The configuration file could not be parsed.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Errors related to the module mapping and whitelist tables.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The table file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The mapping table has no usable module or category column.
    #[error("missing column in {path}: expected one of {expected}")]
    MissingColumn { path: PathBuf, expected: String },
}

/// Errors related to downloaded document archives.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The archive could not be opened or is corrupt.
    #[error("failed to read archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// An archive entry could not be written.
    #[error("failed to extract {entry}: {reason}")]
    Extract { entry: String, reason: String },

    /// A document search pattern was invalid.
    #[error("invalid document pattern: {0}")]
    Pattern(String),
}

/// Errors related to text recognition of documents.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The recognition backend is not installed or not runnable.
    #[error("text recognition not available: {0}")]
    Unavailable(String),

    /// The PDF could not be parsed.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Page rendering failed.
    #[error("failed to render pages: {0}")]
    Render(String),

    /// The recognition engine failed on a page.
    #[error("recognition failed: {0}")]
    Engine(String),
}

/// Errors raised by the interactive session collaborator.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The result list could not be read.
    #[error("failed to list applicants: {0}")]
    Listing(String),

    /// The applicant detail page could not be opened.
    #[error("failed to open applicant {applicant}: {reason}")]
    Open { applicant: String, reason: String },

    /// The document download did not complete.
    #[error("document download failed: {0}")]
    Download(String),
}

/// Errors related to the output report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// CSV serialization or file error.
    #[error("failed to write report: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the report failed.
    #[error("failed to flush report: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the admit library.
pub type Result<T> = std::result::Result<T, AdmitError>;
