//! Evaluation run over all applicants of a portal session.

mod session;

pub use session::{ApplicantRef, DirectorySession, InteractiveSession};

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::catalog::{ModuleMapping, Whitelist};
use crate::documents::{
    clear_directory, extract_archive, find_documents, join_texts, partition_priority, recognize_all,
    DocumentText, TextRecognizer,
};
use crate::error::{DocumentError, RecognitionError, SessionError};
use crate::evaluation::claimed::{applicant_number, ClaimedExtractor};
use crate::evaluation::evaluator::RequirementEvaluator;
use crate::evaluation::matcher::ModuleMatcher;
use crate::evaluation::rules::extract_grade_from_text;
use crate::models::applicant::{ApplicantRecord, CategorySums, ClaimedValues, EvaluationStatus};
use crate::models::config::{AdmissionConfig, RunPaths};
use crate::report::ReportWriter;

/// Turns recognized document text and claimed values into an applicant record.
pub struct Assessor<'a> {
    config: &'a AdmissionConfig,
    mapping: &'a ModuleMapping,
    whitelist: &'a Whitelist,
    categories: Vec<String>,
}

impl<'a> Assessor<'a> {
    pub fn new(config: &'a AdmissionConfig, mapping: &'a ModuleMapping, whitelist: &'a Whitelist) -> Self {
        Self {
            config,
            mapping,
            whitelist,
            categories: config.categories(),
        }
    }

    /// Assess one applicant.
    ///
    /// `priority_text` is the text of the documents searched for the grade
    /// first; the full text is used when it yields none.
    pub fn assess(
        &self,
        id: &str,
        claimed: ClaimedValues,
        full_text: &str,
        priority_text: Option<&str>,
    ) -> ApplicantRecord {
        let labels = &self.config.grading.labels;
        let ocr_grade = priority_text
            .filter(|t| !t.trim().is_empty())
            .and_then(|t| extract_grade_from_text(t, labels))
            .or_else(|| extract_grade_from_text(full_text, labels));

        if let Some(entry) = self.whitelist.check(full_text) {
            info!("Applicant {} admitted by whitelist entry '{}'", id, entry);
            return ApplicantRecord {
                id: id.to_string(),
                claimed,
                ocr_grade,
                ocr_credits: CategorySums::zeroed(&self.categories),
                matched_modules: None,
                unrecognized_lines: None,
                status: EvaluationStatus::WhitelistAdmitted,
                reasons: format!("university whitelist: {}", entry),
            };
        }

        let report = ModuleMatcher::new(self.mapping, &self.config.matching, &self.categories)
            .match_modules(full_text);
        let evaluation = RequirementEvaluator::new(self.config).evaluate(
            claimed.grade,
            ocr_grade,
            &report.sums,
            report.matched.len(),
            report.unrecognized.len(),
        );

        info!("Applicant {}: {} ({})", id, evaluation.status, evaluation.reason_text());

        ApplicantRecord {
            id: id.to_string(),
            claimed,
            ocr_grade,
            ocr_credits: report.sums,
            reasons: evaluation.reason_text(),
            status: evaluation.status,
            matched_modules: Some(report.matched),
            unrecognized_lines: Some(report.unrecognized),
        }
    }
}

/// Progress notification for one finished applicant.
#[derive(Debug, Clone)]
pub struct ApplicantProgress {
    /// One-based position in the run.
    pub position: usize,
    pub total: usize,
    pub id: String,
    /// `None` when the applicant ended in an error row.
    pub status: Option<EvaluationStatus>,
}

/// Totals of a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub satisfied: usize,
    pub not_satisfied: usize,
    pub whitelisted: usize,
    pub errors: usize,
    pub output: PathBuf,
    pub processing_time_ms: u64,
}

impl RunSummary {
    fn count(&mut self, status: Option<EvaluationStatus>) {
        self.total += 1;
        match status {
            Some(EvaluationStatus::Satisfied) => self.satisfied += 1,
            Some(EvaluationStatus::NotSatisfied) => self.not_satisfied += 1,
            Some(EvaluationStatus::WhitelistAdmitted) => self.whitelisted += 1,
            None => self.errors += 1,
        }
    }
}

/// One evaluation run: configuration, tables and text recognition.
pub struct EvaluationRun {
    config: AdmissionConfig,
    paths: RunPaths,
    mapping: ModuleMapping,
    whitelist: Whitelist,
    recognizer: Box<dyn TextRecognizer>,
}

impl EvaluationRun {
    /// Prepare a run. Fails on an unusable configuration, unreadable tables
    /// or an unavailable recognizer.
    pub fn new(config: AdmissionConfig, recognizer: Box<dyn TextRecognizer>) -> crate::Result<Self> {
        config.validate()?;

        if !recognizer.is_available() {
            return Err(RecognitionError::Unavailable(recognizer.name().to_string()).into());
        }

        let paths = config.resolved_paths();
        let mapping = ModuleMapping::load(&paths.module_map, config.matching.key_order)?;
        let whitelist = Whitelist::load(config.whitelist_path.as_deref())?;

        Ok(Self {
            config,
            paths,
            mapping,
            whitelist,
            recognizer,
        })
    }

    /// Write the report to `path` instead of the configured file.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.output_csv = path.into();
        self
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn mapping(&self) -> &ModuleMapping {
        &self.mapping
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Evaluate every applicant of the session.
    pub fn execute<S: InteractiveSession + ?Sized>(&self, session: &mut S) -> crate::Result<RunSummary> {
        self.execute_with(session, |_| {})
    }

    /// Evaluate every applicant, reporting each finished one to `on_applicant`.
    pub fn execute_with<S, F>(&self, session: &mut S, mut on_applicant: F) -> crate::Result<RunSummary>
    where
        S: InteractiveSession + ?Sized,
        F: FnMut(&ApplicantProgress),
    {
        let start = Instant::now();
        let categories = self.config.categories();
        let mut writer = ReportWriter::create(&self.paths.output_csv, &categories)?;

        let applicants = session.list_applicants()?;
        if applicants.is_empty() {
            error!("No applicants found");
            return Err(SessionError::Listing("no applicants found".to_string()).into());
        }

        let total = applicants.len();
        info!("Evaluating {} applicants", total);
        let mut summary = RunSummary {
            output: self.paths.output_csv.clone(),
            ..Default::default()
        };

        for (position, applicant) in applicants.iter().enumerate() {
            let mut id = applicant
                .list_number
                .clone()
                .unwrap_or_else(|| format!("unknown_idx_{}", applicant.index));

            let status = match self.process_applicant(session, applicant, &mut id) {
                Ok(record) => {
                    writer.write_record(&record)?;
                    Some(record.status)
                }
                Err(e) => {
                    error!("Applicant {} failed: {}", id, e);
                    writer.write_error(&id, &e.to_string())?;
                    None
                }
            };

            if let Err(e) = session.close_applicant(applicant) {
                warn!("Could not close applicant {}: {}", id, e);
            }

            summary.count(status);
            on_applicant(&ApplicantProgress {
                position: position + 1,
                total,
                id,
                status,
            });
        }

        summary.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Run finished: {} applicants, {} satisfied, {} not satisfied, {} whitelisted, {} errors",
            summary.total, summary.satisfied, summary.not_satisfied, summary.whitelisted, summary.errors
        );
        Ok(summary)
    }

    fn process_applicant<S: InteractiveSession + ?Sized>(
        &self,
        session: &mut S,
        applicant: &ApplicantRef,
        id: &mut String,
    ) -> crate::Result<ApplicantRecord> {
        let page = session.open_applicant(applicant)?;
        if let Some(number) = applicant_number(&page) {
            *id = number;
        }
        info!("Processing applicant {}", id);

        clear_directory(&self.paths.download_dir)?;
        let texts = match session.download_documents(applicant, &self.paths.download_dir)? {
            Some(archive) => match self.recognize_archive(&archive, id) {
                Ok(texts) => texts,
                Err(e) => {
                    warn!("Documents of {} unusable, continuing without them: {}", id, e);
                    Vec::new()
                }
            },
            None => {
                warn!("No documents downloaded for {}", id);
                Vec::new()
            }
        };

        let full_text = join_texts(&texts);
        let priority_docs = partition_priority(
            &texts.iter().map(|t| t.path.clone()).collect::<Vec<_>>(),
            &self.config.grading.priority_document_keywords,
        );
        let priority: Vec<DocumentText> = texts
            .iter()
            .filter(|t| priority_docs.contains(&t.path))
            .cloned()
            .collect();
        let priority_text = join_texts(&priority);
        debug!(
            "Applicant {}: {} documents, {} grade-priority, {} chars",
            id,
            texts.len(),
            priority.len(),
            full_text.len()
        );

        let categories = self.config.categories();
        let claimed = ClaimedExtractor::new(&self.config.claimed, &self.config.dom_credit_map, &categories)
            .extract(&page);

        let assessor = Assessor::new(&self.config, &self.mapping, &self.whitelist);
        Ok(assessor.assess(id, claimed, &full_text, Some(priority_text.as_str())))
    }

    fn recognize_archive(&self, archive: &Path, id: &str) -> Result<Vec<DocumentText>, DocumentError> {
        let target = self
            .paths
            .extract_dir
            .join(format!("{}_{}", id, Local::now().format("%Y%m%d_%H%M%S")));
        extract_archive(archive, &target)?;

        let documents = find_documents(&target, &self.config.documents.excluded_name_fragments)?;
        if documents.is_empty() {
            warn!("Archive {} contains no documents", archive.display());
        }

        Ok(recognize_all(self.recognizer.as_ref(), &documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdmitError;
    use crate::evaluation::claimed::{LabeledField, PageSnapshot};
    use crate::models::config::OrderedMap;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    /// Reads "PDF" files as plain text.
    struct PlainTextRecognizer {
        available: bool,
    }

    impl TextRecognizer for PlainTextRecognizer {
        fn name(&self) -> &str {
            "plain-text"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn recognize(&self, path: &Path) -> crate::documents::Result<String> {
            fs::read_to_string(path).map_err(|e| RecognitionError::Parse(e.to_string()))
        }
    }

    fn recognizer() -> Box<dyn TextRecognizer> {
        Box::new(PlainTextRecognizer { available: true })
    }

    struct FakeApplicant {
        page: Result<PageSnapshot, String>,
        documents: Vec<(&'static str, &'static str)>,
        /// Raw bytes served instead of a well-formed archive.
        corrupt_archive: Option<&'static str>,
    }

    impl FakeApplicant {
        fn new(page: Result<PageSnapshot, String>, documents: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                page,
                documents,
                corrupt_archive: None,
            }
        }
    }

    struct FakeSession {
        applicants: Vec<FakeApplicant>,
        closed: Vec<usize>,
    }

    impl InteractiveSession for FakeSession {
        fn list_applicants(&mut self) -> Result<Vec<ApplicantRef>, SessionError> {
            Ok((0..self.applicants.len())
                .map(|index| ApplicantRef {
                    index,
                    list_number: None,
                    handle: index.to_string(),
                })
                .collect())
        }

        fn open_applicant(&mut self, applicant: &ApplicantRef) -> Result<PageSnapshot, SessionError> {
            self.applicants[applicant.index]
                .page
                .clone()
                .map_err(|reason| SessionError::Open {
                    applicant: applicant.handle.clone(),
                    reason,
                })
        }

        fn download_documents(
            &mut self,
            applicant: &ApplicantRef,
            download_dir: &Path,
        ) -> Result<Option<PathBuf>, SessionError> {
            let fake = &self.applicants[applicant.index];
            if let Some(raw) = fake.corrupt_archive {
                let path = download_dir.join("broken.zip");
                fs::write(&path, raw).unwrap();
                return Ok(Some(path));
            }

            let documents = &fake.documents;
            if documents.is_empty() {
                return Ok(None);
            }

            let path = download_dir.join("documents.zip");
            let mut zip = ZipWriter::new(File::create(&path).unwrap());
            for (name, text) in documents {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(text.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
            Ok(Some(path))
        }

        fn close_applicant(&mut self, applicant: &ApplicantRef) -> Result<(), SessionError> {
            self.closed.push(applicant.index);
            Ok(())
        }
    }

    fn page(number: &str, grade: &str) -> PageSnapshot {
        PageSnapshot {
            applicant_number: Some(number.to_string()),
            fields: vec![
                LabeledField {
                    label: "Ergebnis MZB-Note".to_string(),
                    value: Some(grade.to_string()),
                },
                LabeledField {
                    label: "CP im Bereich VWL".to_string(),
                    value: Some("12".to_string()),
                },
            ],
            locators: OrderedMap::new(),
        }
    }

    fn config(dir: &Path) -> AdmissionConfig {
        let mapping = dir.join("mapping.csv");
        fs::write(&mapping, "module,category\nmikroökonomie,VWL\nmakroökonomie,VWL\n").unwrap();
        let whitelist = dir.join("whitelist.csv");
        fs::write(&whitelist, "name\nMusteruniversität\n").unwrap();

        AdmissionConfig {
            requirements: [("VWL", 10.0), ("BWL", 5.0)].into_iter().collect(),
            resources_dir: Some(dir.to_path_buf()),
            module_map_path: Some(mapping),
            whitelist_path: Some(whitelist),
            ..Default::default()
        }
    }

    fn read_report(path: &Path) -> Vec<HashMap<String, String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.deserialize().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_run_writes_one_row_per_applicant() {
        let dir = TempDir::new().unwrap();
        let run = EvaluationRun::new(config(dir.path()), recognizer()).unwrap();

        let mut session = FakeSession {
            applicants: vec![
                FakeApplicant::new(
                    Ok(page("1000001", "2,0")),
                    vec![
                        ("Zeugnis.pdf", "Bachelorzeugnis\nGesamtnote 2,2"),
                        (
                            "Transcript.pdf",
                            "Mikroökonomie\n6 CP\nMakroökonomie 5 CP\nBetriebswirtschaftslehre 5 CP\nNote 1,3",
                        ),
                        ("Deckblatt.pdf", "Musteruniversität"),
                    ],
                ),
                FakeApplicant::new(Err("page did not load".to_string()), vec![]),
                FakeApplicant::new(
                    Ok(page("1000003", "1,7")),
                    vec![("Urkunde.pdf", "Musteruniversität Beispielstadt\nGesamtnote 1,5")],
                ),
                FakeApplicant::new(Ok(PageSnapshot::default()), vec![]),
            ],
            closed: Vec::new(),
        };

        let summary = run.execute(&mut session).unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.satisfied, 1);
        assert_eq!(summary.whitelisted, 1);
        assert_eq!(summary.not_satisfied, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(session.closed, vec![0, 1, 2, 3]);

        let rows = read_report(&run.paths().output_csv);
        assert_eq!(rows.len(), 4);

        let first = &rows[0];
        assert_eq!(first["applicant_id"], "1000001");
        assert_eq!(first["claimed_grade"], "2.0");
        assert_eq!(first["ocr_grade"], "2.2");
        assert_eq!(first["ocr_VWL"], "11.0");
        assert_eq!(first["ocr_BWL"], "5.0");
        assert_eq!(first["claimed_VWL"], "12.0");
        assert_eq!(first["status"], "Satisfied");
        assert_eq!(
            first["reasons"],
            "Grade discrepancy (claimed: 2.0, document: 2.2); 2 unrecognized module line(s)"
        );
        assert_eq!(first["unrecognized_lines"], "Bachelorzeugnis | Gesamtnote");
        assert_eq!(
            first["matched_modules"],
            "mikroökonomie->VWL:6.0 | makroökonomie->VWL:5.0 | Fallback: betriebswirtschaft->BWL:5.0"
        );

        assert_eq!(rows[1]["applicant_id"], "unknown_idx_1");
        assert_eq!(rows[1]["status"], "FATAL ERROR");
        assert_eq!(rows[1]["ocr_VWL"], "ERROR");

        let whitelisted = &rows[2];
        assert_eq!(whitelisted["status"], "Admitted (whitelist)");
        assert_eq!(whitelisted["ocr_VWL"], "0.0");
        assert_eq!(whitelisted["ocr_BWL"], "0.0");
        assert_eq!(whitelisted["ocr_grade"], "1.5");
        assert_eq!(whitelisted["matched_modules"], "N/A (whitelist)");

        let empty = &rows[3];
        assert_eq!(empty["applicant_id"], "unknown_idx_3");
        assert_eq!(empty["status"], "Not satisfied");
        assert_eq!(empty["claimed_grade"], "");
    }

    #[test]
    fn test_corrupt_archive_keeps_claimed_values() {
        let dir = TempDir::new().unwrap();
        let run = EvaluationRun::new(config(dir.path()), recognizer()).unwrap();

        let mut session = FakeSession {
            applicants: vec![FakeApplicant {
                page: Ok(page("1234567", "2,0")),
                documents: vec![],
                corrupt_archive: Some("not a zip"),
            }],
            closed: Vec::new(),
        };

        let summary = run.execute(&mut session).unwrap();
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.not_satisfied, 1);

        let rows = read_report(&run.paths().output_csv);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["applicant_id"], "1234567");
        assert_eq!(row["status"], "Not satisfied");
        assert_eq!(row["claimed_grade"], "2.0");
        assert_eq!(row["claimed_VWL"], "12.0");
        assert_eq!(row["ocr_grade"], "");
        assert_eq!(row["ocr_VWL"], "0.0");
        assert_eq!(row["ocr_BWL"], "0.0");
        assert_eq!(
            row["reasons"],
            "VWL insufficient (0.0 < 10.0); BWL insufficient (0.0 < 5.0)"
        );
    }

    #[test]
    fn test_whitelist_bypasses_evaluation() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let mapping = ModuleMapping::load(&config.resolved_paths().module_map, config.matching.key_order).unwrap();
        let whitelist = Whitelist::from_entries(["musteruniversität"]);
        let assessor = Assessor::new(&config, &mapping, &whitelist);

        let claimed = ClaimedValues::empty(&config.categories());
        let record = assessor.assess("42", claimed, "Musteruniversität Beispielstadt\nNote 4,0", None);
        assert_eq!(record.status, EvaluationStatus::WhitelistAdmitted);
        assert_eq!(record.ocr_credits, CategorySums::zeroed(&config.categories()));
        assert_eq!(record.matched_modules, None);
        assert_eq!(record.unrecognized_lines, None);
        assert_eq!(record.reasons, "university whitelist: musteruniversität");
    }

    #[test]
    fn test_assess_without_requirements_fails_applicant() {
        let config = AdmissionConfig::default();
        let mapping = ModuleMapping::default();
        let whitelist = Whitelist::default();
        let record = Assessor::new(&config, &mapping, &whitelist).assess(
            "1",
            ClaimedValues::empty::<String>(&[]),
            "Note 1,0",
            None,
        );
        assert_eq!(record.status, EvaluationStatus::NotSatisfied);
        assert_eq!(record.reasons, "No credit requirements configured");
    }

    #[test]
    fn test_run_requires_available_recognizer() {
        let dir = TempDir::new().unwrap();
        let result = EvaluationRun::new(config(dir.path()), Box::new(PlainTextRecognizer { available: false }));
        assert!(matches!(
            result,
            Err(AdmitError::Recognition(RecognitionError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_run_requires_requirements() {
        let result = EvaluationRun::new(AdmissionConfig::default(), recognizer());
        assert!(matches!(result, Err(AdmitError::Config(_))));
    }

    #[test]
    fn test_zero_applicants_is_fatal_after_header() {
        let dir = TempDir::new().unwrap();
        let run = EvaluationRun::new(config(dir.path()), recognizer()).unwrap();
        let mut session = FakeSession {
            applicants: vec![],
            closed: vec![],
        };

        assert!(matches!(
            run.execute(&mut session),
            Err(AdmitError::Session(SessionError::Listing(_)))
        ));
        let header = fs::read_to_string(&run.paths().output_csv).unwrap();
        assert!(header.starts_with("applicant_id,claimed_grade,ocr_grade,ocr_VWL,ocr_BWL"));
    }
}
