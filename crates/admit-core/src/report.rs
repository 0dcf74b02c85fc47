//! CSV evaluation report, one row per applicant.

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::models::applicant::{format_value, ApplicantRecord};

/// Placeholder written to numeric columns of a failed applicant.
pub const ERROR_VALUE: &str = "ERROR";
/// Status written for a failed applicant.
pub const ERROR_STATUS: &str = "FATAL ERROR";
/// List column text when matching did not apply.
pub const NOT_APPLICABLE: &str = "N/A (whitelist)";

const LIST_SEPARATOR: &str = " | ";

/// Writes the evaluation report, flushing after every row.
pub struct ReportWriter {
    writer: Writer<File>,
    categories: Vec<String>,
    rows: usize,
}

impl ReportWriter {
    /// Create the report file and write the header row.
    pub fn create(path: &Path, categories: &[String]) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = Writer::from_path(path)?;
        writer.write_record(header(categories))?;
        writer.flush()?;

        info!("Writing report to {}", path.display());
        Ok(Self {
            writer,
            categories: categories.to_vec(),
            rows: 0,
        })
    }

    /// Append the row of an evaluated applicant.
    pub fn write_record(&mut self, record: &ApplicantRecord) -> Result<(), ReportError> {
        let mut row = Vec::with_capacity(7 + 2 * self.categories.len());
        row.push(record.id.clone());
        row.push(optional(record.claimed.grade));
        row.push(optional(record.ocr_grade));
        row.extend(self.categories.iter().map(|c| format_value(record.ocr_credits.value(c))));
        row.extend(self.categories.iter().map(|c| format_value(record.claimed.credits.value(c))));
        row.push(record.status.to_string());
        row.push(record.reasons.clone());
        row.push(match &record.matched_modules {
            Some(modules) => modules
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            None => NOT_APPLICABLE.to_string(),
        });
        row.push(match &record.unrecognized_lines {
            Some(lines) => lines.join(LIST_SEPARATOR),
            None => NOT_APPLICABLE.to_string(),
        });

        self.push_row(&record.id, row)
    }

    /// Append an error row for an applicant whose processing failed.
    pub fn write_error(&mut self, id: &str, message: &str) -> Result<(), ReportError> {
        let mut row = Vec::with_capacity(7 + 2 * self.categories.len());
        row.push(id.to_string());
        row.push(ERROR_VALUE.to_string());
        row.push(ERROR_VALUE.to_string());
        row.extend(std::iter::repeat(ERROR_VALUE.to_string()).take(2 * self.categories.len()));
        row.push(ERROR_STATUS.to_string());
        row.push(message.to_string());
        row.push(String::new());
        row.push(String::new());

        self.push_row(id, row)
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn push_row(&mut self, id: &str, row: Vec<String>) -> Result<(), ReportError> {
        self.writer.write_record(&row)?;
        self.writer.flush()?;
        self.rows += 1;
        debug!("Report row written for {}", id);
        Ok(())
    }
}

fn header(categories: &[String]) -> Vec<String> {
    let mut header = vec![
        "applicant_id".to_string(),
        "claimed_grade".to_string(),
        "ocr_grade".to_string(),
    ];
    header.extend(categories.iter().map(|c| format!("ocr_{}", c)));
    header.extend(categories.iter().map(|c| format!("claimed_{}", c)));
    header.extend(
        ["status", "reasons", "matched_modules", "unrecognized_lines"]
            .iter()
            .map(|s| s.to_string()),
    );
    header
}

fn optional(value: Option<f64>) -> String {
    value.map(format_value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::applicant::{CategorySums, ClaimedValues, EvaluationStatus, ModuleMatch};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn categories() -> Vec<String> {
        vec!["VWL".to_string(), "BWL".to_string()]
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_header_written_on_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/report.csv");
        let writer = ReportWriter::create(&path, &categories()).unwrap();
        assert_eq!(writer.rows(), 0);

        let rows = read_rows(&path);
        assert_eq!(
            rows,
            vec![vec![
                "applicant_id", "claimed_grade", "ocr_grade", "ocr_VWL", "ocr_BWL", "claimed_VWL",
                "claimed_BWL", "status", "reasons", "matched_modules", "unrecognized_lines",
            ]]
        );
    }

    #[test]
    fn test_record_and_error_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let mut writer = ReportWriter::create(&path, &categories()).unwrap();

        let mut claimed = ClaimedValues::empty(&categories());
        claimed.grade = Some(2.0);
        claimed.credits.add("VWL", 12.5);
        let ocr_credits: CategorySums = [("VWL", 6.0), ("BWL", 0.0)].into_iter().collect();

        writer
            .write_record(&ApplicantRecord {
                id: "123456".to_string(),
                claimed,
                ocr_grade: None,
                ocr_credits,
                matched_modules: Some(vec![
                    ModuleMatch {
                        label: "mikro".to_string(),
                        category: "VWL".to_string(),
                        credits: 6.0,
                        line: 0,
                    },
                    ModuleMatch {
                        label: "Fallback: vwl".to_string(),
                        category: "VWL".to_string(),
                        credits: 0.5,
                        line: 3,
                    },
                ]),
                unrecognized_lines: Some(vec!["Sport".to_string(), "Kunst".to_string()]),
                status: EvaluationStatus::NotSatisfied,
                reasons: "BWL insufficient (0.0 < 5.0)".to_string(),
            })
            .unwrap();
        writer.write_error("unknown_idx_1", "session error: boom").unwrap();
        assert_eq!(writer.rows(), 2);

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            vec![
                "123456", "2.0", "", "6.0", "0.0", "12.5", "0.0", "Not satisfied",
                "BWL insufficient (0.0 < 5.0)", "mikro->VWL:6.0 | Fallback: vwl->VWL:0.5",
                "Sport | Kunst",
            ]
        );
        assert_eq!(
            rows[2],
            vec![
                "unknown_idx_1", "ERROR", "ERROR", "ERROR", "ERROR", "ERROR", "ERROR",
                "FATAL ERROR", "session error: boom", "", "",
            ]
        );
    }

    #[test]
    fn test_whitelist_row_marks_lists_not_applicable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let mut writer = ReportWriter::create(&path, &categories()).unwrap();

        writer
            .write_record(&ApplicantRecord {
                id: "777777".to_string(),
                claimed: ClaimedValues::empty(&categories()),
                ocr_grade: Some(1.3),
                ocr_credits: CategorySums::zeroed(&categories()),
                matched_modules: None,
                unrecognized_lines: None,
                status: EvaluationStatus::WhitelistAdmitted,
                reasons: "university whitelist: musteruniversität".to_string(),
            })
            .unwrap();

        let rows = read_rows(&path);
        assert_eq!(&rows[1][7..], &["Admitted (whitelist)", "university whitelist: musteruniversität", "N/A (whitelist)", "N/A (whitelist)"]);
    }
}
