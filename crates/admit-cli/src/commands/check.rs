//! Check command - evaluate a single document.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::{debug, info};

use admit_core::catalog::{ModuleMapping, Whitelist};
use admit_core::documents::create_recognizer;
use admit_core::models::applicant::{format_value, ApplicantRecord, ClaimedValues, EvaluationStatus};
use admit_core::models::config::AdmissionConfig;
use admit_core::pipeline::Assessor;

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Document to evaluate (PDF or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Grade the applicant declared in the portal
    #[arg(long)]
    claimed_grade: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text summary
    Text,
    /// JSON output
    Json,
}

pub fn run(args: CheckArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let text = read_document(&args.input, &config)?;
    debug!("Read {} chars from {}", text.len(), args.input.display());

    let paths = config.resolved_paths();
    let mapping = ModuleMapping::load(&paths.module_map, config.matching.key_order)?;
    let whitelist = Whitelist::load(config.whitelist_path.as_deref())?;

    let mut claimed = ClaimedValues::empty(&config.categories());
    claimed.grade = args.claimed_grade;

    let id = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let record = Assessor::new(&config, &mapping, &whitelist).assess(&id, claimed, &text, None);

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&record)?,
        OutputFormat::Text => format_text(&record),
    };
    println!("{}", output);

    Ok(())
}

fn read_document(path: &Path, config: &AdmissionConfig) -> anyhow::Result<String> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if !is_pdf {
        return Ok(fs::read_to_string(path)?);
    }

    let recognizer = create_recognizer(&config.recognition);
    if !recognizer.is_available() {
        anyhow::bail!("Text recognition '{}' is not available", recognizer.name());
    }
    info!("Recognizing {} with {}", path.display(), recognizer.name());
    Ok(recognizer.recognize(path)?)
}

fn format_text(record: &ApplicantRecord) -> String {
    let mut output = String::new();

    let status = match record.status {
        EvaluationStatus::Satisfied => style(record.status).green(),
        EvaluationStatus::NotSatisfied => style(record.status).red(),
        EvaluationStatus::WhitelistAdmitted => style(record.status).cyan(),
    };
    output.push_str(&format!("Document: {}\n", record.id));
    output.push_str(&format!("Status: {}\n", status));
    output.push_str(&format!("Reasons: {}\n", record.reasons));
    output.push('\n');

    let grade = |g: Option<f64>| g.map(format_value).unwrap_or_else(|| "-".to_string());
    output.push_str(&format!(
        "Grade: {} (claimed: {})\n",
        grade(record.ocr_grade),
        grade(record.claimed.grade)
    ));

    if !record.ocr_credits.is_empty() {
        output.push_str("Credits:\n");
        for (category, value) in record.ocr_credits.iter() {
            output.push_str(&format!("  {}: {}\n", category, format_value(*value)));
        }
    }

    if let Some(matched) = &record.matched_modules {
        output.push_str(&format!("\nMatched modules ({}):\n", matched.len()));
        for module in matched {
            output.push_str(&format!("  {}\n", module));
        }
    }

    if let Some(lines) = record.unrecognized_lines.as_ref().filter(|l| !l.is_empty()) {
        output.push_str(&format!("\nUnrecognized lines ({}):\n", lines.len()));
        for line in lines {
            output.push_str(&format!("  {}\n", line));
        }
    }

    output
}
