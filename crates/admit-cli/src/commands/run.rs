//! Run command - evaluate every applicant of an applicants directory.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use admit_core::documents::create_recognizer;
use admit_core::pipeline::{ApplicantProgress, DirectorySession, EvaluationRun, RunSummary};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Directory with one sub-directory per applicant
    #[arg(short, long, required = true)]
    applicants: PathBuf,

    /// Report file (default: from configuration)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !args.applicants.is_dir() {
        anyhow::bail!("Applicants directory not found: {}", args.applicants.display());
    }

    let recognizer = create_recognizer(&config.recognition);
    let recognizer_name = recognizer.name().to_string();
    let mut evaluation = EvaluationRun::new(config, recognizer)?;
    if let Some(output) = args.output {
        evaluation = evaluation.with_output(output);
    }

    println!(
        "{} {} module mappings, {} whitelist entries, {} recognition",
        style("ℹ").blue(),
        evaluation.mapping().len(),
        evaluation.whitelist().len(),
        recognizer_name
    );
    info!("Evaluating applicants in {}", args.applicants.display());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut session = DirectorySession::new(&args.applicants);
    let result = evaluation.execute_with(&mut session, |progress: &ApplicantProgress| {
        pb.set_length(progress.total as u64);
        pb.set_position(progress.position as u64);
        pb.set_message(progress.id.clone());
    });
    pb.finish_and_clear();

    print_summary(&result?);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} Evaluated {} applicants in {}ms",
        style("✓").green(),
        summary.total,
        summary.processing_time_ms
    );
    println!(
        "   {} satisfied, {} not satisfied, {} whitelisted, {} errors",
        style(summary.satisfied).green(),
        style(summary.not_satisfied).yellow(),
        style(summary.whitelisted).cyan(),
        style(summary.errors).red()
    );
    println!(
        "{} Report written to {}",
        style("✓").green(),
        summary.output.display()
    );
}
