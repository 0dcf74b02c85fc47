//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use admit_core::models::config::AdmissionConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration, its validation result and run paths
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(config_path),
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Path => show_path(),
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("admit")
        .join("config.json")
}

fn show_config(config_path: Option<&str>) -> anyhow::Result<()> {
    if config_path.is_none() && !default_config_path().exists() {
        println!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }
    let config = super::load_config(config_path)?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    println!();

    match config.validate() {
        Ok(()) => println!(
            "{} Configuration is valid: {} requirement categories ({})",
            style("✓").green(),
            config.requirements.len(),
            config.categories().join(", ")
        ),
        Err(e) => println!(
            "{} Configuration cannot be used for a run: {}",
            style("✗").red(),
            e
        ),
    }

    let paths = config.resolved_paths();
    println!();
    println!("Run paths:");
    print_path("module mapping", &paths.module_map);
    if let Some(whitelist) = &config.whitelist_path {
        print_path("whitelist", whitelist);
    }
    print_path("downloads", &paths.download_dir);
    print_path("extraction", &paths.extract_dir);
    println!("  report: {}", paths.output_csv.display());

    Ok(())
}

fn print_path(name: &str, path: &Path) {
    let status = if path.exists() {
        style("exists").green()
    } else {
        style("missing").yellow()
    };
    println!("  {}: {} ({})", name, path.display(), status);
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(default_config_path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    AdmissionConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );
    println!("Add the credit requirements per category before the first run.");

    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    let config_path = default_config_path();

    println!("Configuration file: {}", config_path.display());

    if !config_path.exists() {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'admit config init' to create a configuration file.");
        return Ok(());
    }

    match AdmissionConfig::from_file(&config_path) {
        Ok(config) if config.requirements.is_empty() => println!(
            "Status: {} (no requirement categories yet)",
            style("exists").yellow()
        ),
        Ok(config) => println!(
            "Status: {} ({})",
            style("exists").green(),
            config.categories().join(", ")
        ),
        Err(e) => println!("Status: {} ({})", style("unreadable").red(), e),
    }

    Ok(())
}
