pub mod check;
pub mod config;
pub mod run;

use std::path::Path;

use tracing::debug;

use admit_core::models::config::AdmissionConfig;

/// Configuration from `--config`, else the default file, else built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<AdmissionConfig> {
    if let Some(path) = config_path {
        return Ok(AdmissionConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(AdmissionConfig::from_file(&default_path)?)
    } else {
        Ok(AdmissionConfig::default())
    }
}
