/// `load_config` module: reads the user's YAML settings file into [`Config`].
///
/// The file lives at `$HOME/go/bin/config.yaml` unless `--config` points elsewhere.
/// Recognised keys are `m2c-url`, `ingest-bucket`, `ipfs-gateway` and
/// `https-proxy`; anything else in the file is ignored.
///
/// # Errors
/// Failures use `anyhow::Error` and are fatal at startup: the CLI exits before
/// any fetch, upload or trigger is attempted.
use ab2_core::config::Config;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Location of the settings file relative to the home directory.
pub const DEFAULT_CONFIG_RELATIVE: &str = "go/bin/config.yaml";

/// `$HOME/go/bin/config.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        error!("Could not determine home directory");
        anyhow::anyhow!("Could not determine home directory for config lookup")
    })?;
    Ok(home.join(DEFAULT_CONFIG_RELATIVE))
}

/// Loads and validates the YAML config at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: Config = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if config.ingest_bucket.trim().is_empty() {
        error!(config_path = ?path_ref, "ingest-bucket is empty");
        anyhow::bail!("ingest-bucket must not be empty in {:?}", path_ref);
    }

    config.trace_loaded();
    Ok(config)
}
