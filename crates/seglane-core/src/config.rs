use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::export::{DEFAULT_VCD_MODULE, VcdOptions};

pub const CONFIG_PATH_ENV: &str = "SEGLANE_CONFIG_PATH";
pub const CONFIG_FILE_NAME: &str = "seglane.config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeglaneConfig {
    pub capture: CaptureConfig,
    pub export: ExportConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub default_timebase: u64,
    pub max_channel_id: u32,
    pub deglitch_threshold_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub vcd_module: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    pub log_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_timebase: 1_000_000,
            max_channel_id: 15,
            deglitch_threshold_seconds: 0.000_002,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/exports"),
            vcd_module: DEFAULT_VCD_MODULE.to_string(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: "info,seglane_core=debug".to_string(),
            trace_file_prefix: "seglane".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl ExportConfig {
    #[must_use]
    pub fn vcd_options(&self) -> VcdOptions {
        VcdOptions::with_module(self.vcd_module.clone())
    }
}

impl SeglaneConfig {
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; set {CONFIG_PATH_ENV} or add one to the capture workspace")
        })?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file {}", config_path.display()))?;

        let config: SeglaneConfig = toml::from_str(&content).with_context(|| {
            format!("failed to parse config TOML from {}", config_path.display())
        })?;

        info!(path = %config_path.display(), "configuration loaded");
        Ok(config)
    }

    /// Falls back to defaults when no configuration file exists; a file that
    /// exists but fails to parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        match discover_config_path() {
            Ok(config_path) => Self::load_from(&config_path),
            Err(error) => {
                debug!(%error, "no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
        debug!(path = %path.display(), "{CONFIG_PATH_ENV} does not name a file");
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    find_config_from(&cwd)
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found in {} or its ancestors", cwd.display()))
}

/// Nearest `seglane.config.toml` in `start` or one of its ancestors, so the
/// tools work from any directory inside a capture workspace.
fn find_config_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
