//! Configuration layering for the command-line front end.
//!
//! Precedence, lowest first: built-in defaults, RON file, environment
//! (including `.env`), command-line flags. Clap folds the last two together.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use pagepress_engine::{EngineConfig, SubmitSettings};
use serde::Deserialize;

/// Shape of the optional `--config` file.
///
/// ```ron
/// (
///     internal_url: Some("http://engine:8000"),
///     external_url: Some("https://pdf.example.org"),
///     request_timeout_secs: Some(60),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub internal_url: Option<String>,
    pub external_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub internal_url: Option<String>,
    pub external_url: Option<String>,
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    ron::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
}

pub fn build_engine_config(file: FileConfig, overrides: Overrides) -> EngineConfig {
    let defaults = SubmitSettings::default();
    EngineConfig {
        internal_base: overrides.internal_url.or(file.internal_url),
        external_base: overrides.external_url.or(file.external_url),
        submit: SubmitSettings {
            connect_timeout: file
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            request_timeout: file
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
        },
    }
}
