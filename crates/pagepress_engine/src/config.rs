use std::time::Duration;

use url::Url;

pub(crate) const INTERNAL_BASE_NAME: &str = "internal service url";
pub(crate) const EXTERNAL_BASE_NAME: &str = "external base url";

/// A required address is missing or unusable. Fails startup, never a job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not configured")]
    Missing { name: &'static str },
    #[error("{name} {value:?} is not a usable http(s) url: {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct SubmitSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Unvalidated engine configuration, as assembled from files, env and flags.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Address the start request is sent to (server side only in a browser deployment).
    pub internal_base: Option<String>,
    /// Externally reachable address used for the progress stream and download links.
    pub external_base: Option<String>,
    pub submit: SubmitSettings,
}

impl EngineConfig {
    pub fn new(internal_base: impl Into<String>, external_base: impl Into<String>) -> Self {
        Self {
            internal_base: Some(internal_base.into()),
            external_base: Some(external_base.into()),
            submit: SubmitSettings::default(),
        }
    }

    /// Checks both addresses; both are required.
    pub fn validate(&self) -> Result<Endpoints, ConfigError> {
        Ok(Endpoints {
            internal: parse_base(INTERNAL_BASE_NAME, self.internal_base.as_deref())?,
            external: parse_base(EXTERNAL_BASE_NAME, self.external_base.as_deref())?,
        })
    }
}

/// Validated service addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub internal: Url,
    pub external: Url,
}

pub(crate) fn parse_base(name: &'static str, value: Option<&str>) -> Result<Url, ConfigError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing { name })?;

    let invalid = |reason: String| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be used as a base".to_string()));
    }
    Ok(url)
}
