//! Provider configuration loaded via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ProviderError;
use crate::locality::{Region, Zone};
use crate::wait::Timeouts;

/// Default region used when neither a resource nor an identifier names one.
pub const DEFAULT_REGION: &str = "fr-par";

/// Default zone paired with [`DEFAULT_REGION`].
pub const DEFAULT_ZONE: &str = "fr-par-1";

/// Default base URL of the Scaleway APIs.
pub const DEFAULT_API_URL: &str = "https://api.scaleway.com";

const CONFIG_FILE_NAME: &str = "scaleway-provider.toml";

/// Credentials, default locality and wait tuning, merged from defaults,
/// configuration files and `SCW_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "SCW",
    discovery(
        app_name = "scaleway-provider",
        env_var = "SCW_CONFIG_PATH",
        config_file_name = "scaleway-provider.toml",
        dotfile_name = ".scaleway-provider.toml",
        project_file_name = "scaleway-provider.toml"
    )
)]
pub struct ProviderConfig {
    /// Access key of the API key pair. Not needed to sign requests; kept so
    /// the full credential pair can live in one place.
    pub access_key: Option<String>,
    /// Secret key sent as `X-Auth-Token`. Required.
    pub secret_key: String,
    /// Project new resources are created in when none is declared.
    pub default_project_id: Option<String>,
    /// Organisation owning the default project.
    pub default_organization_id: Option<String>,
    /// Region bound to resources that do not declare one.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub default_region: String,
    /// Zone bound to zonal resources that do not declare one.
    #[ortho_config(default = DEFAULT_ZONE.to_owned())]
    pub default_zone: String,
    /// Base URL of the APIs.
    #[ortho_config(default = DEFAULT_API_URL.to_owned())]
    pub api_url: String,
    /// Seconds between polls while waiting for a terminal status.
    #[ortho_config(default = 30)]
    pub wait_retry_interval_secs: u64,
    /// Per-phase deadline in minutes.
    #[ortho_config(default = 15)]
    pub timeout_minutes: u64,
}

/// Metadata for a configuration field, used to build actionable messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to {CONFIG_FILE_NAME}",
            self.description, self.env_var, self.toml_key
        ))
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::Invalid(format!(
            "{} '{value}' {reason}: fix {} or {} in {CONFIG_FILE_NAME}",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const SECRET_KEY: FieldMetadata =
    FieldMetadata::new("Scaleway API secret key", "SCW_SECRET_KEY", "secret_key");
const REGION: FieldMetadata =
    FieldMetadata::new("default region", "SCW_DEFAULT_REGION", "default_region");
const ZONE: FieldMetadata = FieldMetadata::new("default zone", "SCW_DEFAULT_ZONE", "default_zone");
const API_URL: FieldMetadata = FieldMetadata::new("API URL", "SCW_API_URL", "api_url");
const RETRY_INTERVAL: FieldMetadata = FieldMetadata::new(
    "wait retry interval",
    "SCW_WAIT_RETRY_INTERVAL_SECS",
    "wait_retry_interval_secs",
);
const TIMEOUT: FieldMetadata =
    FieldMetadata::new("phase timeout", "SCW_TIMEOUT_MINUTES", "timeout_minutes");

impl ProviderConfig {
    /// Loads configuration, merging defaults, configuration files,
    /// environment variables and CLI flags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("scaleway-provider")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Messages name the environment variable
    /// and the file key that supply the offending value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for empty required fields and
    /// [`ConfigError::Invalid`] for malformed ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(SECRET_KEY.missing());
        }
        if self.api_url.trim().is_empty() {
            return Err(API_URL.missing());
        }
        if self.wait_retry_interval_secs == 0 {
            return Err(RETRY_INTERVAL.invalid("0", "must be positive"));
        }
        if self.timeout_minutes == 0 {
            return Err(TIMEOUT.invalid("0", "must be positive"));
        }
        let region = self.region()?;
        let zone = self.zone()?;
        if zone.region() != region {
            return Err(ZONE.invalid(
                zone.as_str(),
                &format!("is not in region {region}"),
            ));
        }
        Ok(())
    }

    /// Returns the parsed default region.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the value is empty or not a region.
    pub fn region(&self) -> Result<Region, ConfigError> {
        let value = self.default_region.trim();
        if value.is_empty() {
            return Err(REGION.missing());
        }
        Region::parse(value).map_err(|_| REGION.invalid(value, "is not a region"))
    }

    /// Returns the parsed default zone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the value is empty or not a zone.
    pub fn zone(&self) -> Result<Zone, ConfigError> {
        let value = self.default_zone.trim();
        if value.is_empty() {
            return Err(ZONE.missing());
        }
        Zone::parse(value).map_err(|_| ZONE.invalid(value, "is not a zone"))
    }

    /// Interval between polls while waiting.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.wait_retry_interval_secs)
    }

    /// Per-phase deadlines, all set to `timeout_minutes`.
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(self.timeout_minutes.saturating_mul(60)))
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// A required field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// A field holds a value that cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<ConfigError> for ProviderError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
