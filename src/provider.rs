//! Provider handle shared by every controller.

use std::time::Duration;

use crate::api::{ScalewayApi, ScalewayClient};
use crate::config::{ConfigError, ProviderConfig};
use crate::error::ProviderError;
use crate::locality::{self, LocalizedId, Region, Zone};
use crate::wait::{Phase, Timeouts};

/// Default interval between polls while waiting for a terminal status.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Immutable bundle of the remote client and provider-wide defaults.
///
/// Controllers are `impl` blocks on this type spread across the resource
/// modules.
#[derive(Clone, Debug)]
pub struct Provider<C> {
    pub(crate) client: C,
    pub(crate) default_region: Option<Region>,
    pub(crate) default_zone: Option<Zone>,
    pub(crate) default_project_id: Option<String>,
    pub(crate) retry_interval: Duration,
    pub(crate) timeouts: Timeouts,
}

impl Provider<ScalewayClient> {
    /// Builds a provider from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = ScalewayClient::new(&config.api_url, &config.secret_key);
        Ok(Self {
            client,
            default_region: Some(config.region()?),
            default_zone: Some(config.zone()?),
            default_project_id: config.default_project_id.clone(),
            retry_interval: config.retry_interval(),
            timeouts: config.timeouts(),
        })
    }
}

impl<C: ScalewayApi> Provider<C> {
    /// Wraps `client` with no defaults and the standard wait settings.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self {
            client,
            default_region: None,
            default_zone: None,
            default_project_id: None,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            timeouts: Timeouts::default(),
        }
    }

    /// Sets the default region.
    #[must_use]
    pub fn with_default_region(mut self, region: Region) -> Self {
        self.default_region = Some(region);
        self
    }

    /// Sets the default zone.
    #[must_use]
    pub fn with_default_zone(mut self, zone: Zone) -> Self {
        self.default_zone = Some(zone);
        self
    }

    /// Sets the default project.
    #[must_use]
    pub fn with_default_project(mut self, project_id: impl Into<String>) -> Self {
        self.default_project_id = Some(project_id.into());
        self
    }

    /// Overrides the poll interval used by waits and conflict retries.
    #[must_use]
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Overrides the per-phase deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Returns the remote client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Returns the default region, if configured.
    #[must_use]
    pub const fn default_region(&self) -> Option<&Region> {
        self.default_region.as_ref()
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Returns the deadline duration of `phase`.
    #[must_use]
    pub const fn timeout(&self, phase: Phase) -> Duration {
        self.timeouts.get(phase)
    }

    /// Resolves the region of a resource from its declaration, falling back
    /// to the provider default.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed region and
    /// [`ProviderError::LocalityUnresolved`] when nothing names one.
    pub fn region_for(&self, declared: Option<&str>, resource: &str) -> Result<Region, ProviderError> {
        locality::resolve_region(declared, resource, self.default_region.as_ref())
    }

    /// Decodes a reference to another resource that may be localized or a
    /// bare UUID. Bare UUIDs live in `region` when given, otherwise in the
    /// default region.
    ///
    /// # Errors
    ///
    /// Returns the error raised by [`locality::resolve_reference`].
    pub fn reference(
        &self,
        value: &str,
        region: Option<&Region>,
    ) -> Result<LocalizedId, ProviderError> {
        locality::resolve_reference(value, region.or(self.default_region.as_ref()))
    }
}
