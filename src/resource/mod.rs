//! Resource controllers.
//!
//! Each resource exposes a pure `plan_*` check plus create, read, update
//! and delete operations implemented on [`crate::provider::Provider`].
//! Declared configuration arrives as a `*Config` value and persisted state
//! as a `*State` value whose `id` is always the localized form.

pub mod acl;
pub mod backup;
pub mod database;
pub mod instance;
pub mod privilege;
pub mod read_replica;
pub mod snapshot;
pub mod user;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Outcome of a plan-time check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Nothing exists yet.
    Create,
    /// Apply in place.
    Update,
    /// Destroy and recreate because creation-only attributes changed.
    Replace {
        /// Attributes forcing the replacement.
        attributes: Vec<String>,
    },
    /// Declared and observed state agree.
    NoOp,
}

/// Collects attribute changes into a [`Plan`].
#[derive(Debug, Default)]
pub(crate) struct PlanBuilder {
    replace: Vec<String>,
    update: bool,
}

impl PlanBuilder {
    pub(crate) fn replace_if(mut self, attribute: &str, changed: bool) -> Self {
        if changed {
            self.replace.push(attribute.to_owned());
        }
        self
    }

    pub(crate) const fn update_if(mut self, changed: bool) -> Self {
        self.update |= changed;
        self
    }

    pub(crate) fn build(self) -> Plan {
        if !self.replace.is_empty() {
            return Plan::Replace {
                attributes: self.replace,
            };
        }
        if self.update { Plan::Update } else { Plan::NoOp }
    }
}

/// Declared password source.
///
/// Write-only values are never persisted; only their version reaches
/// state, so bumping the version is the sole rotation signal.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordConfig {
    /// Password stored in state.
    Inline(String),
    /// Password withheld from state.
    WriteOnly {
        /// Secret value.
        value: String,
        /// Rotation counter.
        version: u64,
    },
}

/// Persisted trace of a password source.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordState {
    /// Inline password.
    Inline(String),
    /// Write-only password at `version`.
    WriteOnly {
        /// Rotation counter last applied.
        version: u64,
    },
    /// Inline source declared over a write-only one without a rotation.
    ///
    /// The remote still holds the write-only secret at `version`; `value` is
    /// only the baseline later inline changes are compared against.
    InlineUnapplied {
        /// Declared inline value, never sent.
        value: String,
        /// Write-only rotation counter still in effect.
        version: u64,
    },
}

impl PasswordConfig {
    /// Returns the secret to transmit.
    #[must_use]
    pub fn secret(&self) -> &str {
        match self {
            Self::Inline(value) | Self::WriteOnly { value, .. } => value,
        }
    }

    /// Returns the value persisted after applying this source.
    #[must_use]
    pub fn to_state(&self) -> PasswordState {
        match self {
            Self::Inline(value) => PasswordState::Inline(value.clone()),
            Self::WriteOnly { version, .. } => PasswordState::WriteOnly { version: *version },
        }
    }

    /// Decides whether the password must be sent to the remote.
    ///
    /// An inline value is sent when it differs from a prior inline value. A
    /// write-only value is sent only when its version differs from the prior
    /// write-only version (zero when there was none). Switching source kinds
    /// alone never triggers an update.
    #[must_use]
    pub fn needs_update(&self, prior: Option<&PasswordState>) -> bool {
        match (self, prior) {
            (Self::Inline(_), None) => true,
            (
                Self::Inline(value),
                Some(
                    PasswordState::Inline(previous)
                    | PasswordState::InlineUnapplied {
                        value: previous, ..
                    },
                ),
            ) => value != previous,
            (Self::Inline(_), Some(PasswordState::WriteOnly { .. })) => false,
            (
                Self::WriteOnly { version, .. },
                Some(
                    PasswordState::WriteOnly { version: previous }
                    | PasswordState::InlineUnapplied {
                        version: previous, ..
                    },
                ),
            ) => version != previous,
            (Self::WriteOnly { version, .. }, _) => *version != 0,
        }
    }

    /// Returns the state to persist once an update has run.
    ///
    /// When [`Self::needs_update`] held, the secret was sent and the declared
    /// source is recorded as applied. Otherwise the prior trace survives,
    /// except that an inline source declared over a write-only one is kept
    /// as [`PasswordState::InlineUnapplied`] so its next change is sent.
    #[must_use]
    pub fn settled_state(&self, prior: Option<&PasswordState>) -> PasswordState {
        if self.needs_update(prior) {
            return self.to_state();
        }
        match (self, prior) {
            (Self::Inline(value), Some(PasswordState::WriteOnly { version })) => {
                PasswordState::InlineUnapplied {
                    value: value.clone(),
                    version: *version,
                }
            }
            (Self::WriteOnly { .. }, Some(PasswordState::InlineUnapplied { .. })) | (_, None) => {
                self.to_state()
            }
            (_, Some(previous)) => previous.clone(),
        }
    }
}

/// Rejects removing an expiration date once one was set.
///
/// # Errors
///
/// Returns [`ProviderError::ExpiryRemovalForbidden`] naming `resource_id`.
pub fn check_expiry_kept(
    resource_id: &str,
    prior: Option<DateTime<Utc>>,
    declared: Option<DateTime<Utc>>,
) -> Result<(), ProviderError> {
    if prior.is_some() && declared.is_none() {
        return Err(ProviderError::ExpiryRemovalForbidden {
            resource: resource_id.to_owned(),
        });
    }
    Ok(())
}
