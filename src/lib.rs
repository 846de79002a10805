//! Core of a Terraform-style provider for Scaleway managed relational
//! databases.
//!
//! The crate plans and reconciles RDB instances and their sub-resources
//! (databases, users, privileges, ACL rule sets, read replicas, snapshots and
//! logical backups) against the remote API, and exposes a handful of
//! one-shot actions. Controllers are `impl` blocks on [`Provider`]; the
//! remote is reached through the [`api::ScalewayApi`] traits so tests can
//! swap in [`test_support::FakeScaleway`].

pub mod action;
pub mod api;
pub mod config;
pub mod diagnostics;
pub mod diff;
pub mod endpoint;
pub mod error;
pub mod locality;
pub mod provider;
pub mod resource;
pub mod test_support;
pub mod wait;

pub use api::{ApiError, ScalewayApi, ScalewayClient};
pub use config::{ConfigError, ProviderConfig};
pub use diagnostics::{Diagnostic, Diagnostics, WarningKind};
pub use error::ProviderError;
pub use locality::{Locality, LocalizedId, Region, Zone};
pub use provider::Provider;
pub use resource::Plan;
pub use wait::{Deadline, Operation, Phase, Timeouts};
