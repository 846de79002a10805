//! Shared fixtures and helpers for provider BDD scenarios.

use std::future::Future;
use std::time::Duration;

use rstest::fixture;
use scaleway_provider::Provider;
use scaleway_provider::diagnostics::Diagnostic;
use scaleway_provider::error::ProviderError;
use scaleway_provider::locality::{self, Region};
use scaleway_provider::resource::acl::AclState;
use scaleway_provider::resource::instance::{InstanceConfig, InstanceState};
use scaleway_provider::resource::privilege::PrivilegeState;
use scaleway_provider::test_support::FakeScaleway;
use scaleway_provider::wait::Operation;

pub const REGION: &str = "fr-par";

#[derive(Clone, Debug)]
pub struct ProviderContext {
    pub fake: FakeScaleway,
    pub provider: Provider<FakeScaleway>,
    pub declared: Option<InstanceConfig>,
    pub instance: Option<InstanceState>,
    pub acl: Option<AclState>,
    pub privilege: Option<PrivilegeState>,
    pub warnings: Vec<Diagnostic>,
    pub failure: Option<ProviderError>,
    pub completed: bool,
}

#[fixture]
pub fn provider_context() -> ProviderContext {
    let fake = FakeScaleway::new();
    let provider = Provider::new(fake.clone())
        .with_default_region(region())
        .with_default_project("project")
        .with_retry_interval(Duration::from_secs(1));
    ProviderContext {
        fake,
        provider,
        declared: None,
        instance: None,
        acl: None,
        privilege: None,
        warnings: Vec::new(),
        failure: None,
        completed: false,
    }
}

pub fn region() -> Region {
    Region::parse(REGION).unwrap_or_else(|err| panic!("region should parse: {err}"))
}

pub fn operation() -> Operation {
    Operation::with_timeout(Duration::from_secs(600))
}

/// Drives a controller future on a paused clock so polling sleeps resolve
/// instantly.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap_or_else(|err| panic!("runtime should build: {err}"));
    runtime.block_on(future)
}

pub fn bare(id: &str) -> String {
    locality::expand_id(id).to_owned()
}

/// Splits a comma-separated list from a step into trimmed items.
pub fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Returns the variant name of an error, as written in feature files.
pub fn variant_name(err: &ProviderError) -> String {
    let rendered = format!("{err:?}");
    rendered
        .split(|ch: char| !ch.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_owned()
}
