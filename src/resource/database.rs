//! Logical database controller.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::Database;
use crate::diff::ids_equal;
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, LocalizedId, Region};
use crate::provider::Provider;
use crate::resource::{Plan, PlanBuilder};
use crate::wait::{ConflictRetry, Operation};

/// Longest accepted database name.
pub const MAX_DATABASE_NAME_LEN: usize = 63;

/// Names the engines keep for themselves.
pub const RESERVED_DATABASE_NAMES: [&str; 8] = [
    "mysql",
    "postgres",
    "template0",
    "template1",
    "information_schema",
    "performance_schema",
    "sys",
    "rdb",
];

/// Declared database.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DatabaseConfig {
    /// Region; defaults to the instance region.
    #[serde(default)]
    pub region: Option<String>,
    /// Owning instance, bare or localized.
    pub instance_id: String,
    /// Database name.
    pub name: String,
}

/// Persisted database.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DatabaseState {
    /// `<region>/<instance>/<name>`.
    pub id: String,
    /// Region of the owning instance.
    pub region: Region,
    /// `<region>/<uuid>` of the owning instance.
    pub instance_id: String,
    /// Database name.
    pub name: String,
    /// Owning user.
    pub owner: String,
    /// Whether the service manages the database.
    pub managed: bool,
    /// Size in bytes.
    pub size: u64,
}

/// Checks a database name against the naming rules.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidAttribute`] for an empty, overlong,
/// malformed or reserved name.
pub fn validate_database_name(name: &str) -> Result<(), ProviderError> {
    if name.is_empty() || name.len() > MAX_DATABASE_NAME_LEN {
        return Err(ProviderError::invalid_attribute(
            "name",
            format!("must be between 1 and {MAX_DATABASE_NAME_LEN} characters"),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-')))
    {
        return Err(ProviderError::invalid_attribute(
            "name",
            format!("character {bad:?} is not allowed"),
        ));
    }
    if RESERVED_DATABASE_NAMES.contains(&name) {
        return Err(ProviderError::invalid_attribute(
            "name",
            format!("{name} is reserved by the engine"),
        ));
    }
    Ok(())
}

fn database_state(region: &Region, instance_id: &str, database: Database) -> DatabaseState {
    DatabaseState {
        id: LocalizedId::nested(region.clone(), instance_id, database.name.clone()).to_string(),
        region: region.clone(),
        instance_id: locality::format_localized(region, instance_id),
        name: database.name,
        owner: database.owner,
        managed: database.managed,
        size: database.size,
    }
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared database against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality and naming errors.
    pub fn plan_database(
        &self,
        prior: Option<&DatabaseState>,
        config: &DatabaseConfig,
    ) -> Result<Plan, ProviderError> {
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        LocalityCheck::new(region.clone())
            .attribute("instance_id", Some(config.instance_id.as_str()))
            .verify()?;
        validate_database_name(&config.name)?;
        let Some(state) = prior else {
            return Ok(Plan::Create);
        };
        Ok(PlanBuilder::default()
            .replace_if("instance_id", !ids_equal(&config.instance_id, &state.instance_id))
            .replace_if("name", config.name != state.name)
            .replace_if("region", region != state.region)
            .build())
    }

    /// Creates a database, retrying while the instance is busy.
    ///
    /// # Errors
    ///
    /// Returns plan errors, remote failures and deadline outcomes.
    pub async fn create_database(
        &self,
        op: &Operation,
        config: &DatabaseConfig,
    ) -> Result<DatabaseState, ProviderError> {
        self.plan_database(None, config)?;
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        let instance_id = locality::expand_id(&config.instance_id);
        info!(instance_id, database = %config.name, "creating database");
        let created = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "create_database",
                instance_id,
                || async {
                    Ok(self
                        .client
                        .create_database(&region, instance_id, &config.name)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &region, instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        Ok(database_state(&region, instance_id, created))
    }

    /// Refreshes a database; `None` means it or its instance is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed identifier,
    /// non-404 remote failures and deadline outcomes.
    pub async fn read_database(
        &self,
        op: &Operation,
        prior: &DatabaseState,
    ) -> Result<Option<DatabaseState>, ProviderError> {
        let (scope, instance_id, name) = locality::parse_localized_nested(&prior.id)?;
        let region = scope.region();
        let listed = op
            .deadline
            .guard("list_databases", &instance_id, async {
                Ok(self
                    .client
                    .list_databases(&region, &instance_id, Some(&name))
                    .await?)
            })
            .await;
        let found = tolerate_not_found(listed)?
            .unwrap_or_default()
            .into_iter()
            .find(|database| database.name == name);
        Ok(found.map(|database| database_state(&region, &instance_id, database)))
    }

    /// Drops a database; a missing database or instance counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_database(
        &self,
        op: &Operation,
        state: &DatabaseState,
    ) -> Result<(), ProviderError> {
        let (scope, instance_id, name) = locality::parse_localized_nested(&state.id)?;
        let region = scope.region();
        info!(instance_id = %instance_id, database = %name, "deleting database");
        let deleted = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "delete_database",
                &instance_id,
                || async {
                    Ok(self
                        .client
                        .delete_database(&region, &instance_id, &name)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &region, &instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await;
        tolerate_not_found(deleted)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::api::{ApiError, RdbApi};
    use crate::test_support::{FakeScaleway, sample_instance};

    fn region() -> Region {
        Region::parse("fr-par").unwrap_or_else(|err| panic!("region: {err}"))
    }

    fn setup() -> (FakeScaleway, Provider<FakeScaleway>) {
        let fake = FakeScaleway::new();
        fake.seed_instance(sample_instance("db1", &region()));
        let provider = Provider::new(fake.clone())
            .with_default_region(region())
            .with_retry_interval(Duration::from_secs(1));
        (fake, provider)
    }

    fn declared(name: &str) -> DatabaseConfig {
        DatabaseConfig {
            region: None,
            instance_id: String::from("fr-par/db1"),
            name: name.to_owned(),
        }
    }

    fn operation() -> Operation {
        Operation::with_timeout(Duration::from_secs(600))
    }

    #[rstest]
    #[case::plain("orders")]
    #[case::punctuated("app_v2-$main")]
    #[case::longest("a234567890123456789012345678901234567890123456789012345678901ab")]
    fn valid_names_pass(#[case] name: &str) {
        validate_database_name(name).unwrap_or_else(|err| panic!("{name}: {err}"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::too_long("a2345678901234567890123456789012345678901234567890123456789012ab")]
    #[case::space("my db")]
    #[case::dot("app.db")]
    #[case::reserved("postgres")]
    #[case::reserved_rdb("rdb")]
    fn invalid_names_fail(#[case] name: &str) {
        let err = validate_database_name(name).expect_err("name must be rejected");
        assert!(matches!(err, ProviderError::InvalidAttribute { .. }), "{err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn create_retries_conflicts_and_composes_the_id() {
        let (fake, provider) = setup();
        fake.fail_next(
            "create_database",
            ApiError::Conflict(String::from("instance is busy")),
        );

        let state = provider
            .create_database(&operation(), &declared("orders"))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));

        assert_eq!(state.id, "fr-par/db1/orders");
        assert_eq!(state.instance_id, "fr-par/db1");
        assert_eq!(fake.call_count("create_database"), 2);
        assert_eq!(fake.databases("db1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn read_clears_state_when_database_or_instance_is_gone() {
        let (fake, provider) = setup();
        let op = operation();
        let state = provider
            .create_database(&op, &declared("orders"))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));

        let present = provider
            .read_database(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("read: {err}"));
        assert_eq!(present.as_ref().map(|db| db.name.as_str()), Some("orders"));

        provider
            .delete_database(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("delete: {err}"));
        let missing = provider
            .read_database(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("read: {err}"));
        assert!(missing.is_none());

        fake.seed_database(
            "db1",
            Database {
                name: String::from("orders"),
                ..Database::default()
            },
        );
        let op_instance_gone = operation();
        provider
            .client()
            .delete_instance(&region(), "db1")
            .await
            .unwrap_or_else(|err| panic!("drop instance: {err}"));
        let orphan = provider
            .read_database(&op_instance_gone, &state)
            .await
            .unwrap_or_else(|err| panic!("read: {err}"));
        assert!(orphan.is_none());
        provider
            .delete_database(&op_instance_gone, &state)
            .await
            .unwrap_or_else(|err| panic!("delete after instance loss: {err}"));
    }

    #[tokio::test(start_paused = true)]
    async fn renaming_forces_replacement() {
        let (_fake, provider) = setup();
        let state = provider
            .create_database(&operation(), &declared("orders"))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        assert_eq!(
            provider.plan_database(Some(&state), &declared("orders")).ok(),
            Some(Plan::NoOp)
        );
        assert_eq!(
            provider.plan_database(Some(&state), &declared("billing")).ok(),
            Some(Plan::Replace {
                attributes: vec![String::from("name")]
            })
        );
    }
}
