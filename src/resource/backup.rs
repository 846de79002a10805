//! Logical database backup controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::{
    ArtifactStatus, CreateDatabaseBackupRequest, DatabaseBackup, UpdateDatabaseBackupRequest,
};
use crate::diff::ids_equal;
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, LocalizedId, Region};
use crate::provider::Provider;
use crate::resource::{Plan, PlanBuilder, check_expiry_kept};
use crate::wait::{ConflictRetry, Operation};

/// Declared backup.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BackupConfig {
    /// Region; defaults to the instance region.
    #[serde(default)]
    pub region: Option<String>,
    /// Source instance, bare or localized.
    pub instance_id: String,
    /// Database to dump.
    pub database_name: String,
    /// Display name.
    pub name: String,
    /// Expiration date; cannot be removed once set.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Persisted backup.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BackupState {
    /// `<region>/<uuid>`.
    pub id: String,
    /// Region of the backup.
    pub region: Region,
    /// `<region>/<uuid>` of the source instance.
    pub instance_id: String,
    /// Dumped database.
    pub database_name: String,
    /// Display name.
    pub name: String,
    /// Expiration date.
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: ArtifactStatus,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Source instance name.
    pub instance_name: String,
    /// Whether the backup is stored in the instance region.
    pub same_region: bool,
    /// Creation date.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update date.
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DatabaseBackup> for BackupState {
    fn from(backup: DatabaseBackup) -> Self {
        Self {
            id: LocalizedId::new(backup.region.clone(), backup.id).to_string(),
            instance_id: locality::format_localized(&backup.region, &backup.instance_id),
            region: backup.region,
            database_name: backup.database_name,
            name: backup.name,
            expires_at: backup.expires_at,
            status: backup.status,
            size: backup.size,
            instance_name: backup.instance_name,
            same_region: backup.same_region,
            created_at: backup.created_at,
            updated_at: backup.updated_at,
        }
    }
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared backup against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality errors and
    /// [`ProviderError::ExpiryRemovalForbidden`].
    pub fn plan_backup(
        &self,
        prior: Option<&BackupState>,
        config: &BackupConfig,
    ) -> Result<Plan, ProviderError> {
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        LocalityCheck::new(region.clone())
            .attribute("instance_id", Some(config.instance_id.as_str()))
            .verify()?;
        let Some(state) = prior else {
            return Ok(Plan::Create);
        };
        check_expiry_kept(&state.id, state.expires_at, config.expires_at)?;
        Ok(PlanBuilder::default()
            .replace_if("instance_id", !ids_equal(&config.instance_id, &state.instance_id))
            .replace_if("database_name", config.database_name != state.database_name)
            .replace_if("region", region != state.region)
            .update_if(config.name != state.name || config.expires_at != state.expires_at)
            .build())
    }

    /// Dumps a database and waits for the backup to settle.
    ///
    /// # Errors
    ///
    /// Returns plan errors, remote failures and deadline outcomes.
    pub async fn create_backup(
        &self,
        op: &Operation,
        config: &BackupConfig,
    ) -> Result<BackupState, ProviderError> {
        self.plan_backup(None, config)?;
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        let instance_id = locality::expand_id(&config.instance_id);
        let request = CreateDatabaseBackupRequest {
            instance_id: instance_id.to_owned(),
            database_name: config.database_name.clone(),
            name: config.name.clone(),
            expires_at: config.expires_at,
        };
        info!(
            instance_id,
            database = %config.database_name,
            backup = %config.name,
            "creating database backup"
        );
        let created = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "create_database_backup",
                instance_id,
                || async {
                    Ok(self
                        .client
                        .create_database_backup(&region, &request)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &region, instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        let ready = self
            .wait_for_database_backup(&op.deadline, &region, &created.id)
            .await?;
        Ok(ready.into())
    }

    /// Refreshes a backup; `None` means it is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed identifier,
    /// non-404 remote failures and deadline outcomes.
    pub async fn read_backup(
        &self,
        op: &Operation,
        prior: &BackupState,
    ) -> Result<Option<BackupState>, ProviderError> {
        let (scope, backup_id) = locality::parse_localized(&prior.id)?;
        let waited = self
            .wait_for_database_backup(&op.deadline, &scope.region(), &backup_id)
            .await;
        Ok(tolerate_not_found(waited)?.map(BackupState::from))
    }

    /// Renames a backup or moves its expiration date.
    ///
    /// # Errors
    ///
    /// Returns plan errors (a required replacement surfaces as
    /// [`ProviderError::InvalidAttribute`]), remote failures and deadline
    /// outcomes.
    pub async fn update_backup(
        &self,
        op: &Operation,
        prior: &BackupState,
        config: &BackupConfig,
    ) -> Result<BackupState, ProviderError> {
        if let Plan::Replace { attributes } = self.plan_backup(Some(prior), config)? {
            return Err(ProviderError::invalid_attribute(
                &attributes.join(","),
                "cannot change in place; the backup must be replaced",
            ));
        }
        let (scope, backup_id) = locality::parse_localized(&prior.id)?;
        let region = scope.region();
        let request = UpdateDatabaseBackupRequest {
            name: (config.name != prior.name).then(|| config.name.clone()),
            expires_at: config.expires_at.filter(|_| config.expires_at != prior.expires_at),
        };
        if request == UpdateDatabaseBackupRequest::default() {
            return Ok(prior.clone());
        }
        info!(backup_id = %backup_id, "updating database backup");
        op.deadline
            .guard("update_database_backup", &backup_id, async {
                Ok(self
                    .client
                    .update_database_backup(&region, &backup_id, &request)
                    .await?)
            })
            .await?;
        let ready = self
            .wait_for_database_backup(&op.deadline, &region, &backup_id)
            .await?;
        Ok(ready.into())
    }

    /// Deletes a backup; a missing backup counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_backup(&self, op: &Operation, state: &BackupState) -> Result<(), ProviderError> {
        let (scope, backup_id) = locality::parse_localized(&state.id)?;
        let region = scope.region();
        let waited = self
            .wait_for_database_backup(&op.deadline, &region, &backup_id)
            .await;
        if tolerate_not_found(waited)?.is_none() {
            return Ok(());
        }
        info!(backup_id = %backup_id, "deleting database backup");
        let deleted = op
            .deadline
            .guard("delete_database_backup", &backup_id, async {
                Ok(self
                    .client
                    .delete_database_backup(&region, &backup_id)
                    .await?)
            })
            .await;
        tolerate_not_found(deleted)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::api::types::Database;
    use crate::test_support::{FakeScaleway, sample_instance};

    fn setup() -> (FakeScaleway, Provider<FakeScaleway>) {
        let region = Region::parse("fr-par").unwrap_or_else(|err| panic!("region: {err}"));
        let fake = FakeScaleway::new();
        fake.seed_instance(sample_instance("db1", &region));
        fake.seed_database(
            "db1",
            Database {
                name: String::from("orders"),
                ..Database::default()
            },
        );
        let provider = Provider::new(fake.clone())
            .with_default_region(region)
            .with_retry_interval(Duration::from_secs(1));
        (fake, provider)
    }

    fn declared(database_name: &str, expires_at: Option<DateTime<Utc>>) -> BackupConfig {
        BackupConfig {
            region: None,
            instance_id: String::from("fr-par/db1"),
            database_name: database_name.to_owned(),
            name: String::from("orders-dump"),
            expires_at,
        }
    }

    fn operation() -> Operation {
        Operation::with_timeout(Duration::from_secs(600))
    }

    #[tokio::test(start_paused = true)]
    async fn backup_lifecycle() {
        let (fake, provider) = setup();
        let op = operation();
        let expires = Utc.with_ymd_and_hms(2031, 6, 1, 12, 0, 0).single();

        let state = provider
            .create_backup(&op, &declared("orders", expires))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        assert_eq!(state.database_name, "orders");
        assert_eq!(state.expires_at, expires);
        assert_eq!(state.status, ArtifactStatus::Ready);

        let err = provider
            .update_backup(&op, &state, &declared("orders", None))
            .await
            .expect_err("expiry removal must fail");
        assert!(matches!(err, ProviderError::ExpiryRemovalForbidden { .. }), "{err:?}");
        assert_eq!(fake.call_count("update_database_backup"), 0);

        provider
            .delete_backup(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("delete: {err}"));
        provider
            .delete_backup(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("second delete: {err}"));
        assert_eq!(fake.call_count("delete_database_backup"), 1);
        let read = provider
            .read_backup(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("read: {err}"));
        assert!(read.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn changing_the_database_forces_replacement() {
        let (_fake, provider) = setup();
        let state = provider
            .create_backup(&operation(), &declared("orders", None))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));

        assert_eq!(
            provider.plan_backup(Some(&state), &declared("billing", None)).ok(),
            Some(Plan::Replace {
                attributes: vec![String::from("database_name")]
            })
        );
        let err = provider
            .update_backup(&operation(), &state, &declared("billing", None))
            .await
            .expect_err("replacement cannot be applied in place");
        assert!(matches!(err, ProviderError::InvalidAttribute { .. }), "{err:?}");
    }
}
