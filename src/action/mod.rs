//! One-shot actions.
//!
//! An action is a single remote call on an existing entity, optionally
//! followed by a wait on whatever it affected. Every action resolves its
//! region the same way: an explicit `region` wins, then the locality prefix
//! of the target identifier, then the provider default.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::{
    CreateSnapshotRequest, DatabaseBackup, Instance, InstanceLog, JobRun,
    PrepareInstanceLogsRequest, PurgeInstanceLogsRequest, ReadReplica,
    RestoreDatabaseBackupRequest, Snapshot, StartJobDefinitionRequest,
};
use crate::error::ProviderError;
use crate::locality::{self, Region};
use crate::provider::Provider;
use crate::wait::{ConflictRetry, Operation};

/// Starts runs of a serverless job definition.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StartJobDefinition {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Job definition, bare or localized.
    pub job_definition_id: String,
    /// Command override.
    #[serde(default)]
    pub command: Option<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
    /// Number of runs to start.
    #[serde(default)]
    pub replicas: Option<u32>,
    /// Wait for every run to finish.
    #[serde(default)]
    pub wait: bool,
}

/// Takes an on-demand snapshot of an instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateSnapshot {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Source instance, bare or localized.
    pub instance_id: String,
    /// Snapshot name.
    pub name: String,
    /// Expiration date.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Wait for the snapshot to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Produces a download URL for a database backup.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExportDatabaseBackup {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Backup, bare or localized.
    pub backup_id: String,
    /// Wait for the backup to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Restores a database backup into an instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RestoreDatabaseBackup {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Backup, bare or localized.
    pub backup_id: String,
    /// Target instance, bare or localized.
    pub instance_id: String,
    /// Target database; defaults to the dumped one.
    #[serde(default)]
    pub database_name: Option<String>,
    /// Wait for the backup and the target instance to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Turns a read replica into a standalone instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PromoteReadReplica {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Replica, bare or localized.
    pub read_replica_id: String,
    /// Wait for the promoted instance to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Resynchronises a read replica from its primary.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ResetReadReplica {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Replica, bare or localized.
    pub read_replica_id: String,
    /// Wait for the replica to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Renews the TLS certificate of an instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RenewInstanceCertificate {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Instance, bare or localized.
    pub instance_id: String,
    /// Wait for the instance to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Deletes collected logs of an instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PurgeInstanceLogs {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Instance, bare or localized.
    pub instance_id: String,
    /// Restricts the purge to one log file.
    #[serde(default)]
    pub log_name: Option<String>,
    /// Wait for the instance to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Prepares downloadable log archives.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrepareInstanceLogs {
    /// Explicit region.
    #[serde(default)]
    pub region: Option<String>,
    /// Instance, bare or localized.
    pub instance_id: String,
    /// Window start, RFC 3339.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Window end, RFC 3339.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Wait for the instance to settle.
    #[serde(default)]
    pub wait: bool,
}

/// Parses an optional RFC 3339 timestamp.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidAttribute`] naming `attribute` when the
/// value does not parse.
pub fn parse_timestamp(
    attribute: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ProviderError> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|err| {
                    ProviderError::invalid_attribute(
                        attribute,
                        format!("'{raw}' is not an RFC 3339 timestamp: {err}"),
                    )
                })
        })
        .transpose()
}

impl<C: ScalewayApi> Provider<C> {
    fn action_target<'v>(
        &self,
        region: Option<&str>,
        target: &'v str,
    ) -> Result<(Region, &'v str), ProviderError> {
        let resolved = self.region_for(region, target)?;
        Ok((resolved, locality::expand_id(target)))
    }

    /// Starts a job definition.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn start_job_definition(
        &self,
        op: &Operation,
        action: &StartJobDefinition,
    ) -> Result<Vec<JobRun>, ProviderError> {
        let (region, job_definition_id) =
            self.action_target(action.region.as_deref(), &action.job_definition_id)?;
        let request = StartJobDefinitionRequest {
            job_definition_id: job_definition_id.to_owned(),
            command: action.command.clone(),
            environment_variables: action.environment_variables.clone(),
            replicas: action.replicas,
        };
        info!(job_definition_id, "starting job definition");
        let runs = op
            .deadline
            .guard("start_job_definition", job_definition_id, async {
                Ok(self.client.start_job_definition(&region, &request).await?)
            })
            .await?;
        if !action.wait {
            return Ok(runs);
        }
        let mut finished = Vec::with_capacity(runs.len());
        for run in runs {
            finished.push(self.wait_for_job_run(&op.deadline, &region, &run.id).await?);
        }
        Ok(finished)
    }

    /// Takes an on-demand snapshot.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn snapshot_now(
        &self,
        op: &Operation,
        action: &CreateSnapshot,
    ) -> Result<Snapshot, ProviderError> {
        let (region, instance_id) =
            self.action_target(action.region.as_deref(), &action.instance_id)?;
        let request = CreateSnapshotRequest {
            name: action.name.clone(),
            expires_at: action.expires_at,
        };
        info!(instance_id, snapshot = %action.name, "taking snapshot");
        let snapshot = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "create_snapshot",
                instance_id,
                || async {
                    Ok(self
                        .client
                        .create_snapshot(&region, instance_id, &request)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &region, instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        if action.wait {
            return self
                .wait_for_snapshot(&op.deadline, &region, &snapshot.id)
                .await;
        }
        Ok(snapshot)
    }

    /// Exports a database backup.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn export_database_backup(
        &self,
        op: &Operation,
        action: &ExportDatabaseBackup,
    ) -> Result<DatabaseBackup, ProviderError> {
        let (region, backup_id) = self.action_target(action.region.as_deref(), &action.backup_id)?;
        info!(backup_id, "exporting database backup");
        let exported = op
            .deadline
            .guard("export_database_backup", backup_id, async {
                Ok(self.client.export_database_backup(&region, backup_id).await?)
            })
            .await?;
        if action.wait {
            return self
                .wait_for_database_backup(&op.deadline, &region, backup_id)
                .await;
        }
        Ok(exported)
    }

    /// Restores a database backup.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn restore_database_backup(
        &self,
        op: &Operation,
        action: &RestoreDatabaseBackup,
    ) -> Result<DatabaseBackup, ProviderError> {
        let (region, backup_id) = self.action_target(action.region.as_deref(), &action.backup_id)?;
        let instance_id = locality::expand_id(&action.instance_id);
        let request = RestoreDatabaseBackupRequest {
            database_name: action.database_name.clone(),
            instance_id: instance_id.to_owned(),
        };
        info!(backup_id, instance_id, "restoring database backup");
        let restored = op
            .deadline
            .guard("restore_database_backup", backup_id, async {
                Ok(self
                    .client
                    .restore_database_backup(&region, backup_id, &request)
                    .await?)
            })
            .await?;
        if !action.wait {
            return Ok(restored);
        }
        let settled = self
            .wait_for_database_backup(&op.deadline, &region, backup_id)
            .await?;
        self.wait_for_instance(&op.deadline, &region, instance_id)
            .await?;
        Ok(settled)
    }

    /// Promotes a read replica.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn promote_read_replica(
        &self,
        op: &Operation,
        action: &PromoteReadReplica,
    ) -> Result<Instance, ProviderError> {
        let (region, read_replica_id) =
            self.action_target(action.region.as_deref(), &action.read_replica_id)?;
        info!(read_replica_id, "promoting read replica");
        let promoted = op
            .deadline
            .guard("promote_read_replica", read_replica_id, async {
                Ok(self
                    .client
                    .promote_read_replica(&region, read_replica_id)
                    .await?)
            })
            .await?;
        if action.wait {
            return self
                .wait_for_instance(&op.deadline, &region, &promoted.id)
                .await;
        }
        Ok(promoted)
    }

    /// Resets a read replica.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn reset_read_replica(
        &self,
        op: &Operation,
        action: &ResetReadReplica,
    ) -> Result<ReadReplica, ProviderError> {
        let (region, read_replica_id) =
            self.action_target(action.region.as_deref(), &action.read_replica_id)?;
        info!(read_replica_id, "resetting read replica");
        let reset = op
            .deadline
            .guard("reset_read_replica", read_replica_id, async {
                Ok(self.client.reset_read_replica(&region, read_replica_id).await?)
            })
            .await?;
        if action.wait {
            return self
                .wait_for_read_replica(&op.deadline, &region, read_replica_id)
                .await;
        }
        Ok(reset)
    }

    /// Renews an instance certificate and returns the instance.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn renew_instance_certificate(
        &self,
        op: &Operation,
        action: &RenewInstanceCertificate,
    ) -> Result<Option<Instance>, ProviderError> {
        let (region, instance_id) =
            self.action_target(action.region.as_deref(), &action.instance_id)?;
        info!(instance_id, "renewing certificate");
        op.deadline
            .guard("renew_instance_certificate", instance_id, async {
                Ok(self
                    .client
                    .renew_instance_certificate(&region, instance_id)
                    .await?)
            })
            .await?;
        self.settle_instance(op, &region, instance_id, action.wait)
            .await
    }

    /// Purges instance logs.
    ///
    /// # Errors
    ///
    /// Returns locality errors, remote failures and deadline outcomes.
    pub async fn purge_instance_logs(
        &self,
        op: &Operation,
        action: &PurgeInstanceLogs,
    ) -> Result<Option<Instance>, ProviderError> {
        let (region, instance_id) =
            self.action_target(action.region.as_deref(), &action.instance_id)?;
        let request = PurgeInstanceLogsRequest {
            log_name: action.log_name.clone(),
        };
        info!(instance_id, log_name = ?action.log_name, "purging instance logs");
        op.deadline
            .guard("purge_instance_logs", instance_id, async {
                Ok(self
                    .client
                    .purge_instance_logs(&region, instance_id, &request)
                    .await?)
            })
            .await?;
        self.settle_instance(op, &region, instance_id, action.wait)
            .await
    }

    /// Prepares log archives for a time window.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidAttribute`] for a malformed or
    /// inverted window, locality errors, remote failures and deadline
    /// outcomes.
    pub async fn prepare_instance_logs(
        &self,
        op: &Operation,
        action: &PrepareInstanceLogs,
    ) -> Result<Vec<InstanceLog>, ProviderError> {
        let start_date = parse_timestamp("start_date", action.start_date.as_deref())?;
        let end_date = parse_timestamp("end_date", action.end_date.as_deref())?;
        if let Some((start, end)) = start_date.zip(end_date).filter(|(start, end)| start > end) {
            return Err(ProviderError::invalid_attribute(
                "start_date",
                format!("{start} is after end_date {end}"),
            ));
        }
        let (region, instance_id) =
            self.action_target(action.region.as_deref(), &action.instance_id)?;
        let request = PrepareInstanceLogsRequest {
            start_date,
            end_date,
        };
        info!(instance_id, "preparing instance logs");
        let logs = op
            .deadline
            .guard("prepare_instance_logs", instance_id, async {
                Ok(self
                    .client
                    .prepare_instance_logs(&region, instance_id, &request)
                    .await?)
            })
            .await?;
        self.settle_instance(op, &region, instance_id, action.wait)
            .await?;
        Ok(logs)
    }

    async fn settle_instance(
        &self,
        op: &Operation,
        region: &Region,
        instance_id: &str,
        wait: bool,
    ) -> Result<Option<Instance>, ProviderError> {
        if !wait {
            return Ok(None);
        }
        self.wait_for_instance(&op.deadline, region, instance_id)
            .await
            .map(Some)
    }
}
