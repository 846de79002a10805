//! Block-until-terminal waits on remote entities.

use tracing::debug;

use crate::api::ScalewayApi;
use crate::api::types::{DatabaseBackup, Instance, JobRun, ReadReplica, Snapshot};
use crate::error::ProviderError;
use crate::locality::Region;
use crate::provider::Provider;

use super::{Deadline, poll_until};

impl<C: ScalewayApi> Provider<C> {
    /// Polls an instance until its status is terminal.
    ///
    /// # Errors
    ///
    /// Returns remote errors (including 404) verbatim, or the deadline
    /// outcome.
    pub async fn wait_for_instance(
        &self,
        deadline: &Deadline,
        region: &Region,
        instance_id: &str,
    ) -> Result<Instance, ProviderError> {
        poll_until(
            deadline,
            self.retry_interval,
            "wait_for_instance",
            instance_id,
            || async {
                let instance = self.client.get_instance(region, instance_id).await?;
                debug!(instance_id, status = ?instance.status, "observed instance");
                Ok(instance)
            },
            |instance: &Instance| instance.status.is_terminal(),
        )
        .await
    }

    /// Waits for an instance, treating its disappearance as success.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote errors or the deadline outcome.
    pub async fn wait_for_instance_gone(
        &self,
        deadline: &Deadline,
        region: &Region,
        instance_id: &str,
    ) -> Result<(), ProviderError> {
        match self.wait_for_instance(deadline, region, instance_id).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Polls a read replica until its status is terminal.
    ///
    /// # Errors
    ///
    /// Returns remote errors verbatim, or the deadline outcome.
    pub async fn wait_for_read_replica(
        &self,
        deadline: &Deadline,
        region: &Region,
        read_replica_id: &str,
    ) -> Result<ReadReplica, ProviderError> {
        poll_until(
            deadline,
            self.retry_interval,
            "wait_for_read_replica",
            read_replica_id,
            || async { Ok(self.client.get_read_replica(region, read_replica_id).await?) },
            |replica: &ReadReplica| replica.status.is_terminal(),
        )
        .await
    }

    /// Polls a snapshot until its status is terminal.
    ///
    /// # Errors
    ///
    /// Returns remote errors verbatim, or the deadline outcome.
    pub async fn wait_for_snapshot(
        &self,
        deadline: &Deadline,
        region: &Region,
        snapshot_id: &str,
    ) -> Result<Snapshot, ProviderError> {
        poll_until(
            deadline,
            self.retry_interval,
            "wait_for_snapshot",
            snapshot_id,
            || async { Ok(self.client.get_snapshot(region, snapshot_id).await?) },
            |snapshot: &Snapshot| snapshot.status.is_terminal(),
        )
        .await
    }

    /// Polls a database backup until its status is terminal.
    ///
    /// # Errors
    ///
    /// Returns remote errors verbatim, or the deadline outcome.
    pub async fn wait_for_database_backup(
        &self,
        deadline: &Deadline,
        region: &Region,
        backup_id: &str,
    ) -> Result<DatabaseBackup, ProviderError> {
        poll_until(
            deadline,
            self.retry_interval,
            "wait_for_database_backup",
            backup_id,
            || async { Ok(self.client.get_database_backup(region, backup_id).await?) },
            |backup: &DatabaseBackup| backup.status.is_terminal(),
        )
        .await
    }

    /// Polls a job run until it finishes.
    ///
    /// # Errors
    ///
    /// Returns remote errors verbatim, or the deadline outcome.
    pub async fn wait_for_job_run(
        &self,
        deadline: &Deadline,
        region: &Region,
        job_run_id: &str,
    ) -> Result<JobRun, ProviderError> {
        poll_until(
            deadline,
            self.retry_interval,
            "wait_for_job_run",
            job_run_id,
            || async { Ok(self.client.get_job_run(region, job_run_id).await?) },
            JobRun::is_terminal,
        )
        .await
    }
}
