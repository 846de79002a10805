//! Instance snapshot controller and lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::{
    ArtifactStatus, CreateSnapshotRequest, Snapshot, UpdateSnapshotRequest, VolumeType,
};
use crate::diff::ids_equal;
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, LocalizedId, Region};
use crate::provider::Provider;
use crate::resource::{Plan, PlanBuilder, check_expiry_kept};
use crate::wait::{ConflictRetry, Operation};

/// Declared snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SnapshotConfig {
    /// Region; defaults to the instance region.
    #[serde(default)]
    pub region: Option<String>,
    /// Source instance, bare or localized.
    pub instance_id: String,
    /// Display name.
    pub name: String,
    /// Expiration date; cannot be removed once set.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Persisted snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SnapshotState {
    /// `<region>/<uuid>`.
    pub id: String,
    /// Region of the snapshot.
    pub region: Region,
    /// `<region>/<uuid>` of the source instance.
    pub instance_id: String,
    /// Display name.
    pub name: String,
    /// Expiration date.
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: ArtifactStatus,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Node type of the source at capture time.
    pub node_type: String,
    /// Volume type of the source at capture time.
    pub volume_type: Option<VolumeType>,
    /// Creation date.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update date.
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Snapshot> for SnapshotState {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            id: LocalizedId::new(snapshot.region.clone(), snapshot.id).to_string(),
            instance_id: locality::format_localized(&snapshot.region, &snapshot.instance_id),
            region: snapshot.region,
            name: snapshot.name,
            expires_at: snapshot.expires_at,
            status: snapshot.status,
            size: snapshot.size,
            node_type: snapshot.node_type,
            volume_type: snapshot.volume_type.map(|kind| kind.volume_type),
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared snapshot against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality errors and
    /// [`ProviderError::ExpiryRemovalForbidden`].
    pub fn plan_snapshot(
        &self,
        prior: Option<&SnapshotState>,
        config: &SnapshotConfig,
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
            .replace_if("region", region != state.region)
            .update_if(config.name != state.name || config.expires_at != state.expires_at)
            .build())
    }

    /// Takes a snapshot and waits until it is usable.
    ///
    /// # Errors
    ///
    /// Returns plan errors, remote failures and deadline outcomes.
    pub async fn create_snapshot(
        &self,
        op: &Operation,
        config: &SnapshotConfig,
    ) -> Result<SnapshotState, ProviderError> {
        self.plan_snapshot(None, config)?;
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        let instance_id = locality::expand_id(&config.instance_id);
        let request = CreateSnapshotRequest {
            name: config.name.clone(),
            expires_at: config.expires_at,
        };
        info!(instance_id, snapshot = %config.name, "creating snapshot");
        let created = ConflictRetry::new(&op.deadline, self.retry_interval)
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
        let ready = self
            .wait_for_snapshot(&op.deadline, &region, &created.id)
            .await?;
        Ok(ready.into())
    }

    /// Refreshes a snapshot; `None` means it is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed identifier,
    /// non-404 remote failures and deadline outcomes.
    pub async fn read_snapshot(
        &self,
        op: &Operation,
        prior: &SnapshotState,
    ) -> Result<Option<SnapshotState>, ProviderError> {
        let (scope, snapshot_id) = locality::parse_localized(&prior.id)?;
        let waited = self
            .wait_for_snapshot(&op.deadline, &scope.region(), &snapshot_id)
            .await;
        Ok(tolerate_not_found(waited)?.map(SnapshotState::from))
    }

    /// Renames a snapshot or moves its expiration date.
    ///
    /// # Errors
    ///
    /// Returns plan errors (a required replacement surfaces as
    /// [`ProviderError::InvalidAttribute`]), remote failures and deadline
    /// outcomes.
    pub async fn update_snapshot(
        &self,
        op: &Operation,
        prior: &SnapshotState,
        config: &SnapshotConfig,
    ) -> Result<SnapshotState, ProviderError> {
        if let Plan::Replace { attributes } = self.plan_snapshot(Some(prior), config)? {
            return Err(ProviderError::invalid_attribute(
                &attributes.join(","),
                "cannot change in place; the snapshot must be replaced",
            ));
        }
        let (scope, snapshot_id) = locality::parse_localized(&prior.id)?;
        let region = scope.region();
        let request = UpdateSnapshotRequest {
            name: (config.name != prior.name).then(|| config.name.clone()),
            expires_at: config.expires_at.filter(|_| config.expires_at != prior.expires_at),
        };
        if request == UpdateSnapshotRequest::default() {
            return Ok(prior.clone());
        }
        info!(snapshot_id = %snapshot_id, "updating snapshot");
        op.deadline
            .guard("update_snapshot", &snapshot_id, async {
                Ok(self
                    .client
                    .update_snapshot(&region, &snapshot_id, &request)
                    .await?)
            })
            .await?;
        let ready = self
            .wait_for_snapshot(&op.deadline, &region, &snapshot_id)
            .await?;
        Ok(ready.into())
    }

    /// Deletes a snapshot; a missing snapshot counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_snapshot(
        &self,
        op: &Operation,
        state: &SnapshotState,
    ) -> Result<(), ProviderError> {
        let (scope, snapshot_id) = locality::parse_localized(&state.id)?;
        let region = scope.region();
        info!(snapshot_id = %snapshot_id, "deleting snapshot");
        let waited = self
            .wait_for_snapshot(&op.deadline, &region, &snapshot_id)
            .await;
        if tolerate_not_found(waited)?.is_none() {
            return Ok(());
        }
        let deleted = op
            .deadline
            .guard("delete_snapshot", &snapshot_id, async {
                Ok(self.client.delete_snapshot(&region, &snapshot_id).await?)
            })
            .await;
        tolerate_not_found(deleted)?;
        Ok(())
    }

    /// Looks a snapshot up by name, optionally restricted to one instance.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::RemoteNotFound`] when no snapshot or more
    /// than one snapshot matches, plus locality and remote failures.
    pub async fn find_snapshot(
        &self,
        op: &Operation,
        region: Option<&str>,
        name: &str,
        instance_id: Option<&str>,
    ) -> Result<SnapshotState, ProviderError> {
        let region = self.region_for(region, instance_id.unwrap_or(name))?;
        let instance_filter = instance_id.map(locality::expand_id);
        let listed = op
            .deadline
            .guard("list_snapshots", name, async {
                Ok(self
                    .client
                    .list_snapshots(&region, instance_filter, Some(name))
                    .await?)
            })
            .await?;
        let mut matching = listed.into_iter().filter(|snapshot| snapshot.name == name);
        let (Some(found), None) = (matching.next(), matching.next()) else {
            return Err(ProviderError::RemoteNotFound {
                message: format!("expected exactly one snapshot named '{name}' in {region}"),
            });
        };
        Ok(found.into())
    }
}
