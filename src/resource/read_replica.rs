//! Read replica controller.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::{CreateReadReplicaRequest, EndpointSpec, ReadReplicaStatus};
use crate::diagnostics::Diagnostics;
use crate::diff::ids_equal;
use crate::endpoint::{
    EndpointOwner, EndpointSlot, PrivateNetworkBlock, PrivateNetworkState, PublicEndpointState,
    expand_private_network, expand_replica_endpoints, private_network_changed,
};
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, LocalizedId, Region};
use crate::provider::Provider;
use crate::resource::{Plan, PlanBuilder};
use crate::wait::{ConflictRetry, Operation};

const fn default_same_zone() -> bool {
    true
}

/// Declared read replica.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadReplicaConfig {
    /// Region; defaults to the primary's region.
    #[serde(default)]
    pub region: Option<String>,
    /// Primary instance, bare or localized.
    pub instance_id: String,
    /// Places the replica in the primary's zone.
    #[serde(default = "default_same_zone")]
    pub same_zone: bool,
    /// Private network attachment.
    #[serde(default)]
    pub private_network: Option<PrivateNetworkBlock>,
    /// Requests a direct public endpoint.
    #[serde(default)]
    pub direct_access: bool,
}

/// Persisted read replica.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadReplicaState {
    /// `<region>/<uuid>`.
    pub id: String,
    /// Region of the replica.
    pub region: Region,
    /// `<region>/<uuid>` of the primary.
    pub instance_id: String,
    /// Whether the replica lives in the primary's zone.
    pub same_zone: bool,
    /// Private network endpoints.
    pub private_network: Vec<PrivateNetworkState>,
    /// Direct-access endpoints.
    pub direct_access: Vec<PublicEndpointState>,
    /// Last observed status.
    pub status: ReadReplicaStatus,
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared replica against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality and endpoint errors.
    pub fn plan_read_replica(
        &self,
        prior: Option<&ReadReplicaState>,
        config: &ReadReplicaConfig,
    ) -> Result<Plan, ProviderError> {
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        LocalityCheck::new(region.clone())
            .attribute("instance_id", Some(config.instance_id.as_str()))
            .attribute(
                "private_network.0.pn_id",
                config.private_network.as_ref().map(|pn| pn.pn_id.as_str()),
            )
            .verify()?;
        if let Some(block) = &config.private_network {
            expand_private_network(block, &Diagnostics::new())?;
        }
        let Some(state) = prior else {
            return Ok(Plan::Create);
        };
        Ok(PlanBuilder::default()
            .replace_if("instance_id", !ids_equal(&config.instance_id, &state.instance_id))
            .replace_if("same_zone", config.same_zone != state.same_zone)
            .replace_if("region", region != state.region)
            .update_if(private_network_changed(
                state.private_network.first(),
                config.private_network.as_ref(),
            ))
            .update_if(state.direct_access.is_empty() == config.direct_access)
            .build())
    }

    /// Creates a replica of its primary.
    ///
    /// # Errors
    ///
    /// Returns plan errors, remote failures and deadline outcomes.
    pub async fn create_read_replica(
        &self,
        op: &Operation,
        config: &ReadReplicaConfig,
    ) -> Result<ReadReplicaState, ProviderError> {
        self.plan_read_replica(None, config)?;
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        let instance_id = locality::expand_id(&config.instance_id);
        let request = CreateReadReplicaRequest {
            instance_id: instance_id.to_owned(),
            endpoint_spec: expand_replica_endpoints(
                config.private_network.as_ref(),
                config.direct_access,
                &op.diagnostics,
            )?,
            same_zone: config.same_zone,
        };

        info!(instance_id, %region, same_zone = config.same_zone, "creating read replica");
        let created = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "create_read_replica",
                instance_id,
                || async { Ok(self.client.create_read_replica(&region, &request).await?) },
                || async {
                    self.wait_for_instance(&op.deadline, &region, instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        self.wait_for_read_replica(&op.deadline, &region, &created.id)
            .await?;
        let id = LocalizedId::new(region, created.id).to_string();
        self.refresh_read_replica(op, &id).await?.ok_or_else(|| {
            ProviderError::RemoteNotFound {
                message: format!("read replica {id} disappeared after creation"),
            }
        })
    }

    /// Refreshes a replica; `None` means it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn read_read_replica(
        &self,
        op: &Operation,
        prior: &ReadReplicaState,
    ) -> Result<Option<ReadReplicaState>, ProviderError> {
        self.refresh_read_replica(op, &prior.id).await
    }

    async fn refresh_read_replica(
        &self,
        op: &Operation,
        id: &str,
    ) -> Result<Option<ReadReplicaState>, ProviderError> {
        let (scope, replica_id) = locality::parse_localized(id)?;
        let region = scope.region();
        let waited = self
            .wait_for_read_replica(&op.deadline, &region, &replica_id)
            .await;
        let Some(replica) = tolerate_not_found(waited)? else {
            return Ok(None);
        };
        let endpoints = self
            .flatten_observed_endpoints(
                &op.deadline,
                &region,
                &replica.instance_id,
                &replica.endpoints,
            )
            .await?;
        Ok(Some(ReadReplicaState {
            id: LocalizedId::new(region.clone(), replica.id).to_string(),
            instance_id: locality::format_localized(&region, &replica.instance_id),
            region,
            same_zone: replica.same_zone,
            private_network: endpoints.private_network,
            direct_access: endpoints.direct_access,
            status: replica.status,
        }))
    }

    /// Reconciles replica endpoints with the declaration.
    ///
    /// # Errors
    ///
    /// Returns plan errors (a required replacement surfaces as
    /// [`ProviderError::InvalidAttribute`]), remote failures and deadline
    /// outcomes.
    pub async fn update_read_replica(
        &self,
        op: &Operation,
        prior: &ReadReplicaState,
        config: &ReadReplicaConfig,
    ) -> Result<ReadReplicaState, ProviderError> {
        if let Plan::Replace { attributes } = self.plan_read_replica(Some(prior), config)? {
            return Err(ProviderError::invalid_attribute(
                &attributes.join(","),
                "cannot change in place; the read replica must be replaced",
            ));
        }
        let (scope, replica_id) = locality::parse_localized(&prior.id)?;
        let region = scope.region();
        let owner = EndpointOwner::ReadReplica(&replica_id);

        if private_network_changed(prior.private_network.first(), config.private_network.as_ref()) {
            let spec = config
                .private_network
                .as_ref()
                .map(|block| expand_private_network(block, &op.diagnostics))
                .transpose()?;
            let observed = self
                .wait_for_read_replica(&op.deadline, &region, &replica_id)
                .await?;
            self.replace_endpoints(
                &op.deadline,
                &region,
                owner,
                EndpointSlot::PrivateNetwork,
                &observed.endpoints,
                spec.as_ref(),
            )
            .await?;
        }
        if prior.direct_access.is_empty() == config.direct_access {
            let spec = config.direct_access.then_some(EndpointSpec::DirectAccess {});
            let observed = self
                .wait_for_read_replica(&op.deadline, &region, &replica_id)
                .await?;
            self.replace_endpoints(
                &op.deadline,
                &region,
                owner,
                EndpointSlot::DirectAccess,
                &observed.endpoints,
                spec.as_ref(),
            )
            .await?;
        }

        self.refresh_read_replica(op, &prior.id)
            .await?
            .ok_or_else(|| ProviderError::RemoteNotFound {
                message: format!("read replica {} disappeared during update", prior.id),
            })
    }

    /// Deletes a replica; a missing replica counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_read_replica(
        &self,
        op: &Operation,
        state: &ReadReplicaState,
    ) -> Result<(), ProviderError> {
        let (scope, replica_id) = locality::parse_localized(&state.id)?;
        let region = scope.region();
        let waited = self
            .wait_for_read_replica(&op.deadline, &region, &replica_id)
            .await;
        if tolerate_not_found(waited)?.is_none() {
            return Ok(());
        }
        info!(read_replica_id = %state.id, "deleting read replica");
        let deleted = op
            .deadline
            .guard("delete_read_replica", &replica_id, async {
                Ok(self.client.delete_read_replica(&region, &replica_id).await?)
            })
            .await;
        tolerate_not_found(deleted)?;
        let gone = self
            .wait_for_read_replica(&op.deadline, &region, &replica_id)
            .await;
        tolerate_not_found(gone)?;
        Ok(())
    }
}
