//! Database instance controller.
//!
//! Updates run in five passes: the upgrade plan, scalar attributes, runtime
//! settings, the admin password, then endpoint reconciliation (private
//! network before load balancer). The instance is awaited between steps.

pub mod upgrade;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::ScalewayApi;
use crate::api::types::{
    CreateInstanceFromSnapshotRequest, CreateInstanceRequest, EncryptionAtRest, EndpointSpec,
    Instance, InstanceSetting, InstanceStatus, LogsPolicy, UpdateInstanceRequest,
    UpdateUserRequest, UpgradableVersion, VolumeType,
};
use crate::diagnostics::Diagnostics;
use crate::diff::optional_ids_equal;
use crate::endpoint::{
    EndpointOwner, EndpointSlot, PrivateNetworkBlock, PrivateNetworkState, PublicEndpointState,
    expand_instance_endpoints, expand_private_network, private_network_changed,
};
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, LocalizedId, Region};
use crate::provider::Provider;
use crate::resource::{PasswordConfig, PasswordState, Plan, PlanBuilder};
use crate::wait::Operation;

pub use upgrade::{
    BYTES_PER_GB, InstanceShape, UpgradeOp, VOLUME_SIZE_STEP_GB, plan_upgrades, validate_volume,
};

/// Declared database instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceConfig {
    /// Display name.
    pub name: String,
    /// Region; defaults to the provider region.
    #[serde(default)]
    pub region: Option<String>,
    /// Owning project; defaults to the provider project.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Engine and major version; ignored when restoring a snapshot.
    #[serde(default)]
    pub engine: String,
    /// Commercial node type.
    pub node_type: String,
    /// High-availability flag.
    #[serde(default)]
    pub is_ha_cluster: bool,
    /// Initial admin user.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Admin password source.
    #[serde(default)]
    pub password: Option<PasswordConfig>,
    /// Storage kind.
    #[serde(default)]
    pub volume_type: VolumeType,
    /// Volume size; block storage only.
    #[serde(default)]
    pub volume_size_in_gb: Option<u64>,
    /// Encryption at rest.
    #[serde(default)]
    pub encryption_at_rest: bool,
    /// Disables automatic backups.
    #[serde(default)]
    pub disable_backup: bool,
    /// Hours between automatic backups.
    #[serde(default)]
    pub backup_schedule_frequency: Option<u32>,
    /// Days automatic backups are retained.
    #[serde(default)]
    pub backup_schedule_retention: Option<u32>,
    /// Keeps backups in the instance region.
    #[serde(default)]
    pub backup_same_region: bool,
    /// Log retention.
    #[serde(default)]
    pub logs_policy: Option<LogsPolicy>,
    /// Runtime settings.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    /// Settings applied at creation only.
    #[serde(default)]
    pub init_settings: BTreeMap<String, String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Private network attachment.
    #[serde(default)]
    pub private_network: Option<PrivateNetworkBlock>,
    /// Requests a public load-balancer endpoint.
    #[serde(default)]
    pub load_balancer: bool,
    /// Snapshot to restore from.
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

/// Persisted database instance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceState {
    /// `<region>/<uuid>`.
    pub id: String,
    /// Region of the instance.
    pub region: Region,
    /// Display name.
    pub name: String,
    /// Owning project.
    pub project_id: String,
    /// Owning organisation.
    pub organization_id: String,
    /// Engine and major version.
    pub engine: String,
    /// Commercial node type.
    pub node_type: String,
    /// High-availability flag.
    pub is_ha_cluster: bool,
    /// Admin user.
    pub user_name: Option<String>,
    /// Admin password source last applied.
    pub password: Option<PasswordState>,
    /// Storage kind.
    pub volume_type: VolumeType,
    /// Volume size; unset for local storage.
    pub volume_size_in_gb: Option<u64>,
    /// Encryption at rest.
    pub encryption_at_rest: bool,
    /// Whether automatic backups are disabled.
    pub disable_backup: bool,
    /// Hours between automatic backups.
    pub backup_schedule_frequency: Option<u32>,
    /// Days automatic backups are retained.
    pub backup_schedule_retention: Option<u32>,
    /// Keeps backups in the instance region.
    pub backup_same_region: bool,
    /// Log retention.
    pub logs_policy: Option<LogsPolicy>,
    /// Runtime settings.
    pub settings: BTreeMap<String, String>,
    /// Settings applied at creation.
    pub init_settings: BTreeMap<String, String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Private network endpoints.
    pub private_network: Vec<PrivateNetworkState>,
    /// Load-balancer endpoints.
    pub load_balancer: Vec<PublicEndpointState>,
    /// Public address, preferring the load balancer.
    pub endpoint_ip: Option<String>,
    /// Public port.
    pub endpoint_port: Option<u16>,
    /// PEM certificate served by the instance.
    pub certificate: String,
    /// Localized identifiers of attached read replicas.
    pub read_replicas: Vec<String>,
    /// Versions the instance may upgrade to.
    pub upgradable_versions: Vec<UpgradableVersion>,
    /// Last observed status.
    pub status: InstanceStatus,
    /// Snapshot the instance was restored from.
    pub snapshot_id: Option<String>,
}

impl InstanceState {
    /// Returns the planner view of this state.
    #[must_use]
    pub fn shape(&self) -> InstanceShape {
        InstanceShape {
            node_type: self.node_type.clone(),
            is_ha_cluster: self.is_ha_cluster,
            volume_type: self.volume_type,
            volume_size_gb: self.volume_size_in_gb,
            encryption_at_rest: self.encryption_at_rest,
        }
    }
}

impl InstanceConfig {
    /// Returns the planner view of this declaration.
    #[must_use]
    pub fn shape(&self) -> InstanceShape {
        InstanceShape {
            node_type: self.node_type.clone(),
            is_ha_cluster: self.is_ha_cluster,
            volume_type: self.volume_type,
            volume_size_gb: self.volume_size_in_gb,
            encryption_at_rest: self.encryption_at_rest,
        }
    }
}

fn observed_shape(instance: &Instance) -> InstanceShape {
    let volume = instance.volume.clone().unwrap_or_default();
    InstanceShape {
        node_type: instance.node_type.clone(),
        is_ha_cluster: instance.is_ha_cluster,
        volume_type: volume.volume_type,
        volume_size_gb: volume_size_gb(volume.volume_type, volume.size),
        encryption_at_rest: instance.encryption.is_some_and(|encryption| encryption.enabled),
    }
}

const fn volume_size_gb(volume_type: VolumeType, bytes: u64) -> Option<u64> {
    if volume_type.is_local() {
        return None;
    }
    bytes.checked_div(BYTES_PER_GB)
}

/// Declared-only attributes that survive a refresh.
#[derive(Clone, Debug, Default)]
struct Carried {
    user_name: Option<String>,
    password: Option<PasswordState>,
    snapshot_id: Option<String>,
}

/// Fields the remote only accepts after creation.
fn deferred_create_fields(config: &InstanceConfig) -> UpdateInstanceRequest {
    UpdateInstanceRequest {
        backup_schedule_frequency: config.backup_schedule_frequency,
        backup_schedule_retention: config.backup_schedule_retention,
        backup_same_region: config.backup_same_region.then_some(true),
        logs_policy: config.logs_policy.clone(),
        ..UpdateInstanceRequest::default()
    }
}

fn scalar_update(prior: &InstanceState, config: &InstanceConfig) -> UpdateInstanceRequest {
    UpdateInstanceRequest {
        name: (config.name != prior.name).then(|| config.name.clone()),
        tags: (config.tags != prior.tags).then(|| config.tags.clone()),
        backup_schedule_frequency: config
            .backup_schedule_frequency
            .filter(|frequency| Some(*frequency) != prior.backup_schedule_frequency),
        backup_schedule_retention: config
            .backup_schedule_retention
            .filter(|retention| Some(*retention) != prior.backup_schedule_retention),
        is_backup_schedule_disabled: (config.disable_backup != prior.disable_backup)
            .then_some(config.disable_backup),
        logs_policy: config
            .logs_policy
            .clone()
            .filter(|policy| Some(policy) != prior.logs_policy.as_ref()),
        backup_same_region: (config.backup_same_region != prior.backup_same_region)
            .then_some(config.backup_same_region),
    }
}

fn password_change<'c>(
    prior: &InstanceState,
    config: &'c InstanceConfig,
) -> Option<&'c PasswordConfig> {
    config
        .password
        .as_ref()
        .filter(|password| password.needs_update(prior.password.as_ref()))
}

/// Identifier whose locality prefix places a new instance when no region is
/// declared. The display name never does.
fn region_source(config: &InstanceConfig) -> &str {
    config.snapshot_id.as_deref().unwrap_or_default()
}

fn load_balancer_changed(prior: &InstanceState, config: &InstanceConfig) -> bool {
    prior.load_balancer.is_empty() == config.load_balancer
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared instance against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality, volume, encryption, endpoint and disk-full plan
    /// errors before any remote call.
    pub fn plan_instance(
        &self,
        prior: Option<&InstanceState>,
        config: &InstanceConfig,
    ) -> Result<Plan, ProviderError> {
        let region = self.region_for(config.region.as_deref(), region_source(config))?;
        LocalityCheck::new(region.clone())
            .attribute(
                "private_network.0.pn_id",
                config.private_network.as_ref().map(|pn| pn.pn_id.as_str()),
            )
            .attribute("snapshot_id", config.snapshot_id.as_deref())
            .verify()?;
        validate_volume(config.volume_type, config.volume_size_in_gb)?;
        if let Some(block) = &config.private_network {
            expand_private_network(block, &Diagnostics::new())?;
        }
        let Some(state) = prior else {
            return Ok(Plan::Create);
        };

        let upgrades = plan_upgrades(&state.id, &state.shape(), &config.shape(), state.status)?;
        let restored = config.snapshot_id.is_some();
        Ok(PlanBuilder::default()
            .replace_if(
                "engine",
                !restored && !config.engine.is_empty() && config.engine != state.engine,
            )
            .replace_if(
                "init_settings",
                !restored && config.init_settings != state.init_settings,
            )
            .replace_if("region", region != state.region)
            .replace_if(
                "snapshot_id",
                !optional_ids_equal(config.snapshot_id.as_deref(), state.snapshot_id.as_deref()),
            )
            .update_if(!upgrades.is_empty())
            .update_if(!scalar_update(state, config).is_empty())
            .update_if(config.settings != state.settings)
            .update_if(password_change(state, config).is_some())
            .update_if(private_network_changed(
                state.private_network.first(),
                config.private_network.as_ref(),
            ))
            .update_if(load_balancer_changed(state, config))
            .build())
    }

    /// Creates an instance and returns its refreshed state.
    ///
    /// # Errors
    ///
    /// Returns plan errors, [`ProviderError::InvalidAttribute`] when the
    /// admin credentials are missing, remote failures and deadline
    /// outcomes.
    pub async fn create_instance(
        &self,
        op: &Operation,
        config: &InstanceConfig,
    ) -> Result<InstanceState, ProviderError> {
        self.plan_instance(None, config)?;
        let region = self.region_for(config.region.as_deref(), region_source(config))?;
        if let Some(snapshot_id) = &config.snapshot_id {
            return self
                .create_instance_from_snapshot(op, &region, snapshot_id, config)
                .await;
        }
        let user_name = config.user_name.clone().ok_or_else(|| {
            ProviderError::invalid_attribute("user_name", "required unless restoring a snapshot")
        })?;
        let password = config.password.as_ref().ok_or_else(|| {
            ProviderError::invalid_attribute("password", "required unless restoring a snapshot")
        })?;
        let request = CreateInstanceRequest {
            project_id: config
                .project_id
                .clone()
                .or_else(|| self.default_project_id.clone()),
            name: config.name.clone(),
            engine: config.engine.clone(),
            user_name: user_name.clone(),
            password: password.secret().to_owned(),
            node_type: config.node_type.clone(),
            is_ha_cluster: config.is_ha_cluster,
            disable_backup: config.disable_backup,
            tags: config.tags.clone(),
            init_settings: InstanceSetting::from_map(&config.init_settings),
            volume_type: config.volume_type,
            volume_size: config
                .volume_size_in_gb
                .map(|gb| gb.saturating_mul(BYTES_PER_GB)),
            init_endpoints: expand_instance_endpoints(
                config.private_network.as_ref(),
                config.load_balancer,
                &op.diagnostics,
            )?,
            backup_same_region: config.backup_same_region,
            encryption: Some(EncryptionAtRest {
                enabled: config.encryption_at_rest,
            }),
        };

        info!(name = %config.name, %region, node_type = %config.node_type, "creating database instance");
        let created = op
            .deadline
            .guard("create_instance", &config.name, async {
                Ok(self.client.create_instance(&region, &request).await?)
            })
            .await?;
        let id = LocalizedId::new(region.clone(), created.id.clone()).to_string();
        self.wait_for_instance(&op.deadline, &region, &created.id)
            .await?;

        let deferred = deferred_create_fields(config);
        if !deferred.is_empty() {
            debug!(instance_id = %created.id, "applying fields deferred until after creation");
            op.deadline
                .guard("update_instance", &created.id, async {
                    Ok(self
                        .client
                        .update_instance(&region, &created.id, &deferred)
                        .await?)
                })
                .await?;
        }
        if !config.settings.is_empty() {
            self.apply_settings(op, &region, &created.id, &config.settings)
                .await?;
        }

        let carried = Carried {
            user_name: Some(user_name),
            password: Some(password.to_state()),
            snapshot_id: None,
        };
        self.refresh_instance(op, &id, carried)
            .await?
            .ok_or_else(|| vanished(&id))
    }

    async fn create_instance_from_snapshot(
        &self,
        op: &Operation,
        region: &Region,
        snapshot_ref: &str,
        config: &InstanceConfig,
    ) -> Result<InstanceState, ProviderError> {
        let snapshot = self.reference(snapshot_ref, Some(region))?;
        let request = CreateInstanceFromSnapshotRequest {
            snapshot_id: snapshot.inner_id,
            instance_name: config.name.clone(),
            is_ha_cluster: config.is_ha_cluster,
            node_type: config.node_type.clone(),
        };
        self.wait_for_snapshot(&op.deadline, region, &request.snapshot_id)
            .await?;
        info!(name = %config.name, snapshot_id = %request.snapshot_id, "restoring database instance from snapshot");
        let created = op
            .deadline
            .guard("create_instance_from_snapshot", &request.snapshot_id, async {
                Ok(self
                    .client
                    .create_instance_from_snapshot(region, &request)
                    .await?)
            })
            .await?;
        let id = LocalizedId::new(region.clone(), created.id).to_string();
        let carried = Carried {
            user_name: config.user_name.clone(),
            password: None,
            snapshot_id: config.snapshot_id.clone(),
        };
        let restored = self
            .refresh_instance(op, &id, carried)
            .await?
            .ok_or_else(|| vanished(&id))?;
        self.update_instance(op, &restored, config).await
    }

    /// Refreshes an instance; `None` means it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed identifier,
    /// non-404 remote failures and deadline outcomes.
    pub async fn read_instance(
        &self,
        op: &Operation,
        prior: &InstanceState,
    ) -> Result<Option<InstanceState>, ProviderError> {
        let carried = Carried {
            user_name: prior.user_name.clone(),
            password: prior.password.clone(),
            snapshot_id: prior.snapshot_id.clone(),
        };
        self.refresh_instance(op, &prior.id, carried).await
    }

    async fn refresh_instance(
        &self,
        op: &Operation,
        id: &str,
        carried: Carried,
    ) -> Result<Option<InstanceState>, ProviderError> {
        let (scope, instance_id) = locality::parse_localized(id)?;
        let region = scope.region();
        let waited = self
            .wait_for_instance(&op.deadline, &region, &instance_id)
            .await;
        let Some(instance) = tolerate_not_found(waited)? else {
            info!(instance_id = %id, "instance no longer exists");
            return Ok(None);
        };

        let endpoints = self
            .flatten_observed_endpoints(&op.deadline, &region, &instance.id, &instance.endpoints)
            .await?;
        let certificate = op
            .deadline
            .guard("get_instance_certificate", &instance.id, async {
                Ok(self
                    .client
                    .get_instance_certificate(&region, &instance.id)
                    .await?)
            })
            .await?;
        let user_name = if carried.user_name.is_some() {
            carried.user_name
        } else {
            self.admin_user_name(op, &region, &instance.id).await?
        };

        let (endpoint_ip, endpoint_port) = endpoints.public_address();
        let volume = instance.volume.clone().unwrap_or_default();
        let schedule = instance.backup_schedule.clone();
        Ok(Some(InstanceState {
            id: LocalizedId::new(region.clone(), instance.id.clone()).to_string(),
            name: instance.name.clone(),
            project_id: instance.project_id.clone(),
            organization_id: instance.organization_id.clone(),
            engine: instance.engine.clone(),
            node_type: instance.node_type.clone(),
            is_ha_cluster: instance.is_ha_cluster,
            user_name,
            password: carried.password,
            volume_type: volume.volume_type,
            volume_size_in_gb: volume_size_gb(volume.volume_type, volume.size),
            encryption_at_rest: instance.encryption.is_some_and(|encryption| encryption.enabled),
            disable_backup: schedule.as_ref().is_some_and(|backup| backup.disabled),
            backup_schedule_frequency: schedule.as_ref().map(|backup| backup.frequency),
            backup_schedule_retention: schedule.as_ref().map(|backup| backup.retention),
            backup_same_region: instance.backup_same_region,
            logs_policy: instance.logs_policy.clone(),
            settings: InstanceSetting::to_map(&instance.settings),
            init_settings: InstanceSetting::to_map(&instance.init_settings),
            tags: instance.tags.clone(),
            private_network: endpoints.private_network,
            load_balancer: endpoints.load_balancer,
            endpoint_ip,
            endpoint_port,
            certificate,
            read_replicas: instance
                .read_replicas
                .iter()
                .map(|replica| locality::format_localized(&region, &replica.id))
                .collect(),
            upgradable_versions: instance.upgradable_version.clone(),
            status: instance.status,
            snapshot_id: carried.snapshot_id,
            region,
        }))
    }

    async fn admin_user_name(
        &self,
        op: &Operation,
        region: &Region,
        instance_id: &str,
    ) -> Result<Option<String>, ProviderError> {
        let users = op
            .deadline
            .guard("list_users", instance_id, async {
                Ok(self.client.list_users(region, instance_id, None).await?)
            })
            .await?;
        Ok(users
            .into_iter()
            .find(|user| user.is_admin)
            .map(|user| user.name))
    }

    /// Applies a declared change to an existing instance and returns the
    /// refreshed state.
    ///
    /// # Errors
    ///
    /// Returns plan errors (including a required replacement as
    /// [`ProviderError::InvalidAttribute`]), remote failures and deadline
    /// outcomes. Steps applied before a failure stay applied.
    pub async fn update_instance(
        &self,
        op: &Operation,
        prior: &InstanceState,
        config: &InstanceConfig,
    ) -> Result<InstanceState, ProviderError> {
        if let Plan::Replace { attributes } = self.plan_instance(Some(prior), config)? {
            return Err(ProviderError::invalid_attribute(
                &attributes.join(","),
                "cannot change in place; the instance must be replaced",
            ));
        }
        let (scope, instance_id) = locality::parse_localized(&prior.id)?;
        let region = scope.region();

        let observed = self
            .wait_for_instance(&op.deadline, &region, &instance_id)
            .await?;
        let steps = plan_upgrades(
            &prior.id,
            &observed_shape(&observed),
            &config.shape(),
            observed.status,
        )?;
        for step in &steps {
            self.apply_upgrade(op, &region, &instance_id, step).await?;
        }

        let scalars = scalar_update(prior, config);
        if !scalars.is_empty() {
            self.wait_for_instance(&op.deadline, &region, &instance_id)
                .await?;
            info!(instance_id = %prior.id, "updating instance attributes");
            op.deadline
                .guard("update_instance", &instance_id, async {
                    Ok(self
                        .client
                        .update_instance(&region, &instance_id, &scalars)
                        .await?)
                })
                .await?;
        }

        if config.settings != prior.settings {
            self.apply_settings(op, &region, &instance_id, &config.settings)
                .await?;
        }

        let user_name = prior.user_name.clone().or_else(|| config.user_name.clone());
        if let Some(password) = password_change(prior, config) {
            self.rotate_admin_password(op, &region, &instance_id, user_name.as_deref(), password)
                .await?;
        }

        self.reconcile_instance_endpoints(op, &region, &instance_id, prior, config)
            .await?;

        let carried = Carried {
            user_name,
            password: config
                .password
                .as_ref()
                .map(|password| password.settled_state(prior.password.as_ref()))
                .or_else(|| prior.password.clone()),
            snapshot_id: config.snapshot_id.clone(),
        };
        self.refresh_instance(op, &prior.id, carried)
            .await?
            .ok_or_else(|| vanished(&prior.id))
    }

    async fn apply_upgrade(
        &self,
        op: &Operation,
        region: &Region,
        instance_id: &str,
        step: &UpgradeOp,
    ) -> Result<(), ProviderError> {
        self.wait_for_instance(&op.deadline, region, instance_id)
            .await?;
        info!(instance_id, ?step, "applying upgrade");
        let request = step.to_request();
        op.deadline
            .guard("upgrade_instance", instance_id, async {
                Ok(self
                    .client
                    .upgrade_instance(region, instance_id, &request)
                    .await?)
            })
            .await?;
        let settled = self
            .wait_for_instance(&op.deadline, region, instance_id)
            .await;
        if tolerate_not_found(settled)?.is_none() {
            debug!(instance_id, "instance disappeared after upgrade; treating as applied");
        }
        Ok(())
    }

    async fn apply_settings(
        &self,
        op: &Operation,
        region: &Region,
        instance_id: &str,
        settings: &BTreeMap<String, String>,
    ) -> Result<(), ProviderError> {
        self.wait_for_instance(&op.deadline, region, instance_id)
            .await?;
        let payload = InstanceSetting::from_map(settings);
        info!(instance_id, count = payload.len(), "setting runtime settings");
        op.deadline
            .guard("set_instance_settings", instance_id, async {
                Ok(self
                    .client
                    .set_instance_settings(region, instance_id, &payload)
                    .await?)
            })
            .await?;
        Ok(())
    }

    async fn rotate_admin_password(
        &self,
        op: &Operation,
        region: &Region,
        instance_id: &str,
        user_name: Option<&str>,
        password: &PasswordConfig,
    ) -> Result<(), ProviderError> {
        let listed = if user_name.is_none() {
            self.admin_user_name(op, region, instance_id).await?
        } else {
            None
        };
        let admin = user_name
            .map(str::to_owned)
            .or(listed)
            .ok_or_else(|| ProviderError::invalid_attribute("user_name", "no admin user to update"))?;
        self.wait_for_instance(&op.deadline, region, instance_id)
            .await?;
        info!(instance_id, user = %admin, "rotating admin password");
        let request = UpdateUserRequest {
            password: Some(password.secret().to_owned()),
            is_admin: None,
        };
        op.deadline
            .guard("update_user", instance_id, async {
                Ok(self
                    .client
                    .update_user(region, instance_id, &admin, &request)
                    .await?)
            })
            .await?;
        Ok(())
    }

    async fn reconcile_instance_endpoints(
        &self,
        op: &Operation,
        region: &Region,
        instance_id: &str,
        prior: &InstanceState,
        config: &InstanceConfig,
    ) -> Result<(), ProviderError> {
        let owner = EndpointOwner::Instance(instance_id);
        if private_network_changed(prior.private_network.first(), config.private_network.as_ref()) {
            let spec = config
                .private_network
                .as_ref()
                .map(|block| expand_private_network(block, &op.diagnostics))
                .transpose()?;
            let observed = self
                .wait_for_instance(&op.deadline, region, instance_id)
                .await?;
            self.replace_endpoints(
                &op.deadline,
                region,
                owner,
                EndpointSlot::PrivateNetwork,
                &observed.endpoints,
                spec.as_ref(),
            )
            .await?;
        }
        if load_balancer_changed(prior, config) {
            let spec = config.load_balancer.then_some(EndpointSpec::LoadBalancer {});
            let observed = self
                .wait_for_instance(&op.deadline, region, instance_id)
                .await?;
            self.replace_endpoints(
                &op.deadline,
                region,
                owner,
                EndpointSlot::LoadBalancer,
                &observed.endpoints,
                spec.as_ref(),
            )
            .await?;
        }
        Ok(())
    }

    /// Deletes an instance; a missing instance counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_instance(
        &self,
        op: &Operation,
        state: &InstanceState,
    ) -> Result<(), ProviderError> {
        let (scope, instance_id) = locality::parse_localized(&state.id)?;
        let region = scope.region();
        let waited = self
            .wait_for_instance(&op.deadline, &region, &instance_id)
            .await;
        if tolerate_not_found(waited)?.is_none() {
            return Ok(());
        }
        info!(instance_id = %state.id, "deleting database instance");
        let deleted = op
            .deadline
            .guard("delete_instance", &instance_id, async {
                Ok(self.client.delete_instance(&region, &instance_id).await?)
            })
            .await;
        tolerate_not_found(deleted)?;
        self.wait_for_instance_gone(&op.deadline, &region, &instance_id)
            .await
    }
}

fn vanished(id: &str) -> ProviderError {
    ProviderError::RemoteNotFound {
        message: format!("instance {id} disappeared while being applied"),
    }
}

#[cfg(test)]
mod tests;
