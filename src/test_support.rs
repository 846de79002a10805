//! Test support utilities shared across unit and integration tests.
//!
//! [`FakeScaleway`] keeps remote state in memory, records every call in
//! order and lets tests script failures and status transitions.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::api::types::{
    AclRule, AclRuleRequest, ArtifactStatus, BackupSchedule, CreateDatabaseBackupRequest,
    CreateInstanceFromSnapshotRequest, CreateInstanceRequest, CreateReadReplicaRequest,
    CreateSnapshotRequest, CreateUserRequest, Database, DatabaseBackup, EncryptionAtRest,
    Endpoint, EndpointKind, EndpointSpec, Instance, InstanceLog, InstanceSetting, InstanceStatus,
    IpamIp, IpamResource, JobRun, ListIpsRequest, PrepareInstanceLogsRequest,
    PrivateNetworkDetails, Privilege, PurgeInstanceLogsRequest, ReadReplica, ReadReplicaRef,
    ReadReplicaStatus, RestoreDatabaseBackupRequest, SetPrivilegeRequest, Snapshot,
    SnapshotVolumeType, StartJobDefinitionRequest, UpdateDatabaseBackupRequest,
    UpdateInstanceRequest, UpdateSnapshotRequest, UpdateUserRequest, UpgradeInstanceRequest, User,
    Volume, VolumeType,
};
use crate::api::{ApiError, ApiFuture, IpamApi, JobsApi, RdbApi};
use crate::locality::{Region, Zone};

/// Certificate body served by the fake.
pub const FAKE_CERTIFICATE: &str =
    "-----BEGIN CERTIFICATE-----\nMIIFAKE\n-----END CERTIFICATE-----\n";

/// Port reported on every fake endpoint.
pub const FAKE_PORT: u16 = 5432;

/// Bytes per gigabyte on the wire.
pub const GB: u64 = 1_000_000_000;

/// One remote call observed by the fake.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedCall {
    /// Operation name, for example `upgrade_instance`.
    pub operation: String,
    /// Identifier the call targeted.
    pub target: String,
    /// Compact rendering of the payload.
    pub detail: String,
}

#[derive(Debug)]
struct InjectedFailure {
    operation: String,
    remaining: u32,
    error: ApiError,
}

#[derive(Debug, Default)]
struct State {
    instances: BTreeMap<String, Instance>,
    status_scripts: BTreeMap<String, VecDeque<InstanceStatus>>,
    read_replicas: BTreeMap<String, ReadReplica>,
    acl_rules: BTreeMap<String, Vec<AclRule>>,
    databases: BTreeMap<String, Vec<Database>>,
    users: BTreeMap<String, Vec<User>>,
    passwords: BTreeMap<(String, String), String>,
    privileges: BTreeMap<String, Vec<Privilege>>,
    snapshots: BTreeMap<String, Snapshot>,
    backups: BTreeMap<String, DatabaseBackup>,
    ipam: Vec<IpamIp>,
    job_runs: BTreeMap<String, JobRun>,
    calls: Vec<RecordedCall>,
    failures: Vec<InjectedFailure>,
    vanish_after: BTreeSet<String>,
    next_host: u8,
}

/// In-memory implementation of the remote API traits.
#[derive(Clone, Debug, Default)]
pub struct FakeScaleway {
    state: Arc<Mutex<State>>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::NotFound(format!("{kind} {id} not found"))
}

fn zone_of(region: &Region) -> Result<Zone, ApiError> {
    Zone::parse(&format!("{region}-1")).map_err(|err| ApiError::Status {
        status: 400,
        message: err.to_string(),
    })
}

/// Builds a ready PostgreSQL instance on block storage for seeding tests.
#[must_use]
pub fn sample_instance(id: &str, region: &Region) -> Instance {
    Instance {
        id: id.to_owned(),
        name: String::from("test-instance"),
        region: region.clone(),
        organization_id: String::from("org"),
        project_id: String::from("project"),
        status: InstanceStatus::Ready,
        engine: String::from("PostgreSQL-15"),
        upgradable_version: Vec::new(),
        tags: Vec::new(),
        settings: Vec::new(),
        init_settings: Vec::new(),
        backup_schedule: Some(BackupSchedule {
            frequency: 24,
            retention: 7,
            disabled: false,
            next_run_at: None,
        }),
        is_ha_cluster: false,
        read_replicas: Vec::new(),
        node_type: String::from("DB-DEV-S"),
        volume: Some(Volume {
            volume_type: VolumeType::Sbs5k,
            size: 20 * GB,
        }),
        endpoints: Vec::new(),
        logs_policy: None,
        backup_same_region: false,
        encryption: Some(EncryptionAtRest { enabled: false }),
    }
}

impl State {
    fn record(&mut self, operation: &str, target: &str, detail: String) -> Result<(), ApiError> {
        self.calls.push(RecordedCall {
            operation: operation.to_owned(),
            target: target.to_owned(),
            detail,
        });
        let position = self
            .failures
            .iter()
            .position(|failure| failure.operation == operation && failure.remaining > 0);
        let Some(index) = position else {
            return Ok(());
        };
        let Some(failure) = self.failures.get_mut(index) else {
            return Ok(());
        };
        failure.remaining -= 1;
        let error = failure.error.clone();
        if failure.remaining == 0 {
            self.failures.remove(index);
        }
        Err(error)
    }

    fn instance_mut(&mut self, id: &str) -> Result<&mut Instance, ApiError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| not_found("instance", id))
    }

    fn replica_mut(&mut self, id: &str) -> Result<&mut ReadReplica, ApiError> {
        self.read_replicas
            .get_mut(id)
            .ok_or_else(|| not_found("read replica", id))
    }

    fn require_instance(&self, id: &str) -> Result<&Instance, ApiError> {
        self.instances
            .get(id)
            .ok_or_else(|| not_found("instance", id))
    }

    fn next_address(&mut self) -> String {
        self.next_host = self.next_host.wrapping_add(1).max(2);
        format!("172.16.0.{}", self.next_host)
    }

    fn allocate_ipam(&mut self, owner_instance: &str) -> String {
        let address = format!("{}/22", self.next_address());
        self.ipam.push(IpamIp {
            id: new_id(),
            address: address.clone(),
            resource: Some(IpamResource {
                resource_type: String::from("rdb_instance"),
                id: owner_instance.to_owned(),
            }),
            is_ipv6: false,
        });
        address
    }

    fn build_endpoint(
        &mut self,
        owner_instance: &str,
        region: &Region,
        spec: &EndpointSpec,
    ) -> Result<Endpoint, ApiError> {
        let id = new_id();
        let endpoint = match spec {
            EndpointSpec::LoadBalancer {} => Endpoint {
                ip: Some(format!("51.159.0.{}", self.next_host.wrapping_add(10))),
                port: FAKE_PORT,
                name: Some(String::from("load-balancer")),
                hostname: Some(format!("{id}.rdb.{region}.scw.cloud")),
                id,
                kind: EndpointKind::LoadBalancer,
            },
            EndpointSpec::DirectAccess {} => Endpoint {
                ip: Some(format!("51.159.1.{}", self.next_host.wrapping_add(10))),
                port: FAKE_PORT,
                name: None,
                hostname: Some(format!("{id}.rdb.{region}.scw.cloud")),
                id,
                kind: EndpointKind::DirectAccess,
            },
            EndpointSpec::PrivateNetwork(pn) => {
                let service_ip = pn
                    .service_ip
                    .clone()
                    .unwrap_or_else(|| self.allocate_ipam(owner_instance));
                let host = service_ip
                    .split_once('/')
                    .map_or(service_ip.as_str(), |(ip, _)| ip)
                    .to_owned();
                Endpoint {
                    ip: Some(host),
                    port: FAKE_PORT,
                    name: None,
                    hostname: None,
                    id,
                    kind: EndpointKind::PrivateNetwork(PrivateNetworkDetails {
                        private_network_id: pn.private_network_id.clone(),
                        service_ip,
                        zone: zone_of(region)?,
                    }),
                }
            }
        };
        Ok(endpoint)
    }

    fn release_endpoint(&mut self, owner_instance: &str, endpoint: &Endpoint) {
        if let EndpointKind::PrivateNetwork(details) = &endpoint.kind {
            self.ipam.retain(|ip| {
                !(ip.address == details.service_ip
                    && ip
                        .resource
                        .as_ref()
                        .is_some_and(|resource| resource.id == owner_instance))
            });
        }
    }
}

impl FakeScaleway {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond<T>(
        &self,
        operation: &str,
        target: &str,
        detail: String,
        apply: impl FnOnce(&mut State) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut state = self.lock();
        state.record(operation, target, detail)?;
        let outcome = apply(&mut state)?;
        if state.vanish_after.remove(operation) {
            state.instances.remove(target);
        }
        Ok(outcome)
    }

    /// Stores `instance` as if it had been created remotely.
    pub fn seed_instance(&self, instance: Instance) {
        self.lock().instances.insert(instance.id.clone(), instance);
    }

    /// Returns the stored instance.
    #[must_use]
    pub fn instance(&self, id: &str) -> Option<Instance> {
        self.lock().instances.get(id).cloned()
    }

    /// Overwrites the status of a stored instance.
    pub fn set_instance_status(&self, id: &str, status: InstanceStatus) {
        if let Some(instance) = self.lock().instances.get_mut(id) {
            instance.status = status;
        }
    }

    /// Queues statuses that successive `get_instance` calls report before
    /// the stored status takes over again.
    pub fn script_instance_statuses(
        &self,
        id: &str,
        statuses: impl IntoIterator<Item = InstanceStatus>,
    ) {
        self.lock()
            .status_scripts
            .entry(id.to_owned())
            .or_default()
            .extend(statuses);
    }

    /// Stores a read replica.
    pub fn seed_read_replica(&self, replica: ReadReplica) {
        self.lock()
            .read_replicas
            .insert(replica.id.clone(), replica);
    }

    /// Returns the stored read replica.
    #[must_use]
    pub fn read_replica(&self, id: &str) -> Option<ReadReplica> {
        self.lock().read_replicas.get(id).cloned()
    }

    /// Replaces the ACL rules of an instance.
    pub fn seed_acl_rules(&self, instance_id: &str, rules: Vec<AclRule>) {
        self.lock().acl_rules.insert(instance_id.to_owned(), rules);
    }

    /// Returns the ACL rules of an instance.
    #[must_use]
    pub fn acl_rules(&self, instance_id: &str) -> Vec<AclRule> {
        self.lock()
            .acl_rules
            .get(instance_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a user with `password`.
    pub fn seed_user(&self, instance_id: &str, user: User, password: &str) {
        let mut state = self.lock();
        state.passwords.insert(
            (instance_id.to_owned(), user.name.clone()),
            password.to_owned(),
        );
        state
            .users
            .entry(instance_id.to_owned())
            .or_default()
            .push(user);
    }

    /// Returns the current password of a user.
    #[must_use]
    pub fn user_password(&self, instance_id: &str, name: &str) -> Option<String> {
        self.lock()
            .passwords
            .get(&(instance_id.to_owned(), name.to_owned()))
            .cloned()
    }

    /// Returns the users of an instance.
    #[must_use]
    pub fn users(&self, instance_id: &str) -> Vec<User> {
        self.lock()
            .users
            .get(instance_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a logical database.
    pub fn seed_database(&self, instance_id: &str, database: Database) {
        self.lock()
            .databases
            .entry(instance_id.to_owned())
            .or_default()
            .push(database);
    }

    /// Returns the logical databases of an instance.
    #[must_use]
    pub fn databases(&self, instance_id: &str) -> Vec<Database> {
        self.lock()
            .databases
            .get(instance_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a privilege.
    pub fn seed_privilege(&self, instance_id: &str, privilege: Privilege) {
        self.lock()
            .privileges
            .entry(instance_id.to_owned())
            .or_default()
            .push(privilege);
    }

    /// Returns the privileges of an instance.
    #[must_use]
    pub fn privileges(&self, instance_id: &str) -> Vec<Privilege> {
        self.lock()
            .privileges
            .get(instance_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a snapshot.
    pub fn seed_snapshot(&self, snapshot: Snapshot) {
        self.lock().snapshots.insert(snapshot.id.clone(), snapshot);
    }

    /// Returns the stored snapshot.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Snapshot> {
        self.lock().snapshots.get(id).cloned()
    }

    /// Stores a database backup.
    pub fn seed_backup(&self, backup: DatabaseBackup) {
        self.lock().backups.insert(backup.id.clone(), backup);
    }

    /// Returns the stored database backup.
    #[must_use]
    pub fn backup(&self, id: &str) -> Option<DatabaseBackup> {
        self.lock().backups.get(id).cloned()
    }

    /// Registers an address in the address-management service.
    pub fn seed_ipam_ip(&self, ip: IpamIp) {
        self.lock().ipam.push(ip);
    }

    /// Returns every address known to the address-management service.
    #[must_use]
    pub fn ipam_ips(&self) -> Vec<IpamIp> {
        self.lock().ipam.clone()
    }

    /// Removes the target instance once the next call to `operation`
    /// succeeds, as when the remote deletes it mid-operation.
    pub fn vanish_after(&self, operation: &str) {
        self.lock().vanish_after.insert(operation.to_owned());
    }

    /// Makes the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: &str, error: ApiError) {
        self.fail_times(operation, 1, error);
    }

    /// Makes the next `times` calls to `operation` fail with `error`.
    pub fn fail_times(&self, operation: &str, times: u32, error: ApiError) {
        self.lock().failures.push(InjectedFailure {
            operation: operation.to_owned(),
            remaining: times,
            error,
        });
    }

    /// Returns every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Returns the recorded calls to `operation`.
    #[must_use]
    pub fn calls_named(&self, operation: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    /// Returns how many times `operation` was called.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Returns the names of mutating calls, skipping reads and lists.
    #[must_use]
    pub fn mutations(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|call| {
                !(call.operation.starts_with("get_") || call.operation.starts_with("list_"))
            })
            .map(|call| call.operation.clone())
            .collect()
    }

    /// Returns the upgrade payloads in the order they were applied.
    #[must_use]
    pub fn upgrade_details(&self) -> Vec<String> {
        self.calls_named("upgrade_instance")
            .into_iter()
            .map(|call| call.detail)
            .collect()
    }

    /// Forgets every recorded call.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

fn render<T: std::fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

fn upgrade_label(request: &UpgradeInstanceRequest) -> String {
    match request {
        UpgradeInstanceRequest::NodeType(node_type) => format!("node_type={node_type}"),
        UpgradeInstanceRequest::EnableHa(enabled) => format!("enable_ha={enabled}"),
        UpgradeInstanceRequest::VolumeSize(size) => format!("volume_size={size}"),
        UpgradeInstanceRequest::VolumeType(volume_type) => {
            format!("volume_type={}", volume_type.as_str())
        }
        UpgradeInstanceRequest::EnableEncryption(enabled) => {
            format!("enable_encryption={enabled}")
        }
    }
}

fn apply_upgrade(instance: &mut Instance, request: &UpgradeInstanceRequest) -> Result<(), ApiError> {
    match request {
        UpgradeInstanceRequest::NodeType(node_type) => {
            if instance.status == InstanceStatus::DiskFull {
                return Err(ApiError::Status {
                    status: 400,
                    message: String::from("instance is disk full; increase the volume first"),
                });
            }
            instance.node_type.clone_from(node_type);
        }
        UpgradeInstanceRequest::EnableHa(enabled) => instance.is_ha_cluster = *enabled,
        UpgradeInstanceRequest::VolumeSize(size) => {
            let volume = instance.volume.get_or_insert_with(Volume::default);
            volume.size = *size;
            if instance.status == InstanceStatus::DiskFull {
                instance.status = InstanceStatus::Ready;
            }
        }
        UpgradeInstanceRequest::VolumeType(volume_type) => {
            let volume = instance.volume.get_or_insert_with(Volume::default);
            volume.volume_type = *volume_type;
        }
        UpgradeInstanceRequest::EnableEncryption(enabled) => {
            instance.encryption = Some(EncryptionAtRest { enabled: *enabled });
        }
    }
    Ok(())
}

impl RdbApi for FakeScaleway {
    fn create_instance<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateInstanceRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            self.respond("create_instance", &request.name, render(request), |state| {
                let id = new_id();
                let mut endpoints = Vec::with_capacity(request.init_endpoints.len());
                for spec in &request.init_endpoints {
                    endpoints.push(state.build_endpoint(&id, region, spec)?);
                }
                let instance = Instance {
                    id: id.clone(),
                    name: request.name.clone(),
                    region: region.clone(),
                    organization_id: String::from("org"),
                    project_id: request
                        .project_id
                        .clone()
                        .unwrap_or_else(|| String::from("project")),
                    status: InstanceStatus::Ready,
                    engine: request.engine.clone(),
                    upgradable_version: Vec::new(),
                    tags: request.tags.clone(),
                    settings: Vec::new(),
                    init_settings: request.init_settings.clone(),
                    backup_schedule: Some(BackupSchedule {
                        frequency: 24,
                        retention: 7,
                        disabled: request.disable_backup,
                        next_run_at: None,
                    }),
                    is_ha_cluster: request.is_ha_cluster,
                    read_replicas: Vec::new(),
                    node_type: request.node_type.clone(),
                    volume: Some(Volume {
                        volume_type: request.volume_type,
                        size: request.volume_size.unwrap_or(5 * GB),
                    }),
                    endpoints,
                    logs_policy: None,
                    backup_same_region: request.backup_same_region,
                    encryption: Some(request.encryption.unwrap_or_default()),
                };
                state.passwords.insert(
                    (id.clone(), request.user_name.clone()),
                    request.password.clone(),
                );
                state.users.entry(id.clone()).or_default().push(User {
                    name: request.user_name.clone(),
                    is_admin: true,
                });
                state.instances.insert(id, instance.clone());
                Ok(instance)
            })
        })
    }

    fn create_instance_from_snapshot<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateInstanceFromSnapshotRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            self.respond(
                "create_instance_from_snapshot",
                &request.snapshot_id,
                render(request),
                |state| {
                    let snapshot = state
                        .snapshots
                        .get(&request.snapshot_id)
                        .cloned()
                        .ok_or_else(|| not_found("snapshot", &request.snapshot_id))?;
                    let source = state.require_instance(&snapshot.instance_id).ok().cloned();
                    let id = new_id();
                    let mut instance = source.unwrap_or_else(|| sample_instance(&id, region));
                    instance.id.clone_from(&id);
                    instance.name.clone_from(&request.instance_name);
                    instance.node_type.clone_from(&request.node_type);
                    instance.is_ha_cluster = request.is_ha_cluster;
                    instance.status = InstanceStatus::Ready;
                    instance.endpoints = Vec::new();
                    instance.read_replicas = Vec::new();
                    state.instances.insert(id, instance.clone());
                    Ok(instance)
                },
            )
        })
    }

    fn get_instance<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            self.respond("get_instance", instance_id, String::new(), |state| {
                let scripted = state
                    .status_scripts
                    .get_mut(instance_id)
                    .and_then(VecDeque::pop_front);
                let mut instance = state.require_instance(instance_id)?.clone();
                if let Some(status) = scripted {
                    instance.status = status;
                }
                Ok(instance)
            })
        })
    }

    fn update_instance<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        request: &'a UpdateInstanceRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            self.respond("update_instance", instance_id, render(request), |state| {
                let instance = state.instance_mut(instance_id)?;
                if let Some(name) = &request.name {
                    instance.name.clone_from(name);
                }
                if let Some(tags) = &request.tags {
                    instance.tags.clone_from(tags);
                }
                let schedule = instance
                    .backup_schedule
                    .get_or_insert_with(BackupSchedule::default);
                if let Some(frequency) = request.backup_schedule_frequency {
                    schedule.frequency = frequency;
                }
                if let Some(retention) = request.backup_schedule_retention {
                    schedule.retention = retention;
                }
                if let Some(disabled) = request.is_backup_schedule_disabled {
                    schedule.disabled = disabled;
                }
                if let Some(policy) = &request.logs_policy {
                    instance.logs_policy = Some(policy.clone());
                }
                if let Some(same_region) = request.backup_same_region {
                    instance.backup_same_region = same_region;
                }
                Ok(instance.clone())
            })
        })
    }

    fn upgrade_instance<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        request: &'a UpgradeInstanceRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            self.respond("upgrade_instance", instance_id, upgrade_label(request), |state| {
                let instance = state.instance_mut(instance_id)?;
                apply_upgrade(instance, request)?;
                Ok(instance.clone())
            })
        })
    }

    fn delete_instance<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            self.respond("delete_instance", instance_id, String::new(), |state| {
                let mut instance = state
                    .instances
                    .remove(instance_id)
                    .ok_or_else(|| not_found("instance", instance_id))?;
                state.acl_rules.remove(instance_id);
                state.databases.remove(instance_id);
                state.users.remove(instance_id);
                state.privileges.remove(instance_id);
                state
                    .read_replicas
                    .retain(|_, replica| replica.instance_id != instance_id);
                state.ipam.retain(|ip| {
                    ip.resource
                        .as_ref()
                        .is_none_or(|resource| resource.id != instance_id)
                });
                instance.status = InstanceStatus::Deleting;
                Ok(instance)
            })
        })
    }

    fn get_instance_certificate<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, String> {
        Box::pin(async move {
            self.respond("get_instance_certificate", instance_id, String::new(), |state| {
                state.require_instance(instance_id)?;
                Ok(String::from(FAKE_CERTIFICATE))
            })
        })
    }

    fn renew_instance_certificate<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.respond("renew_instance_certificate", instance_id, String::new(), |state| {
                state.require_instance(instance_id).map(|_| ())
            })
        })
    }

    fn set_instance_settings<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        settings: &'a [InstanceSetting],
    ) -> ApiFuture<'a, Vec<InstanceSetting>> {
        Box::pin(async move {
            self.respond("set_instance_settings", instance_id, render(&settings), |state| {
                let instance = state.instance_mut(instance_id)?;
                for setting in settings {
                    instance.settings.retain(|existing| existing.name != setting.name);
                    instance.settings.push(setting.clone());
                }
                instance.settings.sort();
                Ok(instance.settings.clone())
            })
        })
    }

    fn set_instance_acl_rules<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        rules: &'a [AclRuleRequest],
    ) -> ApiFuture<'a, Vec<AclRule>> {
        Box::pin(async move {
            self.respond("set_instance_acl_rules", instance_id, render(&rules), |state| {
                state.require_instance(instance_id)?;
                let stored: Vec<AclRule> = rules
                    .iter()
                    .map(|rule| AclRule {
                        ip: rule.ip.clone(),
                        description: rule.description.clone(),
                        port: Some(FAKE_PORT),
                        protocol: Some(String::from("tcp")),
                        direction: Some(String::from("inbound")),
                        action: Some(String::from("allow")),
                    })
                    .collect();
                state.acl_rules.insert(instance_id.to_owned(), stored.clone());
                Ok(stored)
            })
        })
    }

    fn list_instance_acl_rules<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Vec<AclRule>> {
        Box::pin(async move {
            self.respond("list_instance_acl_rules", instance_id, String::new(), |state| {
                state.require_instance(instance_id)?;
                Ok(state.acl_rules.get(instance_id).cloned().unwrap_or_default())
            })
        })
    }

    fn delete_instance_acl_rules<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        ips: &'a [String],
    ) -> ApiFuture<'a, Vec<AclRule>> {
        Box::pin(async move {
            self.respond("delete_instance_acl_rules", instance_id, ips.join(","), |state| {
                state.require_instance(instance_id)?;
                let rules = state.acl_rules.entry(instance_id.to_owned()).or_default();
                let (removed, kept): (Vec<AclRule>, Vec<AclRule>) =
                    rules.drain(..).partition(|rule| ips.contains(&rule.ip));
                *rules = kept;
                Ok(removed)
            })
        })
    }

    fn create_database<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, Database> {
        Box::pin(async move {
            self.respond("create_database", instance_id, name.to_owned(), |state| {
                state.require_instance(instance_id)?;
                let databases = state.databases.entry(instance_id.to_owned()).or_default();
                if databases.iter().any(|database| database.name == name) {
                    return Err(ApiError::Status {
                        status: 400,
                        message: format!("database {name} already exists"),
                    });
                }
                let database = Database {
                    name: name.to_owned(),
                    owner: String::new(),
                    managed: true,
                    size: 0,
                };
                databases.push(database.clone());
                Ok(database)
            })
        })
    }

    fn list_databases<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Database>> {
        Box::pin(async move {
            self.respond("list_databases", instance_id, String::new(), |state| {
                state.require_instance(instance_id)?;
                Ok(state
                    .databases
                    .get(instance_id)
                    .into_iter()
                    .flatten()
                    .filter(|database| name.is_none_or(|wanted| database.name == wanted))
                    .cloned()
                    .collect())
            })
        })
    }

    fn delete_database<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.respond("delete_database", instance_id, name.to_owned(), |state| {
                state.require_instance(instance_id)?;
                let databases = state.databases.entry(instance_id.to_owned()).or_default();
                let before = databases.len();
                databases.retain(|database| database.name != name);
                if databases.len() == before {
                    return Err(not_found("database", name));
                }
                Ok(())
            })
        })
    }

    fn create_user<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        request: &'a CreateUserRequest,
    ) -> ApiFuture<'a, User> {
        Box::pin(async move {
            self.respond("create_user", instance_id, request.name.clone(), |state| {
                state.require_instance(instance_id)?;
                let user = User {
                    name: request.name.clone(),
                    is_admin: request.is_admin,
                };
                state.passwords.insert(
                    (instance_id.to_owned(), request.name.clone()),
                    request.password.clone(),
                );
                state
                    .users
                    .entry(instance_id.to_owned())
                    .or_default()
                    .push(user.clone());
                Ok(user)
            })
        })
    }

    fn list_users<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<User>> {
        Box::pin(async move {
            self.respond("list_users", instance_id, String::new(), |state| {
                state.require_instance(instance_id)?;
                Ok(state
                    .users
                    .get(instance_id)
                    .into_iter()
                    .flatten()
                    .filter(|user| name.is_none_or(|wanted| user.name == wanted))
                    .cloned()
                    .collect())
            })
        })
    }

    fn update_user<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
        request: &'a UpdateUserRequest,
    ) -> ApiFuture<'a, User> {
        Box::pin(async move {
            let detail = format!(
                "password={} is_admin={:?}",
                request.password.is_some(),
                request.is_admin
            );
            self.respond("update_user", instance_id, detail, |state| {
                let user = state
                    .users
                    .get_mut(instance_id)
                    .and_then(|users| users.iter_mut().find(|user| user.name == name))
                    .ok_or_else(|| not_found("user", name))?;
                if let Some(is_admin) = request.is_admin {
                    user.is_admin = is_admin;
                }
                let updated = user.clone();
                if let Some(password) = &request.password {
                    state.passwords.insert(
                        (instance_id.to_owned(), name.to_owned()),
                        password.clone(),
                    );
                }
                Ok(updated)
            })
        })
    }

    fn delete_user<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.respond("delete_user", instance_id, name.to_owned(), |state| {
                state.require_instance(instance_id)?;
                let users = state.users.entry(instance_id.to_owned()).or_default();
                let before = users.len();
                users.retain(|user| user.name != name);
                if users.len() == before {
                    return Err(not_found("user", name));
                }
                state
                    .passwords
                    .remove(&(instance_id.to_owned(), name.to_owned()));
                Ok(())
            })
        })
    }

    fn set_privilege<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        request: &'a SetPrivilegeRequest,
    ) -> ApiFuture<'a, Privilege> {
        Box::pin(async move {
            let detail = format!(
                "{}/{}={}",
                request.database_name,
                request.user_name,
                request.permission.as_str()
            );
            self.respond("set_privilege", instance_id, detail, |state| {
                state.require_instance(instance_id)?;
                let privileges = state.privileges.entry(instance_id.to_owned()).or_default();
                privileges.retain(|existing| {
                    !(existing.database_name == request.database_name
                        && existing.user_name == request.user_name)
                });
                let privilege = Privilege {
                    permission: request.permission,
                    database_name: request.database_name.clone(),
                    user_name: request.user_name.clone(),
                };
                privileges.push(privilege.clone());
                Ok(privilege)
            })
        })
    }

    fn list_privileges<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        database_name: Option<&'a str>,
        user_name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Privilege>> {
        Box::pin(async move {
            self.respond("list_privileges", instance_id, String::new(), |state| {
                state.require_instance(instance_id)?;
                Ok(state
                    .privileges
                    .get(instance_id)
                    .into_iter()
                    .flatten()
                    .filter(|privilege| {
                        database_name.is_none_or(|wanted| privilege.database_name == wanted)
                            && user_name.is_none_or(|wanted| privilege.user_name == wanted)
                    })
                    .cloned()
                    .collect())
            })
        })
    }

    fn create_read_replica<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateReadReplicaRequest,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            self.respond(
                "create_read_replica",
                &request.instance_id,
                render(&request.endpoint_spec),
                |state| {
                    state.require_instance(&request.instance_id)?;
                    let id = new_id();
                    let mut endpoints = Vec::with_capacity(request.endpoint_spec.len());
                    for spec in &request.endpoint_spec {
                        endpoints.push(state.build_endpoint(&request.instance_id, region, spec)?);
                    }
                    let replica = ReadReplica {
                        id: id.clone(),
                        endpoints,
                        status: ReadReplicaStatus::Ready,
                        region: region.clone(),
                        same_zone: request.same_zone,
                        instance_id: request.instance_id.clone(),
                    };
                    state
                        .instance_mut(&request.instance_id)?
                        .read_replicas
                        .push(ReadReplicaRef { id: id.clone() });
                    state.read_replicas.insert(id, replica.clone());
                    Ok(replica)
                },
            )
        })
    }

    fn get_read_replica<'a>(
        &'a self,
        _region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            self.respond("get_read_replica", read_replica_id, String::new(), |state| {
                state
                    .read_replicas
                    .get(read_replica_id)
                    .cloned()
                    .ok_or_else(|| not_found("read replica", read_replica_id))
            })
        })
    }

    fn delete_read_replica<'a>(
        &'a self,
        _region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            self.respond("delete_read_replica", read_replica_id, String::new(), |state| {
                let mut replica = state
                    .read_replicas
                    .remove(read_replica_id)
                    .ok_or_else(|| not_found("read replica", read_replica_id))?;
                if let Some(instance) = state.instances.get_mut(&replica.instance_id) {
                    instance
                        .read_replicas
                        .retain(|reference| reference.id != read_replica_id);
                }
                for endpoint in replica.endpoints.clone() {
                    state.release_endpoint(&replica.instance_id, &endpoint);
                }
                replica.status = ReadReplicaStatus::Deleting;
                Ok(replica)
            })
        })
    }

    fn reset_read_replica<'a>(
        &'a self,
        _region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            self.respond("reset_read_replica", read_replica_id, String::new(), |state| {
                let replica = state.replica_mut(read_replica_id)?;
                replica.status = ReadReplicaStatus::Ready;
                Ok(replica.clone())
            })
        })
    }

    fn promote_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            self.respond("promote_read_replica", read_replica_id, String::new(), |state| {
                let replica = state
                    .read_replicas
                    .remove(read_replica_id)
                    .ok_or_else(|| not_found("read replica", read_replica_id))?;
                let primary = state.require_instance(&replica.instance_id).ok().cloned();
                if let Some(instance) = state.instances.get_mut(&replica.instance_id) {
                    instance
                        .read_replicas
                        .retain(|reference| reference.id != read_replica_id);
                }
                let mut promoted =
                    primary.unwrap_or_else(|| sample_instance(read_replica_id, region));
                promoted.id = read_replica_id.to_owned();
                promoted.endpoints = replica.endpoints;
                promoted.read_replicas = Vec::new();
                promoted.status = InstanceStatus::Ready;
                state
                    .instances
                    .insert(promoted.id.clone(), promoted.clone());
                Ok(promoted)
            })
        })
    }

    fn create_read_replica_endpoint<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
        specs: &'a [EndpointSpec],
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            self.respond(
                "create_read_replica_endpoint",
                read_replica_id,
                render(&specs),
                |state| {
                    let owner = state.replica_mut(read_replica_id)?.instance_id.clone();
                    let mut created = Vec::with_capacity(specs.len());
                    for spec in specs {
                        created.push(state.build_endpoint(&owner, region, spec)?);
                    }
                    let replica = state.replica_mut(read_replica_id)?;
                    replica.endpoints.extend(created);
                    Ok(replica.clone())
                },
            )
        })
    }

    fn create_endpoint<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        spec: &'a EndpointSpec,
    ) -> ApiFuture<'a, Endpoint> {
        Box::pin(async move {
            self.respond("create_endpoint", instance_id, render(spec), |state| {
                state.require_instance(instance_id)?;
                let endpoint = state.build_endpoint(instance_id, region, spec)?;
                state
                    .instance_mut(instance_id)?
                    .endpoints
                    .push(endpoint.clone());
                Ok(endpoint)
            })
        })
    }

    fn delete_endpoint<'a>(
        &'a self,
        _region: &'a Region,
        endpoint_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.respond("delete_endpoint", endpoint_id, String::new(), |state| {
                let mut released: Option<(String, Endpoint)> = None;
                for instance in state.instances.values_mut() {
                    if let Some(position) =
                        instance.endpoints.iter().position(|e| e.id == endpoint_id)
                    {
                        let endpoint = instance.endpoints.remove(position);
                        released = Some((instance.id.clone(), endpoint));
                    }
                }
                for replica in state.read_replicas.values_mut() {
                    if let Some(position) =
                        replica.endpoints.iter().position(|e| e.id == endpoint_id)
                    {
                        let endpoint = replica.endpoints.remove(position);
                        released = Some((replica.instance_id.clone(), endpoint));
                    }
                }
                let (owner, endpoint) = released.ok_or_else(|| not_found("endpoint", endpoint_id))?;
                state.release_endpoint(&owner, &endpoint);
                Ok(())
            })
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a CreateSnapshotRequest,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            self.respond("create_snapshot", instance_id, request.name.clone(), |state| {
                let instance = state.require_instance(instance_id)?.clone();
                let now = chrono::Utc::now();
                let snapshot = Snapshot {
                    id: new_id(),
                    instance_id: instance_id.to_owned(),
                    name: request.name.clone(),
                    status: ArtifactStatus::Ready,
                    size: instance.volume.as_ref().map(|volume| volume.size),
                    expires_at: request.expires_at,
                    created_at: Some(now),
                    updated_at: Some(now),
                    instance_name: instance.name.clone(),
                    node_type: instance.node_type.clone(),
                    volume_type: instance.volume.as_ref().map(|volume| SnapshotVolumeType {
                        volume_type: volume.volume_type,
                    }),
                    region: region.clone(),
                };
                state.snapshots.insert(snapshot.id.clone(), snapshot.clone());
                Ok(snapshot)
            })
        })
    }

    fn get_snapshot<'a>(
        &'a self,
        _region: &'a Region,
        snapshot_id: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            self.respond("get_snapshot", snapshot_id, String::new(), |state| {
                state
                    .snapshots
                    .get(snapshot_id)
                    .cloned()
                    .ok_or_else(|| not_found("snapshot", snapshot_id))
            })
        })
    }

    fn list_snapshots<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: Option<&'a str>,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Snapshot>> {
        Box::pin(async move {
            let target = instance_id.unwrap_or_default();
            self.respond("list_snapshots", target, String::new(), |state| {
                Ok(state
                    .snapshots
                    .values()
                    .filter(|snapshot| {
                        instance_id.is_none_or(|wanted| snapshot.instance_id == wanted)
                            && name.is_none_or(|wanted| snapshot.name == wanted)
                    })
                    .cloned()
                    .collect())
            })
        })
    }

    fn update_snapshot<'a>(
        &'a self,
        _region: &'a Region,
        snapshot_id: &'a str,
        request: &'a UpdateSnapshotRequest,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            self.respond("update_snapshot", snapshot_id, render(request), |state| {
                let snapshot = state
                    .snapshots
                    .get_mut(snapshot_id)
                    .ok_or_else(|| not_found("snapshot", snapshot_id))?;
                if let Some(name) = &request.name {
                    snapshot.name.clone_from(name);
                }
                if request.expires_at.is_some() {
                    snapshot.expires_at = request.expires_at;
                }
                snapshot.updated_at = Some(chrono::Utc::now());
                Ok(snapshot.clone())
            })
        })
    }

    fn delete_snapshot<'a>(
        &'a self,
        _region: &'a Region,
        snapshot_id: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            self.respond("delete_snapshot", snapshot_id, String::new(), |state| {
                state
                    .snapshots
                    .remove(snapshot_id)
                    .ok_or_else(|| not_found("snapshot", snapshot_id))
            })
        })
    }

    fn create_database_backup<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            self.respond(
                "create_database_backup",
                &request.instance_id,
                format!("{}:{}", request.database_name, request.name),
                |state| {
                    let instance = state.require_instance(&request.instance_id)?.clone();
                    let now = chrono::Utc::now();
                    let backup = DatabaseBackup {
                        id: new_id(),
                        instance_id: request.instance_id.clone(),
                        database_name: request.database_name.clone(),
                        name: request.name.clone(),
                        status: ArtifactStatus::Ready,
                        size: Some(GB),
                        expires_at: request.expires_at,
                        created_at: Some(now),
                        updated_at: Some(now),
                        instance_name: instance.name,
                        download_url: None,
                        download_url_expires_at: None,
                        region: region.clone(),
                        same_region: instance.backup_same_region,
                    };
                    state.backups.insert(backup.id.clone(), backup.clone());
                    Ok(backup)
                },
            )
        })
    }

    fn get_database_backup<'a>(
        &'a self,
        _region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            self.respond("get_database_backup", backup_id, String::new(), |state| {
                state
                    .backups
                    .get(backup_id)
                    .cloned()
                    .ok_or_else(|| not_found("backup", backup_id))
            })
        })
    }

    fn update_database_backup<'a>(
        &'a self,
        _region: &'a Region,
        backup_id: &'a str,
        request: &'a UpdateDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            self.respond("update_database_backup", backup_id, render(request), |state| {
                let backup = state
                    .backups
                    .get_mut(backup_id)
                    .ok_or_else(|| not_found("backup", backup_id))?;
                if let Some(name) = &request.name {
                    backup.name.clone_from(name);
                }
                if request.expires_at.is_some() {
                    backup.expires_at = request.expires_at;
                }
                backup.updated_at = Some(chrono::Utc::now());
                Ok(backup.clone())
            })
        })
    }

    fn delete_database_backup<'a>(
        &'a self,
        _region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            self.respond("delete_database_backup", backup_id, String::new(), |state| {
                state
                    .backups
                    .remove(backup_id)
                    .ok_or_else(|| not_found("backup", backup_id))
            })
        })
    }

    fn export_database_backup<'a>(
        &'a self,
        _region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            self.respond("export_database_backup", backup_id, String::new(), |state| {
                let backup = state
                    .backups
                    .get_mut(backup_id)
                    .ok_or_else(|| not_found("backup", backup_id))?;
                backup.download_url = Some(format!("https://s3.example.invalid/{backup_id}.dump"));
                backup.download_url_expires_at =
                    Some(chrono::Utc::now() + chrono::Duration::hours(1));
                Ok(backup.clone())
            })
        })
    }

    fn restore_database_backup<'a>(
        &'a self,
        _region: &'a Region,
        backup_id: &'a str,
        request: &'a RestoreDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            self.respond("restore_database_backup", backup_id, render(request), |state| {
                let backup = state
                    .backups
                    .get(backup_id)
                    .cloned()
                    .ok_or_else(|| not_found("backup", backup_id))?;
                state.require_instance(&request.instance_id)?;
                let target = request
                    .database_name
                    .clone()
                    .unwrap_or_else(|| backup.database_name.clone());
                let databases = state
                    .databases
                    .entry(request.instance_id.clone())
                    .or_default();
                if !databases.iter().any(|database| database.name == target) {
                    databases.push(Database {
                        name: target,
                        owner: String::new(),
                        managed: true,
                        size: 0,
                    });
                }
                Ok(backup)
            })
        })
    }

    fn purge_instance_logs<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        request: &'a PurgeInstanceLogsRequest,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.respond("purge_instance_logs", instance_id, render(request), |state| {
                state.require_instance(instance_id).map(|_| ())
            })
        })
    }

    fn prepare_instance_logs<'a>(
        &'a self,
        _region: &'a Region,
        instance_id: &'a str,
        request: &'a PrepareInstanceLogsRequest,
    ) -> ApiFuture<'a, Vec<InstanceLog>> {
        Box::pin(async move {
            self.respond("prepare_instance_logs", instance_id, render(request), |state| {
                state.require_instance(instance_id)?;
                let id = new_id();
                Ok(vec![InstanceLog {
                    download_url: Some(format!("https://s3.example.invalid/{id}.log")),
                    id,
                    status: String::from("ready"),
                    node_name: String::from("node-0"),
                    expires_at: None,
                    created_at: Some(chrono::Utc::now()),
                }])
            })
        })
    }
}

impl IpamApi for FakeScaleway {
    fn list_ips<'a>(&'a self, request: &'a ListIpsRequest) -> ApiFuture<'a, Vec<IpamIp>> {
        Box::pin(async move {
            self.respond("list_ips", &request.resource_id, String::new(), |state| {
                Ok(state
                    .ipam
                    .iter()
                    .filter(|ip| {
                        ip.is_ipv6 == request.is_ipv6
                            && ip.resource.as_ref().is_some_and(|resource| {
                                resource.resource_type == request.resource_type
                                    && resource.id == request.resource_id
                            })
                    })
                    .cloned()
                    .collect())
            })
        })
    }
}

impl JobsApi for FakeScaleway {
    fn start_job_definition<'a>(
        &'a self,
        _region: &'a Region,
        request: &'a StartJobDefinitionRequest,
    ) -> ApiFuture<'a, Vec<JobRun>> {
        Box::pin(async move {
            self.respond(
                "start_job_definition",
                &request.job_definition_id,
                render(request),
                |state| {
                    let count = request.replicas.unwrap_or(1);
                    let mut runs = Vec::new();
                    for _ in 0..count {
                        let run = JobRun {
                            id: new_id(),
                            job_definition_id: request.job_definition_id.clone(),
                            state: String::from("running"),
                            created_at: Some(chrono::Utc::now()),
                        };
                        state.job_runs.insert(run.id.clone(), run.clone());
                        runs.push(run);
                    }
                    Ok(runs)
                },
            )
        })
    }

    fn get_job_run<'a>(&'a self, _region: &'a Region, job_run_id: &'a str) -> ApiFuture<'a, JobRun> {
        Box::pin(async move {
            self.respond("get_job_run", job_run_id, String::new(), |state| {
                let run = state
                    .job_runs
                    .get_mut(job_run_id)
                    .ok_or_else(|| not_found("job run", job_run_id))?;
                run.state = String::from("succeeded");
                Ok(run.clone())
            })
        })
    }
}
