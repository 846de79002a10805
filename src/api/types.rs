//! Wire types exchanged with the remote services.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locality::{Region, Zone};

/// Lifecycle status of a database instance.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Idle and serving.
    Ready,
    /// Being provisioned.
    Provisioning,
    /// Applying a configuration change.
    Configuring,
    /// Being deleted.
    Deleting,
    /// Failed.
    Error,
    /// Recovering a failed node.
    Autohealing,
    /// Locked by the operator.
    Locked,
    /// First boot.
    Initializing,
    /// Volume full; writes refused.
    DiskFull,
    /// Taking a backup.
    Backuping,
    /// Taking a snapshot.
    Snapshotting,
    /// Restarting.
    Restarting,
    /// Status not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// Returns true when no background operation is in flight.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::DiskFull | Self::Error)
    }
}

/// Lifecycle status of a read replica.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadReplicaStatus {
    /// Being provisioned.
    Provisioning,
    /// Synchronising.
    Initializing,
    /// Serving.
    Ready,
    /// Being deleted.
    Deleting,
    /// Failed.
    Error,
    /// Locked by the operator.
    Locked,
    /// Applying a configuration change.
    Configuring,
    /// Being promoted.
    Promoting,
    /// Status not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ReadReplicaStatus {
    /// Returns true when no background operation is in flight.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error | Self::Locked)
    }
}

/// Lifecycle status of snapshots and database backups.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Being created.
    Creating,
    /// Available.
    Ready,
    /// Being restored.
    Restoring,
    /// Being deleted.
    Deleting,
    /// Failed.
    Error,
    /// Being exported.
    Exporting,
    /// Locked by the operator.
    Locked,
    /// Status not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ArtifactStatus {
    /// Returns true when no background operation is in flight.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error | Self::Locked)
    }
}

/// Storage backing an instance volume.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum VolumeType {
    /// Local SSD attached to the node.
    #[default]
    #[serde(rename = "lssd")]
    Lssd,
    /// Legacy block SSD.
    #[serde(rename = "bssd")]
    Bssd,
    /// Block storage, 5k IOPS.
    #[serde(rename = "sbs_5k")]
    Sbs5k,
    /// Block storage, 15k IOPS.
    #[serde(rename = "sbs_15k")]
    Sbs15k,
}

impl VolumeType {
    /// Returns true for node-local storage.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Lssd)
    }

    /// Returns true for network block storage.
    #[must_use]
    pub const fn is_block(self) -> bool {
        !self.is_local()
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lssd => "lssd",
            Self::Bssd => "bssd",
            Self::Sbs5k => "sbs_5k",
            Self::Sbs15k => "sbs_15k",
        }
    }

    /// Parses the wire name.
    #[must_use]
    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "lssd" => Some(Self::Lssd),
            "bssd" => Some(Self::Bssd),
            "sbs_5k" => Some(Self::Sbs5k),
            "sbs_15k" => Some(Self::Sbs15k),
            _ => None,
        }
    }
}

/// Volume attached to an instance; size in bytes.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Volume {
    /// Storage kind.
    #[serde(rename = "type")]
    pub volume_type: VolumeType,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// A `name = value` engine setting.
#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct InstanceSetting {
    /// Setting name.
    pub name: String,
    /// Setting value.
    pub value: String,
}

impl InstanceSetting {
    /// Converts a declared map into the wire list.
    #[must_use]
    pub fn from_map(settings: &BTreeMap<String, String>) -> Vec<Self> {
        settings
            .iter()
            .map(|(name, value)| Self {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Converts the wire list into a map.
    #[must_use]
    pub fn to_map(settings: &[Self]) -> BTreeMap<String, String> {
        settings
            .iter()
            .map(|setting| (setting.name.clone(), setting.value.clone()))
            .collect()
    }
}

/// Automatic backup schedule.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BackupSchedule {
    /// Hours between backups.
    #[serde(default)]
    pub frequency: u32,
    /// Days a backup is retained.
    #[serde(default)]
    pub retention: u32,
    /// Whether automatic backups are disabled.
    #[serde(default)]
    pub disabled: bool,
    /// Next scheduled run.
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
}

/// Log retention policy.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LogsPolicy {
    /// Days logs are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_retention: Option<u32>,
    /// Bytes of logs kept before rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_disk_retention: Option<u64>,
}

/// Encryption-at-rest flag.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EncryptionAtRest {
    /// Whether encryption is enabled.
    #[serde(default)]
    pub enabled: bool,
}

/// Engine version an instance may upgrade to.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct UpgradableVersion {
    /// Version identifier.
    pub id: String,
    /// Engine name.
    #[serde(default)]
    pub name: String,
    /// Full version string.
    #[serde(default)]
    pub version: String,
    /// Minor version string.
    #[serde(default)]
    pub minor_version: String,
}

/// Private-network attachment of an observed endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrivateNetworkDetails {
    /// Bare private network identifier.
    pub private_network_id: String,
    /// Service address in CIDR notation.
    pub service_ip: String,
    /// Zone of the private network attachment.
    pub zone: Zone,
}

/// Reachability surface of an observed endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EndpointKind {
    /// Public load balancer.
    LoadBalancer,
    /// Private network attachment.
    PrivateNetwork(PrivateNetworkDetails),
    /// Direct public access (read replicas).
    DirectAccess,
    /// Shape not recognised.
    Unknown,
}

/// An observed endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "RawEndpoint", into = "RawEndpoint")]
pub struct Endpoint {
    /// Endpoint identifier.
    pub id: String,
    /// IPv4 address, when assigned.
    pub ip: Option<String>,
    /// TCP port.
    pub port: u16,
    /// Display name.
    pub name: Option<String>,
    /// DNS name, when assigned.
    pub hostname: Option<String>,
    /// Which surface the endpoint exposes.
    pub kind: EndpointKind,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct EmptyDetails {}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct RawEndpoint {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    #[serde(default)]
    port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_network: Option<PrivateNetworkDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    load_balancer: Option<EmptyDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direct_access: Option<EmptyDetails>,
}

impl From<RawEndpoint> for Endpoint {
    fn from(raw: RawEndpoint) -> Self {
        let kind = if let Some(details) = raw.private_network {
            EndpointKind::PrivateNetwork(details)
        } else if raw.load_balancer.is_some() {
            EndpointKind::LoadBalancer
        } else if raw.direct_access.is_some() {
            EndpointKind::DirectAccess
        } else {
            EndpointKind::Unknown
        };
        Self {
            id: raw.id,
            ip: raw.ip,
            port: raw.port,
            name: raw.name,
            hostname: raw.hostname,
            kind,
        }
    }
}

impl From<Endpoint> for RawEndpoint {
    fn from(endpoint: Endpoint) -> Self {
        let mut raw = Self {
            id: endpoint.id,
            ip: endpoint.ip,
            port: endpoint.port,
            name: endpoint.name,
            hostname: endpoint.hostname,
            ..Self::default()
        };
        match endpoint.kind {
            EndpointKind::LoadBalancer => raw.load_balancer = Some(EmptyDetails {}),
            EndpointKind::PrivateNetwork(details) => raw.private_network = Some(details),
            EndpointKind::DirectAccess => raw.direct_access = Some(EmptyDetails {}),
            EndpointKind::Unknown => {}
        }
        raw
    }
}

/// Marker for IPAM-provisioned private network endpoints.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IpamConfig {}

/// Private-network part of an endpoint specification.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrivateNetworkSpec {
    /// Bare private network identifier.
    pub private_network_id: String,
    /// Static service address in CIDR notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ip: Option<String>,
    /// Present when the address is allocated by IPAM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipam_config: Option<IpamConfig>,
}

/// Endpoint to create on an instance or read replica.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSpec {
    /// Public load balancer.
    LoadBalancer {},
    /// Private network attachment.
    PrivateNetwork(PrivateNetworkSpec),
    /// Direct public access (read replicas only).
    DirectAccess {},
}

/// Read replica summary embedded in an instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadReplicaRef {
    /// Replica identifier.
    pub id: String,
}

/// A managed database instance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Instance {
    /// Instance identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Region of the instance.
    pub region: Region,
    /// Owning organisation.
    #[serde(default)]
    pub organization_id: String,
    /// Owning project.
    #[serde(default)]
    pub project_id: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: InstanceStatus,
    /// Engine and major version (for example `PostgreSQL-15`).
    pub engine: String,
    /// Versions the instance may upgrade to.
    #[serde(default)]
    pub upgradable_version: Vec<UpgradableVersion>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Runtime settings.
    #[serde(default)]
    pub settings: Vec<InstanceSetting>,
    /// Settings applied at creation only.
    #[serde(default)]
    pub init_settings: Vec<InstanceSetting>,
    /// Automatic backup schedule.
    #[serde(default)]
    pub backup_schedule: Option<BackupSchedule>,
    /// High-availability flag.
    #[serde(default)]
    pub is_ha_cluster: bool,
    /// Attached read replicas.
    #[serde(default)]
    pub read_replicas: Vec<ReadReplicaRef>,
    /// Commercial node type.
    pub node_type: String,
    /// Attached volume.
    #[serde(default)]
    pub volume: Option<Volume>,
    /// Reachability surfaces.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Log retention.
    #[serde(default)]
    pub logs_policy: Option<LogsPolicy>,
    /// Whether backups stay in the instance region.
    #[serde(default)]
    pub backup_same_region: bool,
    /// Encryption at rest.
    #[serde(default)]
    pub encryption: Option<EncryptionAtRest>,
}

/// A read replica.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadReplica {
    /// Replica identifier.
    pub id: String,
    /// Reachability surfaces.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ReadReplicaStatus,
    /// Region of the replica.
    pub region: Region,
    /// Whether the replica lives in the primary's zone.
    #[serde(default)]
    pub same_zone: bool,
    /// Primary instance.
    #[serde(default)]
    pub instance_id: String,
}

/// Access-control rule.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AclRule {
    /// Allowed range in CIDR notation.
    pub ip: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Port the rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Transport protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Traffic direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Rule action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// ACL rule submitted on replacement.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AclRuleRequest {
    /// Allowed range in CIDR notation.
    pub ip: String,
    /// Free-form description.
    pub description: String,
}

/// A logical database.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Database {
    /// Database name.
    pub name: String,
    /// Owning user.
    #[serde(default)]
    pub owner: String,
    /// Whether the database is managed by the service.
    #[serde(default)]
    pub managed: bool,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// A database user.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    /// User name.
    pub name: String,
    /// Whether the user is an administrator.
    #[serde(default)]
    pub is_admin: bool,
}

/// Access level of a user on a database.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// No access.
    #[default]
    None,
    /// Read-only access.
    Readonly,
    /// Read and write access.
    Readwrite,
    /// Full access.
    All,
    /// Custom grants made outside the service.
    Custom,
}

impl Permission {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Readonly => "readonly",
            Self::Readwrite => "readwrite",
            Self::All => "all",
            Self::Custom => "custom",
        }
    }

    /// Parses the wire name.
    #[must_use]
    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "readonly" => Some(Self::Readonly),
            "readwrite" => Some(Self::Readwrite),
            "all" => Some(Self::All),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A `(database, user, permission)` triple.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Privilege {
    /// Granted permission.
    pub permission: Permission,
    /// Database name.
    pub database_name: String,
    /// User name.
    pub user_name: String,
}

/// Volume type captured by a snapshot.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SnapshotVolumeType {
    /// Storage kind.
    #[serde(rename = "type")]
    pub volume_type: VolumeType,
}

/// Block-level snapshot of an instance volume.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    /// Snapshot identifier.
    pub id: String,
    /// Source instance.
    pub instance_id: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ArtifactStatus,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Expiration date.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation date.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update date.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Source instance name.
    #[serde(default)]
    pub instance_name: String,
    /// Node type of the source instance at capture time.
    #[serde(default)]
    pub node_type: String,
    /// Volume type of the source instance at capture time.
    #[serde(default)]
    pub volume_type: Option<SnapshotVolumeType>,
    /// Region of the snapshot.
    pub region: Region,
}

/// Logical dump of one database.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DatabaseBackup {
    /// Backup identifier.
    pub id: String,
    /// Source instance.
    pub instance_id: String,
    /// Source database.
    pub database_name: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ArtifactStatus,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Expiration date.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation date.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update date.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Source instance name.
    #[serde(default)]
    pub instance_name: String,
    /// Download URL produced by an export.
    #[serde(default)]
    pub download_url: Option<String>,
    /// Expiration of the download URL.
    #[serde(default)]
    pub download_url_expires_at: Option<DateTime<Utc>>,
    /// Region of the backup.
    pub region: Region,
    /// Whether the backup is stored in the instance region.
    #[serde(default)]
    pub same_region: bool,
}

/// Downloadable log archive.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceLog {
    /// Log archive identifier.
    pub id: String,
    /// Download URL once ready.
    #[serde(default)]
    pub download_url: Option<String>,
    /// Archive status (`ready`, `creating`, `error`).
    #[serde(default)]
    pub status: String,
    /// Node the logs come from.
    #[serde(default)]
    pub node_name: String,
    /// Expiration of the archive.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation date.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload of `CreateInstance`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateInstanceRequest {
    /// Project owning the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Engine and major version.
    pub engine: String,
    /// Initial admin user.
    pub user_name: String,
    /// Initial admin password.
    pub password: String,
    /// Commercial node type.
    pub node_type: String,
    /// High-availability flag.
    pub is_ha_cluster: bool,
    /// Disables automatic backups.
    pub disable_backup: bool,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Settings applied at creation.
    pub init_settings: Vec<InstanceSetting>,
    /// Storage kind.
    pub volume_type: VolumeType,
    /// Volume size in bytes; absent for local storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<u64>,
    /// Endpoints created with the instance.
    pub init_endpoints: Vec<EndpointSpec>,
    /// Keeps backups in the instance region.
    pub backup_same_region: bool,
    /// Encryption at rest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionAtRest>,
}

/// Payload of `CreateInstanceFromSnapshot`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateInstanceFromSnapshotRequest {
    /// Snapshot to restore.
    #[serde(skip)]
    pub snapshot_id: String,
    /// Name of the new instance.
    pub instance_name: String,
    /// High-availability flag.
    pub is_ha_cluster: bool,
    /// Commercial node type.
    pub node_type: String,
}

/// Payload of `UpdateInstance`; absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct UpdateInstanceRequest {
    /// Hours between backups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_schedule_frequency: Option<u32>,
    /// Days a backup is retained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_schedule_retention: Option<u32>,
    /// Disables automatic backups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_backup_schedule_disabled: Option<bool>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Log retention.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_policy: Option<LogsPolicy>,
    /// Keeps backups in the instance region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_same_region: Option<bool>,
}

impl UpdateInstanceRequest {
    /// Returns true when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Payload of `UpgradeInstance`; exactly one operation per call.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeInstanceRequest {
    /// Change the commercial node type.
    NodeType(String),
    /// Enable or disable high availability.
    EnableHa(bool),
    /// Grow the volume; size in bytes.
    VolumeSize(u64),
    /// Change the storage kind.
    VolumeType(VolumeType),
    /// Enable encryption at rest.
    EnableEncryption(bool),
}

/// Payload of `CreateUser`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateUserRequest {
    /// User name.
    pub name: String,
    /// Password.
    pub password: String,
    /// Administrator flag.
    pub is_admin: bool,
}

/// Payload of `UpdateUser`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct UpdateUserRequest {
    /// New password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New administrator flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Payload of `SetPrivilege`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SetPrivilegeRequest {
    /// Database name.
    pub database_name: String,
    /// User name.
    pub user_name: String,
    /// Permission to grant.
    pub permission: Permission,
}

/// Payload of `CreateReadReplica`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateReadReplicaRequest {
    /// Primary instance.
    pub instance_id: String,
    /// Endpoints created with the replica.
    pub endpoint_spec: Vec<EndpointSpec>,
    /// Whether the replica lives in the primary's zone.
    pub same_zone: bool,
}

/// Payload of `CreateSnapshot`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateSnapshotRequest {
    /// Display name.
    pub name: String,
    /// Expiration date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Payload of `UpdateSnapshot`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct UpdateSnapshotRequest {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiration date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Payload of `CreateDatabaseBackup`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateDatabaseBackupRequest {
    /// Source instance.
    pub instance_id: String,
    /// Source database.
    pub database_name: String,
    /// Display name.
    pub name: String,
    /// Expiration date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Payload of `UpdateDatabaseBackup`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct UpdateDatabaseBackupRequest {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiration date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Payload of `RestoreDatabaseBackup`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RestoreDatabaseBackupRequest {
    /// Target database; defaults to the source database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    /// Target instance.
    pub instance_id: String,
}

/// Payload of `PurgeInstanceLogs`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PurgeInstanceLogsRequest {
    /// Restricts the purge to one log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_name: Option<String>,
}

/// Payload of `PrepareInstanceLogs`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrepareInstanceLogsRequest {
    /// Start of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Address-management resource descriptor.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IpamResource {
    /// Resource type (for example `rdb_instance`).
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource identifier.
    pub id: String,
}

/// Address allocated by the address-management service.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IpamIp {
    /// Allocation identifier.
    pub id: String,
    /// Address in CIDR notation.
    pub address: String,
    /// Resource holding the address.
    #[serde(default)]
    pub resource: Option<IpamResource>,
    /// Whether the address is IPv6.
    #[serde(default)]
    pub is_ipv6: bool,
}

/// Query of `ListIPs`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListIpsRequest {
    /// Region to search.
    pub region: Region,
    /// Resource type filter.
    pub resource_type: String,
    /// Resource identifier filter.
    pub resource_id: String,
    /// Address family filter.
    pub is_ipv6: bool,
}

/// Payload of `StartJobDefinition`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StartJobDefinitionRequest {
    /// Job definition to start.
    #[serde(skip)]
    pub job_definition_id: String,
    /// Command override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Extra environment variables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,
    /// Number of runs to start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
}

/// One run of a job definition.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct JobRun {
    /// Run identifier.
    pub id: String,
    /// Definition the run belongs to.
    #[serde(default)]
    pub job_definition_id: String,
    /// Run state (`queued`, `running`, `succeeded`, ...).
    #[serde(default)]
    pub state: String,
    /// Creation date.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl JobRun {
    /// Returns true when the run has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state.as_str(),
            "succeeded" | "failed" | "canceled" | "interrupted"
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("\"ready\"", InstanceStatus::Ready)]
    #[case("\"disk_full\"", InstanceStatus::DiskFull)]
    #[case("\"hibernating\"", InstanceStatus::Unknown)]
    fn instance_status_tolerates_new_values(#[case] raw: &str, #[case] expected: InstanceStatus) {
        let status: InstanceStatus =
            serde_json::from_str(raw).unwrap_or_else(|err| panic!("decode {raw}: {err}"));
        assert_eq!(status, expected);
    }

    #[test]
    fn replica_and_artifact_statuses_fall_back_to_unknown() {
        let replica: ReadReplicaStatus = serde_json::from_str("\"resyncing\"")
            .unwrap_or_else(|err| panic!("decode replica status: {err}"));
        let artifact: ArtifactStatus = serde_json::from_str("\"archiving\"")
            .unwrap_or_else(|err| panic!("decode artifact status: {err}"));
        assert_eq!(replica, ReadReplicaStatus::Unknown);
        assert_eq!(artifact, ArtifactStatus::Unknown);
        assert_eq!(InstanceStatus::default(), InstanceStatus::Unknown);
    }
}
