//! Remote API boundary.
//!
//! The managed-database, address-management and jobs services are consumed
//! through the object-safe traits below. [`ScalewayClient`] implements them
//! over HTTPS; tests drive controllers through the in-memory double in
//! [`crate::test_support`].

mod http;
pub mod types;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::locality::Region;
pub use http::ScalewayClient;
use types::{
    AclRule, AclRuleRequest, CreateDatabaseBackupRequest, CreateInstanceFromSnapshotRequest,
    CreateInstanceRequest, CreateReadReplicaRequest, CreateSnapshotRequest, CreateUserRequest,
    Database, DatabaseBackup, Endpoint, EndpointSpec, Instance, InstanceLog, InstanceSetting,
    IpamIp, JobRun, ListIpsRequest, PrepareInstanceLogsRequest, Privilege,
    PurgeInstanceLogsRequest, ReadReplica, RestoreDatabaseBackupRequest, SetPrivilegeRequest,
    Snapshot, StartJobDefinitionRequest, UpdateDatabaseBackupRequest, UpdateInstanceRequest,
    UpdateSnapshotRequest, UpdateUserRequest, UpgradeInstanceRequest, User,
};

/// Errors raised at the remote boundary, classified by HTTP status.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// 404 responses.
    #[error("not found: {0}")]
    NotFound(String),
    /// 409 responses, raised while the owning resource is mutating.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message reported by the remote.
        message: String,
    },
    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Future returned by remote operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Region-scoped operations of the managed relational database service.
pub trait RdbApi: Send + Sync {
    /// Creates an instance.
    fn create_instance<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateInstanceRequest,
    ) -> ApiFuture<'a, Instance>;

    /// Restores a snapshot into a new instance.
    fn create_instance_from_snapshot<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateInstanceFromSnapshotRequest,
    ) -> ApiFuture<'a, Instance>;

    /// Fetches an instance.
    fn get_instance<'a>(&'a self, region: &'a Region, instance_id: &'a str)
    -> ApiFuture<'a, Instance>;

    /// Updates mutable scalar fields of an instance.
    fn update_instance<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a UpdateInstanceRequest,
    ) -> ApiFuture<'a, Instance>;

    /// Applies a single upgrade operation.
    fn upgrade_instance<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a UpgradeInstanceRequest,
    ) -> ApiFuture<'a, Instance>;

    /// Deletes an instance.
    fn delete_instance<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Instance>;

    /// Downloads the TLS certificate of an instance.
    fn get_instance_certificate<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, String>;

    /// Renews the TLS certificate of an instance.
    fn renew_instance_certificate<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, ()>;

    /// Replaces runtime settings.
    fn set_instance_settings<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        settings: &'a [InstanceSetting],
    ) -> ApiFuture<'a, Vec<InstanceSetting>>;

    /// Replaces every ACL rule of an instance.
    fn set_instance_acl_rules<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        rules: &'a [AclRuleRequest],
    ) -> ApiFuture<'a, Vec<AclRule>>;

    /// Lists ACL rules of an instance.
    fn list_instance_acl_rules<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Vec<AclRule>>;

    /// Removes ACL rules by CIDR.
    fn delete_instance_acl_rules<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        ips: &'a [String],
    ) -> ApiFuture<'a, Vec<AclRule>>;

    /// Creates a logical database.
    fn create_database<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, Database>;

    /// Lists logical databases, optionally filtered by exact name.
    fn list_databases<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Database>>;

    /// Drops a logical database.
    fn delete_database<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, ()>;

    /// Creates a database user.
    fn create_user<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a CreateUserRequest,
    ) -> ApiFuture<'a, User>;

    /// Lists users, optionally filtered by exact name.
    fn list_users<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<User>>;

    /// Updates a user's password or admin flag.
    fn update_user<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
        request: &'a UpdateUserRequest,
    ) -> ApiFuture<'a, User>;

    /// Drops a user.
    fn delete_user<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, ()>;

    /// Sets the permission of a user on a database.
    fn set_privilege<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a SetPrivilegeRequest,
    ) -> ApiFuture<'a, Privilege>;

    /// Lists privileges, optionally filtered by database and user.
    fn list_privileges<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        database_name: Option<&'a str>,
        user_name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Privilege>>;

    /// Creates a read replica.
    fn create_read_replica<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateReadReplicaRequest,
    ) -> ApiFuture<'a, ReadReplica>;

    /// Fetches a read replica.
    fn get_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica>;

    /// Deletes a read replica.
    fn delete_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica>;

    /// Resynchronises a read replica from its primary.
    fn reset_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica>;

    /// Promotes a read replica into a standalone instance.
    fn promote_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, Instance>;

    /// Adds endpoints to a read replica.
    fn create_read_replica_endpoint<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
        specs: &'a [EndpointSpec],
    ) -> ApiFuture<'a, ReadReplica>;

    /// Adds an endpoint to an instance.
    fn create_endpoint<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        spec: &'a EndpointSpec,
    ) -> ApiFuture<'a, Endpoint>;

    /// Removes an endpoint from an instance or read replica.
    fn delete_endpoint<'a>(&'a self, region: &'a Region, endpoint_id: &'a str)
    -> ApiFuture<'a, ()>;

    /// Takes a snapshot of an instance.
    fn create_snapshot<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a CreateSnapshotRequest,
    ) -> ApiFuture<'a, Snapshot>;

    /// Fetches a snapshot.
    fn get_snapshot<'a>(&'a self, region: &'a Region, snapshot_id: &'a str)
    -> ApiFuture<'a, Snapshot>;

    /// Lists snapshots, optionally filtered by instance and name.
    fn list_snapshots<'a>(
        &'a self,
        region: &'a Region,
        instance_id: Option<&'a str>,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Snapshot>>;

    /// Updates a snapshot's name or expiration.
    fn update_snapshot<'a>(
        &'a self,
        region: &'a Region,
        snapshot_id: &'a str,
        request: &'a UpdateSnapshotRequest,
    ) -> ApiFuture<'a, Snapshot>;

    /// Deletes a snapshot.
    fn delete_snapshot<'a>(
        &'a self,
        region: &'a Region,
        snapshot_id: &'a str,
    ) -> ApiFuture<'a, Snapshot>;

    /// Dumps one database into a backup.
    fn create_database_backup<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup>;

    /// Fetches a database backup.
    fn get_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup>;

    /// Updates a backup's name or expiration.
    fn update_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
        request: &'a UpdateDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup>;

    /// Deletes a database backup.
    fn delete_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup>;

    /// Produces a download URL for a backup.
    fn export_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup>;

    /// Restores a backup into a database of an instance.
    fn restore_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
        request: &'a RestoreDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup>;

    /// Deletes collected logs of an instance.
    fn purge_instance_logs<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a PurgeInstanceLogsRequest,
    ) -> ApiFuture<'a, ()>;

    /// Prepares downloadable log archives for a time window.
    fn prepare_instance_logs<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a PrepareInstanceLogsRequest,
    ) -> ApiFuture<'a, Vec<InstanceLog>>;
}

/// Address-management operations.
pub trait IpamApi: Send + Sync {
    /// Lists addresses attached to a resource.
    fn list_ips<'a>(&'a self, request: &'a ListIpsRequest) -> ApiFuture<'a, Vec<IpamIp>>;
}

/// Serverless jobs operations used by the start-job action.
pub trait JobsApi: Send + Sync {
    /// Starts runs of a job definition.
    fn start_job_definition<'a>(
        &'a self,
        region: &'a Region,
        request: &'a StartJobDefinitionRequest,
    ) -> ApiFuture<'a, Vec<JobRun>>;

    /// Fetches a job run.
    fn get_job_run<'a>(&'a self, region: &'a Region, job_run_id: &'a str) -> ApiFuture<'a, JobRun>;
}

/// Every remote service the provider drives.
pub trait ScalewayApi: RdbApi + IpamApi + JobsApi {}

impl<T> ScalewayApi for T where T: RdbApi + IpamApi + JobsApi {}
