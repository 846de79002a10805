//! HTTPS implementation of the remote API traits.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::types::{
    AclRule, AclRuleRequest, CreateDatabaseBackupRequest, CreateInstanceFromSnapshotRequest,
    CreateInstanceRequest, CreateReadReplicaRequest, CreateSnapshotRequest, CreateUserRequest,
    Database, DatabaseBackup, Endpoint, EndpointSpec, Instance, InstanceLog, InstanceSetting,
    IpamIp, JobRun, ListIpsRequest, PrepareInstanceLogsRequest, Privilege,
    PurgeInstanceLogsRequest, ReadReplica, RestoreDatabaseBackupRequest, SetPrivilegeRequest,
    Snapshot, StartJobDefinitionRequest, UpdateDatabaseBackupRequest, UpdateInstanceRequest,
    UpdateSnapshotRequest, UpdateUserRequest, UpgradeInstanceRequest, User,
};
use super::{ApiError, ApiFuture, IpamApi, JobsApi, RdbApi};
use crate::locality::Region;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 100;

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

type Query = Vec<(&'static str, String)>;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct SettingsResponse {
    settings: Vec<InstanceSetting>,
}

#[derive(Deserialize)]
struct RulesResponse {
    rules: Vec<AclRule>,
}

#[derive(Deserialize)]
struct InstanceLogsResponse {
    instance_logs: Vec<InstanceLog>,
}

#[derive(Deserialize)]
struct JobRunsResponse {
    job_runs: Vec<JobRun>,
}

/// Client for the Scaleway HTTPS APIs.
#[derive(Clone, Debug)]
pub struct ScalewayClient {
    api_url: String,
    secret_key: String,
}

impl ScalewayClient {
    /// Builds a client targeting `api_url` and authenticating with
    /// `secret_key`.
    #[must_use]
    pub fn new(api_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let url: String = api_url.into();
        Self {
            api_url: url.trim_end_matches('/').to_owned(),
            secret_key: secret_key.into(),
        }
    }

    fn rdb(region: &Region, suffix: &str) -> String {
        format!("/rdb/v1/regions/{region}/{suffix}")
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<Value>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = format!("{}{path}", self.api_url);
        let mut request = HTTP_CLIENT
            .request(method, &url)
            .header("X-Auth-Token", &self.secret_key)
            .query(query);
        if let Some(payload) = body {
            request = request.json(&payload);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|parsed| parsed.message)
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
        Err(match status.as_u16() {
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            code => ApiError::Status {
                status: code,
                message,
            },
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let bytes = self.execute(method, path, query, body).await?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn call_unit(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), ApiError> {
        self.execute(method, path, &[], body).await.map(|_| ())
    }

    /// Walks every page of a list endpoint until `total_count` items were
    /// received.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query,
        key: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items: Vec<T> = Vec::new();
        let mut page: u32 = 1;
        loop {
            let mut params = query.clone();
            params.push(("page", page.to_string()));
            params.push(("page_size", PAGE_SIZE.to_string()));
            let mut body: Value = self.call(Method::GET, path, &params, None).await?;

            let total = body.get("total_count").and_then(Value::as_u64).unwrap_or(0);
            let raw = body
                .get_mut(key)
                .map_or_else(|| Value::Array(Vec::new()), Value::take);
            let batch: Vec<T> =
                serde_json::from_value(raw).map_err(|err| ApiError::Decode(err.to_string()))?;
            let received = batch.len();
            items.extend(batch);

            let seen = u64::try_from(items.len()).unwrap_or(u64::MAX);
            if received == 0 || seen >= total {
                return Ok(items);
            }
            page += 1;
        }
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

fn push_optional(query: &mut Query, key: &'static str, value: Option<&str>) {
    if let Some(found) = value {
        query.push((key, found.to_owned()));
    }
}

impl RdbApi for ScalewayClient {
    fn create_instance<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateInstanceRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            let path = Self::rdb(region, "instances");
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn create_instance_from_snapshot<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateInstanceFromSnapshotRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            let path = Self::rdb(
                region,
                &format!("snapshots/{}/create-instance", request.snapshot_id),
            );
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn get_instance<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}"));
            self.call(Method::GET, &path, &[], None).await
        })
    }

    fn update_instance<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a UpdateInstanceRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}"));
            self.call(Method::PATCH, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn upgrade_instance<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a UpgradeInstanceRequest,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/upgrade"));
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn delete_instance<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}"));
            self.call(Method::DELETE, &path, &[], None).await
        })
    }

    fn get_instance_certificate<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/certificate"));
            let bytes = self.execute(Method::GET, &path, &[], None).await?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
    }

    fn renew_instance_certificate<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/renew-certificate"));
            self.call_unit(Method::POST, &path, Some(json!({}))).await
        })
    }

    fn set_instance_settings<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        settings: &'a [InstanceSetting],
    ) -> ApiFuture<'a, Vec<InstanceSetting>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/settings"));
            let body = json!({ "settings": to_body(&settings)? });
            let response: SettingsResponse = self.call(Method::PUT, &path, &[], Some(body)).await?;
            Ok(response.settings)
        })
    }

    fn set_instance_acl_rules<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        rules: &'a [AclRuleRequest],
    ) -> ApiFuture<'a, Vec<AclRule>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/acls"));
            let body = json!({ "rules": to_body(&rules)? });
            let response: RulesResponse = self.call(Method::PUT, &path, &[], Some(body)).await?;
            Ok(response.rules)
        })
    }

    fn list_instance_acl_rules<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Vec<AclRule>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/acls"));
            self.list_all(&path, Vec::new(), "rules").await
        })
    }

    fn delete_instance_acl_rules<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        ips: &'a [String],
    ) -> ApiFuture<'a, Vec<AclRule>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/acls"));
            let body = json!({ "acl_rule_ips": ips });
            let response: RulesResponse = self.call(Method::DELETE, &path, &[], Some(body)).await?;
            Ok(response.rules)
        })
    }

    fn create_database<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, Database> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/databases"));
            self.call(Method::POST, &path, &[], Some(json!({ "name": name })))
                .await
        })
    }

    fn list_databases<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Database>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/databases"));
            let mut query = Query::new();
            push_optional(&mut query, "name", name);
            self.list_all(&path, query, "databases").await
        })
    }

    fn delete_database<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/databases/{name}"));
            self.call_unit(Method::DELETE, &path, None).await
        })
    }

    fn create_user<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a CreateUserRequest,
    ) -> ApiFuture<'a, User> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/users"));
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn list_users<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<User>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/users"));
            let mut query = Query::new();
            push_optional(&mut query, "name", name);
            self.list_all(&path, query, "users").await
        })
    }

    fn update_user<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
        request: &'a UpdateUserRequest,
    ) -> ApiFuture<'a, User> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/users/{name}"));
            self.call(Method::PATCH, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn delete_user<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/users/{name}"));
            self.call_unit(Method::DELETE, &path, None).await
        })
    }

    fn set_privilege<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a SetPrivilegeRequest,
    ) -> ApiFuture<'a, Privilege> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/privileges"));
            self.call(Method::PUT, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn list_privileges<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        database_name: Option<&'a str>,
        user_name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Privilege>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/privileges"));
            let mut query = Query::new();
            push_optional(&mut query, "database_name", database_name);
            push_optional(&mut query, "user_name", user_name);
            self.list_all(&path, query, "privileges").await
        })
    }

    fn create_read_replica<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateReadReplicaRequest,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            let path = Self::rdb(region, "read-replicas");
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn get_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("read-replicas/{read_replica_id}"));
            self.call(Method::GET, &path, &[], None).await
        })
    }

    fn delete_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("read-replicas/{read_replica_id}"));
            self.call(Method::DELETE, &path, &[], None).await
        })
    }

    fn reset_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("read-replicas/{read_replica_id}/reset"));
            self.call(Method::POST, &path, &[], Some(json!({}))).await
        })
    }

    fn promote_read_replica<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
    ) -> ApiFuture<'a, Instance> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("read-replicas/{read_replica_id}/promote"));
            self.call(Method::POST, &path, &[], Some(json!({}))).await
        })
    }

    fn create_read_replica_endpoint<'a>(
        &'a self,
        region: &'a Region,
        read_replica_id: &'a str,
        specs: &'a [EndpointSpec],
    ) -> ApiFuture<'a, ReadReplica> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("read-replicas/{read_replica_id}/endpoints"));
            let body = json!({ "endpoint_spec": to_body(&specs)? });
            self.call(Method::POST, &path, &[], Some(body)).await
        })
    }

    fn create_endpoint<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        spec: &'a EndpointSpec,
    ) -> ApiFuture<'a, Endpoint> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/endpoints"));
            let body = json!({ "endpoint_spec": to_body(spec)? });
            self.call(Method::POST, &path, &[], Some(body)).await
        })
    }

    fn delete_endpoint<'a>(
        &'a self,
        region: &'a Region,
        endpoint_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("endpoints/{endpoint_id}"));
            self.call_unit(Method::DELETE, &path, None).await
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a CreateSnapshotRequest,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/snapshots"));
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn get_snapshot<'a>(
        &'a self,
        region: &'a Region,
        snapshot_id: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("snapshots/{snapshot_id}"));
            self.call(Method::GET, &path, &[], None).await
        })
    }

    fn list_snapshots<'a>(
        &'a self,
        region: &'a Region,
        instance_id: Option<&'a str>,
        name: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Snapshot>> {
        Box::pin(async move {
            let path = Self::rdb(region, "snapshots");
            let mut query = Query::new();
            push_optional(&mut query, "instance_id", instance_id);
            push_optional(&mut query, "name", name);
            self.list_all(&path, query, "snapshots").await
        })
    }

    fn update_snapshot<'a>(
        &'a self,
        region: &'a Region,
        snapshot_id: &'a str,
        request: &'a UpdateSnapshotRequest,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("snapshots/{snapshot_id}"));
            self.call(Method::PATCH, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn delete_snapshot<'a>(
        &'a self,
        region: &'a Region,
        snapshot_id: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("snapshots/{snapshot_id}"));
            self.call(Method::DELETE, &path, &[], None).await
        })
    }

    fn create_database_backup<'a>(
        &'a self,
        region: &'a Region,
        request: &'a CreateDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            let path = Self::rdb(region, "backups");
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn get_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("backups/{backup_id}"));
            self.call(Method::GET, &path, &[], None).await
        })
    }

    fn update_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
        request: &'a UpdateDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("backups/{backup_id}"));
            self.call(Method::PATCH, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn delete_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("backups/{backup_id}"));
            self.call(Method::DELETE, &path, &[], None).await
        })
    }

    fn export_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("backups/{backup_id}/export"));
            self.call(Method::POST, &path, &[], Some(json!({}))).await
        })
    }

    fn restore_database_backup<'a>(
        &'a self,
        region: &'a Region,
        backup_id: &'a str,
        request: &'a RestoreDatabaseBackupRequest,
    ) -> ApiFuture<'a, DatabaseBackup> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("backups/{backup_id}/restore"));
            self.call(Method::POST, &path, &[], Some(to_body(request)?))
                .await
        })
    }

    fn purge_instance_logs<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a PurgeInstanceLogsRequest,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/purge-logs"));
            self.call_unit(Method::POST, &path, Some(to_body(request)?))
                .await
        })
    }

    fn prepare_instance_logs<'a>(
        &'a self,
        region: &'a Region,
        instance_id: &'a str,
        request: &'a PrepareInstanceLogsRequest,
    ) -> ApiFuture<'a, Vec<InstanceLog>> {
        Box::pin(async move {
            let path = Self::rdb(region, &format!("instances/{instance_id}/prepare-logs"));
            let response: InstanceLogsResponse = self
                .call(Method::POST, &path, &[], Some(to_body(request)?))
                .await?;
            Ok(response.instance_logs)
        })
    }
}

impl IpamApi for ScalewayClient {
    fn list_ips<'a>(&'a self, request: &'a ListIpsRequest) -> ApiFuture<'a, Vec<IpamIp>> {
        Box::pin(async move {
            let path = format!("/ipam/v1/regions/{}/ips", request.region);
            let query = vec![
                ("resource_type", request.resource_type.clone()),
                ("resource_id", request.resource_id.clone()),
                ("is_ipv6", request.is_ipv6.to_string()),
            ];
            self.list_all(&path, query, "ips").await
        })
    }
}

impl JobsApi for ScalewayClient {
    fn start_job_definition<'a>(
        &'a self,
        region: &'a Region,
        request: &'a StartJobDefinitionRequest,
    ) -> ApiFuture<'a, Vec<JobRun>> {
        Box::pin(async move {
            let path = format!(
                "/serverless-jobs/v1alpha1/regions/{region}/job-definitions/{}/start",
                request.job_definition_id
            );
            let response: JobRunsResponse = self
                .call(Method::POST, &path, &[], Some(to_body(request)?))
                .await?;
            Ok(response.job_runs)
        })
    }

    fn get_job_run<'a>(&'a self, region: &'a Region, job_run_id: &'a str) -> ApiFuture<'a, JobRun> {
        Box::pin(async move {
            let path = format!("/serverless-jobs/v1alpha1/regions/{region}/job-runs/{job_run_id}");
            self.call(Method::GET, &path, &[], None).await
        })
    }
}
