//! Command-line interface definitions for the `scaleway-provider` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page. It
//! must not depend on the library crate.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `scaleway-provider` binary.
#[derive(Debug, Parser)]
#[command(
    name = "scaleway-provider",
    about = "Run one-shot actions against Scaleway managed databases",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Return as soon as the remote accepts the call instead of waiting for
    /// the affected entity to settle.
    #[arg(long, global = true)]
    pub(crate) no_wait: bool,
    /// Region to act in. Defaults to the locality prefix of the target
    /// identifier, then to the configured default region.
    #[arg(long, global = true, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Action to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Available actions.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Start runs of a serverless job definition.
    #[command(name = "start-job")]
    StartJob(StartJobCommand),
    /// Take an on-demand snapshot of an instance.
    #[command(name = "snapshot-now")]
    SnapshotNow(SnapshotNowCommand),
    /// Produce a download URL for a database backup.
    #[command(name = "export-backup")]
    ExportBackup(BackupTarget),
    /// Restore a database backup into an instance.
    #[command(name = "restore-backup")]
    RestoreBackup(RestoreBackupCommand),
    /// Promote a read replica into a standalone instance.
    #[command(name = "promote-read-replica")]
    PromoteReadReplica(ReadReplicaTarget),
    /// Renew the TLS certificate of an instance.
    #[command(name = "renew-certificate")]
    RenewCertificate(InstanceTarget),
    /// Delete collected logs of an instance.
    #[command(name = "purge-logs")]
    PurgeLogs(PurgeLogsCommand),
    /// Prepare downloadable log archives for a time window.
    #[command(name = "prepare-logs")]
    PrepareLogs(PrepareLogsCommand),
    /// Resynchronise a read replica from its primary.
    #[command(name = "reset-read-replica")]
    ResetReadReplica(ReadReplicaTarget),
}

/// Arguments naming one instance.
#[derive(Debug, Args)]
pub(crate) struct InstanceTarget {
    /// Instance identifier, bare or `<region>/<uuid>`.
    #[arg(value_name = "INSTANCE_ID")]
    pub(crate) instance_id: String,
}

/// Arguments naming one read replica.
#[derive(Debug, Args)]
pub(crate) struct ReadReplicaTarget {
    /// Read replica identifier, bare or `<region>/<uuid>`.
    #[arg(value_name = "READ_REPLICA_ID")]
    pub(crate) read_replica_id: String,
}

/// Arguments naming one database backup.
#[derive(Debug, Args)]
pub(crate) struct BackupTarget {
    /// Backup identifier, bare or `<region>/<uuid>`.
    #[arg(value_name = "BACKUP_ID")]
    pub(crate) backup_id: String,
}

/// Arguments for `start-job`.
#[derive(Debug, Args)]
pub(crate) struct StartJobCommand {
    /// Job definition identifier, bare or `<region>/<uuid>`.
    #[arg(value_name = "JOB_DEFINITION_ID")]
    pub(crate) job_definition_id: String,
    /// Command overriding the definition's default.
    #[arg(long, value_name = "COMMAND")]
    pub(crate) command: Option<String>,
    /// Extra environment variable, repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub(crate) environment: Vec<String>,
    /// Number of runs to start.
    #[arg(long, value_name = "COUNT")]
    pub(crate) replicas: Option<u32>,
}

/// Arguments for `snapshot-now`.
#[derive(Debug, Args)]
pub(crate) struct SnapshotNowCommand {
    #[command(flatten)]
    pub(crate) target: InstanceTarget,
    /// Snapshot name.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
    /// Expiration date, RFC 3339.
    #[arg(long, value_name = "TIMESTAMP")]
    pub(crate) expires_at: Option<String>,
}

/// Arguments for `restore-backup`.
#[derive(Debug, Args)]
pub(crate) struct RestoreBackupCommand {
    #[command(flatten)]
    pub(crate) target: BackupTarget,
    /// Instance receiving the restored database.
    #[arg(long, value_name = "INSTANCE_ID")]
    pub(crate) instance_id: String,
    /// Database to restore into; defaults to the dumped one.
    #[arg(long, value_name = "NAME")]
    pub(crate) database_name: Option<String>,
}

/// Arguments for `purge-logs`.
#[derive(Debug, Args)]
pub(crate) struct PurgeLogsCommand {
    #[command(flatten)]
    pub(crate) target: InstanceTarget,
    /// Restrict the purge to one log file.
    #[arg(long, value_name = "NAME")]
    pub(crate) log_name: Option<String>,
}

/// Arguments for `prepare-logs`.
#[derive(Debug, Args)]
pub(crate) struct PrepareLogsCommand {
    #[command(flatten)]
    pub(crate) target: InstanceTarget,
    /// Window start, RFC 3339.
    #[arg(long, value_name = "TIMESTAMP")]
    pub(crate) start_date: Option<String>,
    /// Window end, RFC 3339.
    #[arg(long, value_name = "TIMESTAMP")]
    pub(crate) end_date: Option<String>,
}
