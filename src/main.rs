//! Binary entry point for the `scaleway-provider` CLI.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use scaleway_provider::action::{
    CreateSnapshot, ExportDatabaseBackup, PrepareInstanceLogs, PromoteReadReplica,
    PurgeInstanceLogs, RenewInstanceCertificate, ResetReadReplica, RestoreDatabaseBackup,
    StartJobDefinition, parse_timestamp,
};
use scaleway_provider::api::ScalewayApi;
use scaleway_provider::config::{ConfigError, ProviderConfig};
use scaleway_provider::error::ProviderError;
use scaleway_provider::provider::Provider;
use scaleway_provider::wait::{Operation, Phase};

mod cli;

use cli::{Cli, Command};

const DEFAULT_LOG_FILTER: &str = "scaleway_provider=info";

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A fully decoded action, ready to run against any client.
#[derive(Debug, PartialEq, Eq)]
enum ActionRequest {
    StartJob(StartJobDefinition),
    SnapshotNow(CreateSnapshot),
    ExportBackup(ExportDatabaseBackup),
    RestoreBackup(RestoreDatabaseBackup),
    PromoteReadReplica(PromoteReadReplica),
    RenewCertificate(RenewInstanceCertificate),
    PurgeLogs(PurgeInstanceLogs),
    PrepareLogs(PrepareInstanceLogs),
    ResetReadReplica(ResetReadReplica),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(rendered) => {
            writeln!(io::stdout(), "{rendered}").ok();
            0
        }
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<String, CliError> {
    let request = build_request(cli)?;
    let config = ProviderConfig::load_without_cli_args()?;
    let provider = Provider::from_config(&config)?;
    let value = execute(&provider, &request).await?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn parse_environment(pairs: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_owned(), value.to_owned()))
            }
            _ => Err(CliError::InvalidArgument(format!(
                "--env expects KEY=VALUE, got '{pair}'"
            ))),
        })
        .collect()
}

fn build_request(cli: Cli) -> Result<ActionRequest, CliError> {
    let Cli {
        no_wait,
        region,
        command,
    } = cli;
    let wait = !no_wait;
    let request = match command {
        Command::StartJob(args) => ActionRequest::StartJob(StartJobDefinition {
            region,
            job_definition_id: args.job_definition_id,
            command: args.command,
            environment_variables: parse_environment(&args.environment)?,
            replicas: args.replicas,
            wait,
        }),
        Command::SnapshotNow(args) => ActionRequest::SnapshotNow(CreateSnapshot {
            region,
            instance_id: args.target.instance_id,
            name: args.name,
            expires_at: parse_timestamp("expires_at", args.expires_at.as_deref())?,
            wait,
        }),
        Command::ExportBackup(args) => ActionRequest::ExportBackup(ExportDatabaseBackup {
            region,
            backup_id: args.backup_id,
            wait,
        }),
        Command::RestoreBackup(args) => ActionRequest::RestoreBackup(RestoreDatabaseBackup {
            region,
            backup_id: args.target.backup_id,
            instance_id: args.instance_id,
            database_name: args.database_name,
            wait,
        }),
        Command::PromoteReadReplica(args) => {
            ActionRequest::PromoteReadReplica(PromoteReadReplica {
                region,
                read_replica_id: args.read_replica_id,
                wait,
            })
        }
        Command::RenewCertificate(args) => {
            ActionRequest::RenewCertificate(RenewInstanceCertificate {
                region,
                instance_id: args.instance_id,
                wait,
            })
        }
        Command::PurgeLogs(args) => ActionRequest::PurgeLogs(PurgeInstanceLogs {
            region,
            instance_id: args.target.instance_id,
            log_name: args.log_name,
            wait,
        }),
        Command::PrepareLogs(args) => ActionRequest::PrepareLogs(PrepareInstanceLogs {
            region,
            instance_id: args.target.instance_id,
            start_date: args.start_date,
            end_date: args.end_date,
            wait,
        }),
        Command::ResetReadReplica(args) => ActionRequest::ResetReadReplica(ResetReadReplica {
            region,
            read_replica_id: args.read_replica_id,
            wait,
        }),
    };
    Ok(request)
}

fn encode(value: &impl Serialize) -> Result<serde_json::Value, CliError> {
    Ok(serde_json::to_value(value)?)
}

async fn execute<C: ScalewayApi>(
    provider: &Provider<C>,
    request: &ActionRequest,
) -> Result<serde_json::Value, CliError> {
    let op = Operation::with_timeout(provider.timeout(Phase::Update));
    match request {
        ActionRequest::StartJob(action) => encode(&provider.start_job_definition(&op, action).await?),
        ActionRequest::SnapshotNow(action) => encode(&provider.snapshot_now(&op, action).await?),
        ActionRequest::ExportBackup(action) => {
            encode(&provider.export_database_backup(&op, action).await?)
        }
        ActionRequest::RestoreBackup(action) => {
            encode(&provider.restore_database_backup(&op, action).await?)
        }
        ActionRequest::PromoteReadReplica(action) => {
            encode(&provider.promote_read_replica(&op, action).await?)
        }
        ActionRequest::RenewCertificate(action) => {
            encode(&provider.renew_instance_certificate(&op, action).await?)
        }
        ActionRequest::PurgeLogs(action) => {
            encode(&provider.purge_instance_logs(&op, action).await?)
        }
        ActionRequest::PrepareLogs(action) => {
            encode(&provider.prepare_instance_logs(&op, action).await?)
        }
        ActionRequest::ResetReadReplica(action) => {
            encode(&provider.reset_read_replica(&op, action).await?)
        }
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
