//! AWS Scanner - Command Line
//!
//! Runs one audit task against every account snapshot given on the command
//! line and prints the reports as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use aws_scanner::tasks::{
    AuditRoute53PublicZonesTask, AuditS3BucketsTask, AuditVpcDnsLogsTask, AuditVpcFlowLogsTask,
};
use aws_scanner::types::Account;
use aws_scanner::{AwsClients, InMemoryAccount, ScannerConfig, TaskReport, TaskRunner, VpcClient};

/// AWS Scanner - audit and enforce account compliance
#[derive(Parser, Debug)]
#[command(name = "aws-scanner", version, about)]
struct Args {
    /// Account state snapshots (JSON), one per account
    #[arg(long = "state", env = "AWS_SCANNER_STATE", required = true, value_delimiter = ',')]
    states: Vec<PathBuf>,

    /// Scanner configuration file (JSON); defaults apply when omitted
    #[arg(long, env = "AWS_SCANNER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the account id recorded in a single state file
    #[arg(long)]
    account_id: Option<String>,

    /// Override the account name recorded in a single state file
    #[arg(long)]
    account_name: Option<String>,

    /// Write the resulting account state back to the state files
    #[arg(long, default_value = "false")]
    write_state: bool,

    /// Debug logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Audit VPC flow logs, delivery role and central log group
    AuditVpcFlowLogs {
        /// Apply the enforcement actions
        #[arg(long, default_value = "false")]
        enforce: bool,

        /// Require the central log group subscription filter
        #[arg(long, default_value = "false")]
        with_subscription_filter: bool,
    },
    /// Audit Route53 query logging of public hosted zones
    AuditVpcDnsLogs {
        #[arg(long, default_value = "false")]
        enforce: bool,

        #[arg(long, default_value = "false")]
        with_subscription_filter: bool,
    },
    /// List public hosted zones and their query log group
    AuditRoute53PublicZones,
    /// Report bucket encryption and access logging
    AuditS3Buckets,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    if args.states.len() > 1 && (args.account_id.is_some() || args.account_name.is_some()) {
        bail!("--account-id and --account-name require a single --state file");
    }

    let config = ScannerConfig::load(args.config.as_deref())
        .context("Failed to load scanner configuration")?;

    let mut accounts = Vec::with_capacity(args.states.len());
    for path in &args.states {
        let backend = InMemoryAccount::load(path)
            .with_context(|| format!("Failed to load account state {}", path.display()))?;
        let account = account_for(&backend, &args)?;
        accounts.push((path, account, Arc::new(backend)));
    }

    info!(accounts = accounts.len(), command = ?args.command, "Starting AWS Scanner");

    let runner = TaskRunner::new(config.tasks.executor);
    let vpc_client = |backend: &Arc<InMemoryAccount>| {
        VpcClient::new(AwsClients::from_backend(backend.clone()), config.clone())
    };

    let reports: Vec<TaskReport> = match args.command {
        Command::AuditVpcFlowLogs {
            enforce,
            with_subscription_filter,
        } => {
            let tasks: Vec<_> = accounts
                .iter()
                .map(|(_, account, backend)| {
                    let task = AuditVpcFlowLogsTask::new(
                        account.clone(),
                        enforce,
                        with_subscription_filter,
                    );
                    (task, vpc_client(backend))
                })
                .collect();
            runner.run(tasks).await
        }
        Command::AuditVpcDnsLogs {
            enforce,
            with_subscription_filter,
        } => {
            let tasks: Vec<_> = accounts
                .iter()
                .map(|(_, account, backend)| {
                    let task =
                        AuditVpcDnsLogsTask::new(account.clone(), enforce, with_subscription_filter);
                    (task, vpc_client(backend))
                })
                .collect();
            runner.run(tasks).await
        }
        Command::AuditRoute53PublicZones => {
            let tasks: Vec<_> = accounts
                .iter()
                .map(|(_, account, backend)| {
                    (
                        AuditRoute53PublicZonesTask::new(account.clone()),
                        AwsClients::from_backend(backend.clone()),
                    )
                })
                .collect();
            runner.run(tasks).await
        }
        Command::AuditS3Buckets => {
            let tasks: Vec<_> = accounts
                .iter()
                .map(|(_, account, backend)| {
                    (
                        AuditS3BucketsTask::new(account.clone()),
                        AwsClients::from_backend(backend.clone()),
                    )
                })
                .collect();
            runner.run(tasks).await
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&reports).context("Failed to serialize reports")?
    );

    for report in reports.iter().filter(|r| !r.is_success()) {
        warn!(account = %report.account, error = ?report.error(), "Task reported an error");
    }

    if args.write_state {
        for (path, _, backend) in &accounts {
            let state = backend.snapshot()?;
            let json = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write account state {}", path.display()))?;
            info!(path = %path.display(), "Account state written");
        }
    }

    Ok(())
}

fn account_for(backend: &InMemoryAccount, args: &Args) -> Result<Account> {
    let mut account = backend.account()?;
    if let Some(id) = &args.account_id {
        account.id = id.clone();
    }
    if let Some(name) = &args.account_name {
        account.name = name.clone();
    }
    Ok(account)
}
