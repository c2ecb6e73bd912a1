//! MetalCloud CLI - infrastructure management.

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use metalcloud::cli::{Cli, Commands, InfrastructureCommand};
use metalcloud::deploy::{ConfirmationGuard, DialoguerPrompter};
use metalcloud::{DeployError, MetalCloud, Orchestrator};

/// Exit code used when the operator interrupts the command.
const INTERRUPTED_EXIT_CODE: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tokio::select! {
        result = run(cli) => match result {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{output}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e:#}");
                let code = e.downcast_ref::<DeployError>().map_or(1, DeployError::exit_code);
                ExitCode::from(code)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; a deploy already dispatched keeps running remotely");
            ExitCode::from(INTERRUPTED_EXIT_CODE)
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let config = cli
        .global
        .client_config()
        .context("Failed to configure MetalCloud client")?;
    let api = MetalCloud::new(&config).context("Failed to create MetalCloud client")?;

    let mode = cli.global.execution_mode(std::io::stdin().is_terminal());
    let orchestrator = Orchestrator::new(api, ConfirmationGuard::new(mode, DialoguerPrompter));

    let output = match cli.command {
        Commands::Infrastructure { command } => match command {
            InfrastructureCommand::List(args) => orchestrator.list(args.filter()).await?,
            InfrastructureCommand::Get(args) => {
                orchestrator.get(&args.infrastructure_id_or_label).await?
            }
            InfrastructureCommand::Create(args) => {
                orchestrator.create(args.site_id, &args.label).await?
            }
            InfrastructureCommand::Update(args) => {
                let custom_variables = args.custom_variables()?;
                orchestrator
                    .update(
                        &args.infrastructure_id_or_label,
                        args.new_label.as_deref(),
                        custom_variables,
                    )
                    .await?
            }
            InfrastructureCommand::Deploy(args) => {
                let wait = args.wait_settings()?;
                let request = args.request();
                info!(
                    infrastructure = %request.target,
                    blocking = wait.is_some(),
                    "Deploying infrastructure"
                );
                orchestrator.deploy(&request, wait).await?
            }
            InfrastructureCommand::Revert(args) => {
                orchestrator
                    .revert(&args.infrastructure_id_or_label, args.autoconfirm)
                    .await?
            }
            InfrastructureCommand::Delete(args) => {
                orchestrator
                    .delete(&args.infrastructure_id_or_label, args.autoconfirm)
                    .await?
            }
        },
    };

    Ok(output)
}
