//! Command-line arguments.
//!
//! All flags are parsed once into immutable structs and converted into
//! the orchestrator's request types here.

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::api::{ApiError, InfrastructureFilter};
use crate::config::ClientConfig;
use crate::deploy::{
    DeployError, DeployRequest, ExecutionMode, PollSettings, ShutdownFlags, ShutdownPolicy,
};

/// MetalCloud CLI - manage bare metal infrastructures.
#[derive(Parser, Debug)]
#[command(name = "metalcloud-cli")]
#[command(about = "Manage MetalCloud infrastructures")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// MetalCloud API endpoint (or set `METALCLOUD_ENDPOINT` env var).
    #[arg(long, env = "METALCLOUD_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// MetalCloud API key (or set `METALCLOUD_API_KEY` env var).
    #[arg(long, env = "METALCLOUD_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Never prompt; operations that need confirmation fail unless
    /// `--autoconfirm` is given.
    #[arg(long, global = true, default_value = "false")]
    pub non_interactive: bool,
}

impl GlobalArgs {
    /// Build the API client configuration.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the endpoint or API key is missing or
    /// invalid.
    pub fn client_config(&self) -> Result<ClientConfig, ApiError> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            ApiError::Config("--endpoint or METALCLOUD_ENDPOINT is required".to_string())
        })?;
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ApiError::Config("--api-key or METALCLOUD_API_KEY is required".to_string())
        })?;

        ClientConfig::new(endpoint, api_key)
    }

    /// Execution mode for the confirmation guard.
    #[must_use]
    pub fn execution_mode(&self, stdin_is_terminal: bool) -> ExecutionMode {
        if self.non_interactive || !stdin_is_terminal {
            ExecutionMode::NonInteractive
        } else {
            ExecutionMode::Interactive
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Infrastructure management.
    #[command(visible_alias = "infra")]
    Infrastructure {
        #[command(subcommand)]
        command: InfrastructureCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum InfrastructureCommand {
    /// List all infrastructures.
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Get infrastructure details.
    #[command(visible_alias = "show")]
    Get(GetArgs),

    /// Create new infrastructure.
    #[command(visible_alias = "new")]
    Create(CreateArgs),

    /// Update infrastructure configuration.
    #[command(visible_alias = "edit")]
    Update(UpdateArgs),

    /// Deploy infrastructure.
    #[command(visible_alias = "apply")]
    Deploy(DeployArgs),

    /// Revert infrastructure changes.
    #[command(visible_alias = "undo")]
    Revert(TargetArgs),

    /// Delete infrastructure.
    #[command(visible_alias = "rm")]
    Delete(TargetArgs),
}

/// Arguments for `infrastructure list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also return ordered (created but not deployed) infrastructures.
    #[arg(long, default_value = "false")]
    pub show_ordered: bool,

    /// Also return deleted infrastructures.
    #[arg(long, default_value = "false")]
    pub show_deleted: bool,
}

impl ListArgs {
    #[must_use]
    pub fn filter(&self) -> InfrastructureFilter {
        InfrastructureFilter {
            show_ordered: self.show_ordered,
            show_deleted: self.show_deleted,
        }
    }
}

/// Arguments for `infrastructure get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Infrastructure ID or label.
    pub infrastructure_id_or_label: String,
}

/// Arguments for `infrastructure create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Site ID.
    pub site_id: u64,

    /// Infrastructure label.
    pub label: String,
}

/// Arguments for `infrastructure update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Infrastructure ID or label.
    pub infrastructure_id_or_label: String,

    /// New label; the current one is kept when omitted.
    pub new_label: Option<String>,

    /// Set of infrastructure custom variables, as a JSON object.
    #[arg(long)]
    pub custom_variables: Option<String>,
}

impl UpdateArgs {
    /// Parsed `--custom-variables`.
    ///
    /// # Errors
    /// Returns [`DeployError::Validation`] unless the value is a JSON object.
    pub fn custom_variables(
        &self,
    ) -> Result<Option<serde_json::Map<String, serde_json::Value>>, DeployError> {
        let Some(raw) = self.custom_variables.as_deref().filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };

        serde_json::from_str(raw).map(Some).map_err(|e| {
            DeployError::Validation(format!("--custom-variables must be a JSON object: {e}"))
        })
    }
}

/// Arguments for commands acting on a single infrastructure.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Infrastructure ID or label.
    pub infrastructure_id_or_label: String,

    /// Assume the operation is confirmed.
    #[arg(long, default_value = "false")]
    pub autoconfirm: bool,
}

/// Arguments for `infrastructure deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Infrastructure ID or label.
    pub infrastructure_id_or_label: String,

    /// Do not fail the deploy if data loss is expected.
    #[arg(long, default_value = "false")]
    pub allow_data_loss: bool,

    /// Attempt a soft (ACPI) power off of all servers before the deploy.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub attempt_soft_shutdown: bool,

    /// Force a hard power off once the soft shutdown timeout expires.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub attempt_hard_shutdown: bool,

    /// Seconds to wait for soft shutdown before forcing hard shutdown.
    #[arg(long, default_value = "180")]
    pub soft_shutdown_timeout: u32,

    /// Force shutdown of all servers, skipping the soft shutdown.
    #[arg(long, default_value = "false")]
    pub force_shutdown: bool,

    /// Assume the operation is confirmed.
    #[arg(long, default_value = "false")]
    pub autoconfirm: bool,

    /// Wait until the deploy reaches a terminal state.
    #[arg(long, default_value = "false")]
    pub block_until_deployed: bool,

    /// Seconds to wait for the deploy when blocking.
    #[arg(long, default_value = "10800")]
    pub block_timeout: u64,

    /// Seconds between status checks when blocking.
    #[arg(long, default_value = "10")]
    pub block_check_interval: u64,
}

impl DeployArgs {
    /// Raw shutdown flags.
    #[must_use]
    pub fn shutdown_flags(&self) -> ShutdownFlags {
        ShutdownFlags {
            attempt_soft_shutdown: self.attempt_soft_shutdown,
            attempt_hard_shutdown: self.attempt_hard_shutdown,
            soft_shutdown_timeout: self.soft_shutdown_timeout,
            force_shutdown: self.force_shutdown,
        }
    }

    /// Resolve the flags into a deploy request.
    #[must_use]
    pub fn request(&self) -> DeployRequest {
        DeployRequest {
            target: self.infrastructure_id_or_label.clone(),
            shutdown: ShutdownPolicy::resolve(self.shutdown_flags()),
            allow_data_loss: self.allow_data_loss,
            confirmed: self.autoconfirm,
        }
    }

    /// Poll settings, if blocking was requested.
    ///
    /// # Errors
    /// Returns [`DeployError::Validation`] if blocking was requested with a
    /// zero timeout or check interval.
    pub fn wait_settings(&self) -> Result<Option<PollSettings>, DeployError> {
        if !self.block_until_deployed {
            return Ok(None);
        }

        Ok(Some(PollSettings::from_secs(
            self.block_check_interval,
            self.block_timeout,
        )?))
    }
}
