//! MetalCloud infrastructure CLI.
//!
//! This crate drives the infrastructure verbs of a MetalCloud deployment:
//! list, get, create, update, deploy, revert and delete. Deploys can
//! optionally block until the remote workflow reaches a terminal state.
//!
//! # Example
//!
//! ```rust,ignore
//! use metalcloud::api::MetalCloud;
//! use metalcloud::config::ClientConfig;
//! use metalcloud::deploy::{
//!     ConfirmationGuard, DeployRequest, DialoguerPrompter, ExecutionMode, Orchestrator,
//!     PollSettings, ShutdownFlags, ShutdownPolicy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new("https://metalcloud.example.com", "1:secret")?;
//!     let api = MetalCloud::new(&config)?;
//!     let guard = ConfirmationGuard::new(ExecutionMode::Interactive, DialoguerPrompter);
//!     let orchestrator = Orchestrator::new(api, guard);
//!
//!     let request = DeployRequest {
//!         target: "my-infra".into(),
//!         shutdown: ShutdownPolicy::resolve(ShutdownFlags::default()),
//!         allow_data_loss: false,
//!         confirmed: true,
//!     };
//!     let wait = PollSettings::from_secs(10, 3600)?;
//!
//!     orchestrator.deploy(&request, Some(wait)).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cli;
pub mod config;
pub mod deploy;

pub use api::{
    ApiError, DeployStatus, Infrastructure, InfrastructureApi, InfrastructureFilter, MetalCloud,
};
pub use config::ClientConfig;
pub use deploy::{DeployError, DeployOutcome, DeployRequest, Orchestrator, ShutdownPolicy};
