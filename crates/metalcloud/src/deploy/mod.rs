//! Deploy orchestration: shutdown policy resolution, confirmation gating,
//! dispatch and the blocking wait for a terminal deploy status.

mod confirm;
mod error;
mod orchestrator;
pub mod poller;
mod request;
mod shutdown;

pub use confirm::{ConfirmationGuard, DialoguerPrompter, ExecutionMode, Prompter};
pub use error::DeployError;
pub use orchestrator::{DeployOutcome, Orchestrator};
pub use poller::{PollSettings, PollSettingsError};
pub use request::DeployRequest;
pub use shutdown::{ShutdownFlags, ShutdownPolicy};
