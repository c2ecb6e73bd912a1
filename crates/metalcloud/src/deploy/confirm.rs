//! Confirmation gate for destructive operations.

use std::io;

use dialoguer::Input;
use tracing::debug;

use super::error::DeployError;

/// The only answer that confirms an operation.
const AFFIRMATIVE: &str = "yes";

/// Whether an operator can be asked questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Prompts are shown on the terminal.
    #[default]
    Interactive,
    /// No prompt is ever shown; unconfirmed operations are denied.
    NonInteractive,
}

/// Asks the operator a question and returns the raw answer.
pub trait Prompter {
    /// Show `message` and read one line of input.
    ///
    /// # Errors
    /// Returns an I/O error if the terminal cannot be read.
    fn ask(&self, message: &str) -> io::Result<String>;
}

/// Terminal prompter backed by `dialoguer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn ask(&self, message: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(message.trim_end_matches(':'))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Decides whether a destructive operation may proceed.
#[derive(Debug, Clone)]
pub struct ConfirmationGuard<P> {
    mode: ExecutionMode,
    prompter: P,
}

impl<P: Prompter> ConfirmationGuard<P> {
    /// Create a guard for the given execution mode.
    pub fn new(mode: ExecutionMode, prompter: P) -> Self {
        Self { mode, prompter }
    }

    /// Proceed if `autoconfirm` is set, otherwise require the operator to
    /// type exactly `yes` in answer to `message`.
    ///
    /// # Errors
    /// Returns [`DeployError::NotConfirmed`] if confirmation is not given and
    /// [`DeployError::Prompt`] if the answer cannot be read.
    pub fn check(&self, autoconfirm: bool, message: &str) -> Result<(), DeployError> {
        if autoconfirm {
            return Ok(());
        }

        if self.mode == ExecutionMode::NonInteractive {
            debug!("Non-interactive mode, not prompting for confirmation");
            return Err(DeployError::NotConfirmed);
        }

        let answer = self.prompter.ask(message).map_err(DeployError::Prompt)?;
        if answer.trim_end_matches(['\r', '\n']) == AFFIRMATIVE {
            Ok(())
        } else {
            Err(DeployError::NotConfirmed)
        }
    }
}
