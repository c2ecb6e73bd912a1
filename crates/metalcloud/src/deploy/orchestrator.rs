//! Infrastructure deploy, revert and delete flows.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::confirm::{ConfirmationGuard, Prompter};
use super::error::DeployError;
use super::poller::{poll_until, PollOutcome, PollSettings, PollStatus};
use super::request::DeployRequest;
use crate::api::{
    ApiError, Infrastructure, InfrastructureApi, InfrastructureFilter, InfrastructureUpdate,
};

/// Terminal result of waiting for a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The deploy finished.
    Succeeded,
    /// The remote API reported a failure.
    Failed(String),
    /// Waiting gave up; the deploy may still be running.
    TimedOut {
        /// Number of status checks performed.
        attempts: u32,
    },
}

/// Runs infrastructure operations against the remote API.
pub struct Orchestrator<A, P> {
    api: A,
    guard: ConfirmationGuard<P>,
}

impl<A: InfrastructureApi, P: Prompter> Orchestrator<A, P> {
    /// Create an orchestrator.
    pub fn new(api: A, guard: ConfirmationGuard<P>) -> Self {
        Self { api, guard }
    }

    /// Find an infrastructure whose label or numeric ID equals `id_or_label`.
    ///
    /// # Errors
    /// Returns [`DeployError::Validation`] if the argument is empty or
    /// nothing matches, and [`DeployError::Transport`] if the lookup fails.
    pub async fn resolve(&self, id_or_label: &str) -> Result<Infrastructure, DeployError> {
        if id_or_label.trim().is_empty() {
            return Err(DeployError::Validation(
                "infrastructure_id_or_label is required".to_string(),
            ));
        }

        let candidates = self.api.search_infrastructures(id_or_label).await?;
        candidates
            .into_iter()
            .find(|infra| infra.label == id_or_label || infra.id.to_string() == id_or_label)
            .ok_or_else(|| {
                DeployError::Validation(format!("infrastructure '{id_or_label}' not found"))
            })
    }

    /// Deploy an infrastructure, optionally waiting for it to finish.
    ///
    /// Returns the command output, which is empty on success.
    ///
    /// # Errors
    /// Returns [`DeployError::NotConfirmed`] before any mutation if the
    /// guard denies the operation, [`DeployError::DeployFailed`] or
    /// [`DeployError::DeployTimeout`] from the wait, and
    /// [`DeployError::Transport`] for API failures.
    pub async fn deploy(
        &self,
        request: &DeployRequest,
        wait: Option<PollSettings>,
    ) -> Result<String, DeployError> {
        let infrastructure = self.resolve(&request.target).await?;

        self.guard.check(
            request.confirmed,
            &format!(
                "Deploying infrastructure {} ({}). Are you sure? Type \"yes\" to continue:",
                infrastructure.label, infrastructure.id
            ),
        )?;

        self.api
            .deploy(infrastructure.id, request.shutdown, request.allow_data_loss)
            .await?;

        let Some(settings) = wait else {
            info!(infrastructure_id = infrastructure.id, "Deploy started");
            return Ok(String::new());
        };

        match self.wait_until_deployed(infrastructure.id, settings).await? {
            DeployOutcome::Succeeded => {
                info!(infrastructure_id = infrastructure.id, "Deploy finished");
                Ok(String::new())
            }
            DeployOutcome::Failed(reason) => Err(DeployError::DeployFailed(reason)),
            DeployOutcome::TimedOut { attempts } => Err(DeployError::DeployTimeout {
                timeout_secs: settings.timeout().as_secs(),
                attempts,
            }),
        }
    }

    /// List infrastructures as JSON.
    ///
    /// # Errors
    /// Returns [`DeployError::Transport`] if the listing fails.
    pub async fn list(&self, filter: InfrastructureFilter) -> Result<String, DeployError> {
        info!(
            show_ordered = filter.show_ordered,
            show_deleted = filter.show_deleted,
            "Listing infrastructures"
        );
        let infrastructures = self.api.list_infrastructures(filter).await?;
        render(&infrastructures)
    }

    /// Show one infrastructure as JSON.
    ///
    /// # Errors
    /// Same as [`Orchestrator::resolve`].
    pub async fn get(&self, id_or_label: &str) -> Result<String, DeployError> {
        let infrastructure = self.resolve(id_or_label).await?;
        render(&infrastructure)
    }

    /// Create an infrastructure and return it as JSON.
    ///
    /// # Errors
    /// Returns [`DeployError::Validation`] for an empty label and
    /// [`DeployError::Transport`] if the API rejects the request.
    pub async fn create(&self, site_id: u64, label: &str) -> Result<String, DeployError> {
        if label.trim().is_empty() {
            return Err(DeployError::Validation("label is required".to_string()));
        }

        let infrastructure = self.api.create_infrastructure(site_id, label).await?;
        render(&infrastructure)
    }

    /// Relabel an infrastructure and/or replace its custom variables.
    ///
    /// The update carries the configuration revision read during resolution,
    /// so it fails if the configuration changed in between. A missing
    /// `new_label` keeps the current label.
    ///
    /// # Errors
    /// Returns [`DeployError::Validation`] if the infrastructure has no
    /// configuration revision and [`DeployError::Transport`] if the API
    /// rejects the update.
    pub async fn update(
        &self,
        id_or_label: &str,
        new_label: Option<&str>,
        custom_variables: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<String, DeployError> {
        let infrastructure = self.resolve(id_or_label).await?;
        let revision = infrastructure.revision.ok_or_else(|| {
            DeployError::Validation(format!(
                "infrastructure {} has no configuration revision",
                infrastructure.id
            ))
        })?;

        let update = InfrastructureUpdate {
            label: new_label
                .filter(|label| !label.is_empty())
                .unwrap_or(&infrastructure.label)
                .to_string(),
            custom_variables,
        };

        let updated = self
            .api
            .update_infrastructure(infrastructure.id, update, revision)
            .await?;
        render(&updated)
    }

    /// Poll the deploy status of `infrastructure_id` until it is terminal or
    /// `settings.timeout()` expires.
    ///
    /// # Errors
    /// A failed status fetch is returned as [`DeployError::Transport`]
    /// immediately, without retrying.
    pub async fn wait_until_deployed(
        &self,
        infrastructure_id: u64,
        settings: PollSettings,
    ) -> Result<DeployOutcome, DeployError> {
        info!(
            infrastructure_id,
            timeout_secs = settings.timeout().as_secs(),
            interval_secs = settings.check_interval().as_secs(),
            "Waiting for deploy to finish"
        );

        let outcome = poll_until(settings, move || async move {
            let status = self.api.deploy_status(infrastructure_id).await?;
            debug!(infrastructure_id, status = %status, "Polled deploy status");

            Ok::<_, ApiError>(if !status.is_terminal() {
                PollStatus::Pending
            } else if status.is_success() {
                PollStatus::Ready(())
            } else {
                PollStatus::Failed(format!(
                    "infrastructure {infrastructure_id} deploy ended with status '{status}'"
                ))
            })
        })
        .await?;

        Ok(match outcome {
            PollOutcome::Succeeded(()) => DeployOutcome::Succeeded,
            PollOutcome::Failed(reason) => {
                warn!(infrastructure_id, reason = %reason, "Deploy failed");
                DeployOutcome::Failed(reason)
            }
            PollOutcome::TimedOut { attempts } => {
                warn!(infrastructure_id, attempts, "Gave up waiting for deploy");
                DeployOutcome::TimedOut { attempts }
            }
        })
    }

    /// Discard the pending changes of an infrastructure.
    ///
    /// # Errors
    /// Returns [`DeployError::NotConfirmed`] before any mutation if the
    /// guard denies the operation and [`DeployError::Transport`] for API
    /// failures.
    pub async fn revert(&self, id_or_label: &str, autoconfirm: bool) -> Result<String, DeployError> {
        let infrastructure = self.resolve(id_or_label).await?;

        self.guard.check(
            autoconfirm,
            &format!(
                "Reverting infrastructure {} ({}) to the deployed state. Are you sure? Type \"yes\" to continue:",
                infrastructure.label, infrastructure.id
            ),
        )?;

        self.api.revert(infrastructure.id).await?;
        info!(infrastructure_id = infrastructure.id, "Pending changes reverted");
        Ok(String::new())
    }

    /// Delete an infrastructure.
    ///
    /// # Errors
    /// Returns [`DeployError::NotConfirmed`] before any mutation if the
    /// guard denies the operation and [`DeployError::Transport`] for API
    /// failures.
    pub async fn delete(&self, id_or_label: &str, autoconfirm: bool) -> Result<String, DeployError> {
        let infrastructure = self.resolve(id_or_label).await?;

        self.guard.check(
            autoconfirm,
            &format!(
                "Deleting infrastructure {} ({}). Are you sure? Type \"yes\" to continue:",
                infrastructure.label, infrastructure.id
            ),
        )?;

        self.api.delete(infrastructure.id).await?;
        Ok(String::new())
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, DeployError> {
    serde_json::to_string_pretty(value).map_err(DeployError::Render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DeployStatus, MockInfrastructureApi};
    use crate::deploy::{ExecutionMode, ShutdownFlags, ShutdownPolicy};
    use mockall::predicate::eq;
    use std::io;
    use std::time::Duration;
    use tokio::time::Instant;

    struct Answer(&'static str);

    impl Prompter for Answer {
        fn ask(&self, _message: &str) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn testinfra() -> Infrastructure {
        Infrastructure {
            id: 10002,
            label: "testinfra".to_string(),
            service_status: Some("active".to_string()),
            deploy_status: DeployStatus::NotStarted,
            revision: Some(3),
        }
    }

    fn api_with_testinfra() -> MockInfrastructureApi {
        let mut api = MockInfrastructureApi::new();
        api.expect_search_infrastructures()
            .returning(|_| Ok(vec![testinfra()]));
        api
    }

    fn request(confirmed: bool, allow_data_loss: bool) -> DeployRequest {
        DeployRequest {
            target: "10002".to_string(),
            shutdown: ShutdownPolicy::resolve(ShutdownFlags {
                attempt_soft_shutdown: false,
                soft_shutdown_timeout: 256,
                ..ShutdownFlags::default()
            }),
            allow_data_loss,
            confirmed,
        }
    }

    fn orchestrator(
        api: MockInfrastructureApi,
        answer: &'static str,
    ) -> Orchestrator<MockInfrastructureApi, Answer> {
        Orchestrator::new(
            api,
            ConfirmationGuard::new(ExecutionMode::Interactive, Answer(answer)),
        )
    }

    #[tokio::test]
    async fn test_deploy_without_confirmation_makes_no_mutation() {
        let mut api = api_with_testinfra();
        api.expect_deploy().never();

        let err = orchestrator(api, "no")
            .deploy(&request(false, false), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Operation not confirmed. Aborting");
    }

    #[tokio::test]
    async fn test_allow_data_loss_does_not_imply_confirmation() {
        let mut api = api_with_testinfra();
        api.expect_deploy().never();

        let err = orchestrator(api, "")
            .deploy(&request(false, true), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NotConfirmed));
    }

    #[tokio::test]
    async fn test_autoconfirmed_deploy_dispatches_once() {
        let mut api = api_with_testinfra();
        api.expect_deploy()
            .with(
                eq(10002),
                eq(ShutdownPolicy {
                    attempt_soft: false,
                    soft_timeout_seconds: 256,
                    hard_after_timeout: true,
                    forced: false,
                }),
                eq(true),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));
        api.expect_deploy_status().never();

        let output = orchestrator(api, "no")
            .deploy(&request(true, true), None)
            .await
            .unwrap();
        assert_eq!(output, "");
    }

    #[tokio::test]
    async fn test_interactive_yes_confirms_deploy() {
        let mut api = api_with_testinfra();
        api.expect_deploy().times(1).returning(|_, _, _| Ok(()));

        let output = orchestrator(api, "yes")
            .deploy(&request(false, false), None)
            .await
            .unwrap();
        assert_eq!(output, "");
    }

    #[tokio::test]
    async fn test_deploy_rejected_by_api_is_transport_error() {
        let mut api = api_with_testinfra();
        api.expect_deploy().times(1).returning(|_, _, _| {
            Err(ApiError::Api {
                status: 409,
                message: "data loss expected".to_string(),
            })
        });

        let err = orchestrator(api, "")
            .deploy(&request(true, false), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::Transport(ApiError::Api { status: 409, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_deploy_already_finished() {
        let mut api = api_with_testinfra();
        api.expect_deploy().times(1).returning(|_, _, _| Ok(()));
        api.expect_deploy_status()
            .with(eq(10002))
            .times(1)
            .returning(|_| Ok(DeployStatus::Finished));

        let started = Instant::now();
        let output = orchestrator(api, "")
            .deploy(&request(true, false), Some(PollSettings::from_secs(1, 3).unwrap()))
            .await
            .unwrap();

        assert_eq!(output, "");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_deploy_ongoing_then_finished() {
        let mut api = api_with_testinfra();
        api.expect_deploy().times(1).returning(|_, _, _| Ok(()));

        let mut polls = 0;
        api.expect_deploy_status().times(2).returning(move |_| {
            polls += 1;
            Ok(if polls == 1 {
                DeployStatus::Ongoing
            } else {
                DeployStatus::Finished
            })
        });

        orchestrator(api, "")
            .deploy(&request(true, false), Some(PollSettings::from_secs(1, 3).unwrap()))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_deploy_times_out() {
        let mut api = api_with_testinfra();
        api.expect_deploy().times(1).returning(|_, _, _| Ok(()));
        api.expect_deploy_status()
            .times(3)
            .returning(|_| Ok(DeployStatus::Ongoing));

        let err = orchestrator(api, "")
            .deploy(&request(true, false), Some(PollSettings::from_secs(1, 2).unwrap()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::DeployTimeout {
                timeout_secs: 2,
                attempts: 3
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_deploy_reports_remote_failure() {
        let mut api = api_with_testinfra();
        api.expect_deploy().times(1).returning(|_, _, _| Ok(()));
        api.expect_deploy_status()
            .times(1)
            .returning(|_| Ok(DeployStatus::Error));

        let err = orchestrator(api, "")
            .deploy(&request(true, false), Some(PollSettings::from_secs(1, 60).unwrap()))
            .await
            .unwrap_err();

        match err {
            DeployError::DeployFailed(reason) => assert!(reason.contains("'error'")),
            other => panic!("expected DeployFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_transport_error_is_not_a_deploy_failure() {
        let mut api = api_with_testinfra();
        api.expect_deploy().times(1).returning(|_, _, _| Ok(()));
        api.expect_deploy_status().times(1).returning(|_| {
            Err(ApiError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            })
        });

        let err = orchestrator(api, "")
            .deploy(&request(true, false), Some(PollSettings::from_secs(1, 60).unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Transport(_)));
    }

    #[tokio::test]
    async fn test_resolve_by_label() {
        let mut api = MockInfrastructureApi::new();
        api.expect_search_infrastructures()
            .withf(|query| query.to_string() == "testinfra")
            .returning(|_| {
                Ok(vec![
                    Infrastructure {
                        id: 10003,
                        label: "testinfra2".to_string(),
                        service_status: None,
                        deploy_status: DeployStatus::NotStarted,
                        revision: None,
                    },
                    testinfra(),
                ])
            });

        let found = orchestrator(api, "").resolve("testinfra").await.unwrap();
        assert_eq!(found.id, 10002);
    }

    #[tokio::test]
    async fn test_resolve_matches_label_verbatim() {
        let mut api = MockInfrastructureApi::new();
        api.expect_search_infrastructures()
            .withf(|query| query.to_string() == " padded ")
            .returning(|_| {
                Ok(vec![Infrastructure {
                    label: " padded ".to_string(),
                    ..testinfra()
                }])
            });

        let found = orchestrator(api, "").resolve(" padded ").await.unwrap();
        assert_eq!(found.id, 10002);
    }

    #[tokio::test]
    async fn test_resolve_does_not_trim_before_matching() {
        let mut api = api_with_testinfra();
        api.expect_get_infrastructure().never();

        let err = orchestrator(api, "").resolve(" testinfra ").await.unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let mut api = MockInfrastructureApi::new();
        api.expect_search_infrastructures()
            .returning(|_| Ok(vec![testinfra()]));

        let err = orchestrator(api, "").resolve("missing").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments: infrastructure 'missing' not found"
        );
    }

    #[tokio::test]
    async fn test_empty_target_makes_no_calls() {
        let mut api = MockInfrastructureApi::new();
        api.expect_search_infrastructures().never();

        let err = orchestrator(api, "yes").delete("  ", true).await.unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
    }

    #[tokio::test]
    async fn test_revert_requires_confirmation() {
        let mut api = api_with_testinfra();
        api.expect_revert().never();

        let err = orchestrator(api, "no").revert("testinfra", false).await.unwrap_err();
        assert!(matches!(err, DeployError::NotConfirmed));
    }

    #[tokio::test]
    async fn test_autoconfirmed_revert() {
        let mut api = api_with_testinfra();
        api.expect_revert()
            .with(eq(10002))
            .times(1)
            .returning(|_| Ok(()));

        let output = orchestrator(api, "").revert("10002", true).await.unwrap();
        assert_eq!(output, "");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut api = api_with_testinfra();
        api.expect_delete().never();

        let err = orchestrator(api, "").delete("testinfra", false).await.unwrap_err();
        assert!(matches!(err, DeployError::NotConfirmed));
    }

    #[tokio::test]
    async fn test_confirmed_delete() {
        let mut api = api_with_testinfra();
        api.expect_delete()
            .with(eq(10002))
            .times(1)
            .returning(|_| Ok(()));

        orchestrator(api, "yes").delete("testinfra", false).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_renders_json_array() {
        let mut api = MockInfrastructureApi::new();
        api.expect_list_infrastructures()
            .with(eq(InfrastructureFilter {
                show_ordered: true,
                show_deleted: false,
            }))
            .times(1)
            .returning(|_| Ok(vec![testinfra()]));

        let output = orchestrator(api, "")
            .list(InfrastructureFilter {
                show_ordered: true,
                show_deleted: false,
            })
            .await
            .unwrap();

        let listed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(listed[0]["id"], 10002);
        assert_eq!(listed[0]["label"], "testinfra");
        assert_eq!(listed[0]["deploy_status"], "not_started");
    }

    #[tokio::test]
    async fn test_get_renders_resolved_infrastructure() {
        let api = api_with_testinfra();

        let output = orchestrator(api, "").get("10002").await.unwrap();
        let shown: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(shown["label"], "testinfra");
        assert_eq!(shown["service_status"], "active");
    }

    #[tokio::test]
    async fn test_create_requires_label() {
        let mut api = MockInfrastructureApi::new();
        api.expect_create_infrastructure().never();

        let err = orchestrator(api, "").create(2, " ").await.unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_dispatches_site_and_label() {
        let mut api = MockInfrastructureApi::new();
        api.expect_create_infrastructure()
            .withf(|site_id, label| *site_id == 2 && label.to_string() == "newinfra")
            .times(1)
            .returning(|_, label| {
                Ok(Infrastructure {
                    id: 10010,
                    label: label.to_string(),
                    ..testinfra()
                })
            });

        let output = orchestrator(api, "").create(2, "newinfra").await.unwrap();
        let created: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(created["id"], 10010);
    }

    #[tokio::test]
    async fn test_update_keeps_label_and_sends_revision() {
        let mut api = api_with_testinfra();
        api.expect_update_infrastructure()
            .with(
                eq(10002),
                eq(InfrastructureUpdate {
                    label: "testinfra".to_string(),
                    custom_variables: None,
                }),
                eq(3),
            )
            .times(1)
            .returning(|_, _, _| Ok(testinfra()));

        orchestrator(api, "").update("testinfra", None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_relabels_with_custom_variables() {
        let mut variables = serde_json::Map::new();
        variables.insert("env".to_string(), serde_json::json!("prod"));
        let expected = InfrastructureUpdate {
            label: "renamed".to_string(),
            custom_variables: Some(variables.clone()),
        };

        let mut api = api_with_testinfra();
        api.expect_update_infrastructure()
            .with(eq(10002), eq(expected), eq(3))
            .times(1)
            .returning(|_, _, _| Ok(testinfra()));

        orchestrator(api, "")
            .update("testinfra", Some("renamed"), Some(variables))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_without_revision_is_rejected() {
        let mut api = MockInfrastructureApi::new();
        api.expect_search_infrastructures().returning(|_| {
            Ok(vec![Infrastructure {
                revision: None,
                ..testinfra()
            }])
        });
        api.expect_update_infrastructure().never();

        let err = orchestrator(api, "")
            .update("testinfra", Some("renamed"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
    }
}
