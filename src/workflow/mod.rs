//! The approval workflow: the only writer of project state.
//!
//! Agencies submit progress claims, state reviewers decide them, and every
//! decision is applied back onto the project record inside that project's
//! exclusive critical section. Either the whole transition lands or none of
//! it does; validation completes before the first mutation.

pub mod transitions;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use crate::config::DelayConfig;
use crate::domain::validation::{self, NewProjectInput};
use crate::domain::{
    ActorId, Decision, MilestoneStatus, ProgressUpdate, Project, ProjectId, ProjectStatus,
    ReviewDecision, UpdateId,
};
use crate::errors::WorkflowError;
use crate::ledger::ProgressUpdateLedger;
use crate::notify::{NotificationSink, TracingSink, WorkflowEvent, WorkflowEventKind};
use crate::retry::RetryHandler;
use crate::scope::{AgencyScope, ReviewerScope};
use crate::store::ProjectStore;

/// An agency's submission request. Percent is absolute, not a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitProgressUpdate {
    pub project_id: ProjectId,
    pub milestone_number: Option<u32>,
    pub requested_percent: u8,
    pub remarks: String,
    pub fund_requested: Option<u64>,
    pub fund_justification: Option<String>,
}

/// Funds movement caused by an approval. `shortfall` is the part of the
/// request that did not fit in the remaining allocation; informational, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRelease {
    pub requested: u64,
    pub released: u64,
    pub shortfall: u64,
}

/// What a `decide` call did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub update: ProgressUpdate,
    pub project_status: ProjectStatus,
    pub progress_percent: u8,
    pub fund_release: Option<FundRelease>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdministrativeAction {
    Suspend,
    Cancel,
}

pub struct ApprovalWorkflow {
    store: Arc<ProjectStore>,
    ledger: Arc<ProgressUpdateLedger>,
    sink: Arc<dyn NotificationSink>,
    retry: RetryHandler,
    delay: DelayConfig,
}

impl std::fmt::Debug for ApprovalWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalWorkflow")
            .field("projects", &self.store.len())
            .field("ledger_entries", &self.ledger.len())
            .field("delay", &self.delay)
            .finish()
    }
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<ProjectStore>, ledger: Arc<ProgressUpdateLedger>) -> Self {
        Self {
            store,
            ledger,
            sink: Arc::new(TracingSink),
            retry: RetryHandler::default(),
            delay: DelayConfig::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_retry(mut self, retry: RetryHandler) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_delay_config(mut self, delay: DelayConfig) -> Self {
        self.delay = delay;
        self
    }

    /// Set up a new project under the reviewer's state authority. Budget
    /// split and duration are derived here, at submission time, from the
    /// creation input.
    pub async fn create_project(
        &self,
        scope: &ReviewerScope,
        input: NewProjectInput,
    ) -> Result<ProjectId, WorkflowError> {
        let project = validation::build_project(scope.state_id.clone(), input, Utc::now())?;
        let project_id = project.project_id.clone();
        let payload = json!({
            "name": project.name,
            "agency_id": project.agency_id,
            "total_budget": project.total_budget,
            "centre_share": project.centre_share,
            "state_share": project.state_share,
        });

        self.store.insert(project)?;

        info!(
            project.id = %project_id,
            state.id = %scope.state_id,
            "Project created"
        );
        self.emit(
            WorkflowEventKind::ProjectCreated,
            &project_id,
            None,
            &scope.actor,
            payload,
        )
        .await;
        Ok(project_id)
    }

    /// Append a PENDING progress update for review.
    ///
    /// At most one update may be outstanding per project; a concurrent or
    /// retried submission while one is pending fails with `Conflict` rather
    /// than duplicating the claim.
    pub async fn submit_progress_update(
        &self,
        scope: &AgencyScope,
        request: SubmitProgressUpdate,
    ) -> Result<UpdateId, WorkflowError> {
        validation::validate_percent(request.requested_percent)?;
        if request.remarks.trim().is_empty() {
            return Err(WorkflowError::validation("remarks must not be empty"));
        }
        if request.fund_requested == Some(0) {
            return Err(WorkflowError::validation(
                "fund_requested must be positive when present",
            ));
        }
        if request.fund_requested.is_some()
            && request
                .fund_justification
                .as_deref()
                .map_or(true, |j| j.trim().is_empty())
        {
            return Err(WorkflowError::validation(
                "a fund request must carry a justification",
            ));
        }

        let guard = self.lock_project(&request.project_id).await?;

        if !scope.implements(&guard) {
            return Err(WorkflowError::unauthorized(format!(
                "agency {} is not the implementing agency of project {}",
                scope.agency_id, guard.project_id
            )));
        }
        if !guard.status.accepts_updates() {
            return Err(WorkflowError::InvalidState {
                project_id: guard.project_id.clone(),
                status: guard.status,
            });
        }
        if request.requested_percent < guard.progress_percent {
            return Err(WorkflowError::validation(format!(
                "requested_percent {} is below the current progress {}",
                request.requested_percent, guard.progress_percent
            )));
        }
        if let Some(number) = request.milestone_number {
            if !guard.has_milestone(number) {
                return Err(WorkflowError::validation(format!(
                    "project {} has no milestone {number}",
                    guard.project_id
                )));
            }
        }

        let update = ProgressUpdate {
            id: UpdateId::generate(),
            project_id: request.project_id.clone(),
            milestone_number: request.milestone_number,
            submitting_agency_id: scope.agency_id.clone(),
            previous_percent: guard.progress_percent,
            requested_percent: request.requested_percent,
            remarks: request.remarks,
            fund_requested: request.fund_requested,
            fund_justification: request.fund_justification,
            submitted_at: Utc::now(),
            decision: Decision::Pending,
            decided_by: None,
            decided_at: None,
            decision_remarks: None,
        };
        let update_id = self.ledger.append_pending(update)?;
        drop(guard);

        info!(
            project.id = %request.project_id,
            update.id = %update_id,
            requested_percent = request.requested_percent,
            fund_requested = request.fund_requested,
            "Progress update submitted"
        );
        self.emit(
            WorkflowEventKind::SubmissionReceived,
            &request.project_id,
            Some(update_id),
            &scope.actor,
            json!({
                "requested_percent": request.requested_percent,
                "fund_requested": request.fund_requested,
            }),
        )
        .await;
        Ok(update_id)
    }

    /// Decide a pending update. Approval applies the claimed progress, the
    /// lifecycle transition and any fund release onto the project in one
    /// atomic step; rejection touches nothing but the update's decision
    /// fields.
    pub async fn decide(
        &self,
        scope: &ReviewerScope,
        update_id: &UpdateId,
        decision: ReviewDecision,
        remarks: String,
    ) -> Result<DecisionOutcome, WorkflowError> {
        // First read only routes us to the owning project; everything is
        // re-checked once the critical section is held.
        let routed = self
            .ledger
            .get(update_id)
            .ok_or_else(|| WorkflowError::update_not_found(update_id))?;
        let mut guard = self.lock_project(&routed.project_id).await?;

        let update = self
            .ledger
            .get(update_id)
            .ok_or_else(|| WorkflowError::update_not_found(update_id))?;
        if !update.is_pending() {
            return Err(WorkflowError::AlreadyDecided {
                update_id: *update_id,
            });
        }
        if !scope.covers(&guard) {
            return Err(WorkflowError::unauthorized(format!(
                "reviewer scoped to state {} cannot decide updates in state {}",
                scope.state_id, guard.state_id
            )));
        }
        // A project suspended or cancelled while the update sat in review can
        // still have the update rejected, but no approval may touch it.
        if decision == ReviewDecision::Approved && !guard.status.accepts_updates() {
            return Err(WorkflowError::InvalidState {
                project_id: guard.project_id.clone(),
                status: guard.status,
            });
        }

        let now = Utc::now();
        let outcome = match decision {
            ReviewDecision::Rejected => {
                let update = self.ledger.record_decision(
                    update_id,
                    ReviewDecision::Rejected,
                    scope.actor.clone(),
                    now,
                    remarks,
                )?;
                info!(
                    project.id = %guard.project_id,
                    update.id = %update_id,
                    "Progress update rejected"
                );
                DecisionOutcome {
                    update,
                    project_status: guard.status,
                    progress_percent: guard.progress_percent,
                    fund_release: None,
                }
            }
            ReviewDecision::Approved => {
                let update = self.ledger.record_decision(
                    update_id,
                    ReviewDecision::Approved,
                    scope.actor.clone(),
                    now,
                    remarks,
                )?;
                self.apply_approval(&mut guard, &update, now)
            }
        };

        let project_id = guard.project_id.clone();
        drop(guard);

        self.emit(
            WorkflowEventKind::DecisionMade,
            &project_id,
            Some(*update_id),
            &scope.actor,
            json!({
                "decision": outcome.update.decision,
                "progress_percent": outcome.progress_percent,
                "project_status": outcome.project_status,
                "fund_release": outcome.fund_release,
            }),
        )
        .await;

        if let Some(release) = outcome.fund_release {
            if release.shortfall > 0 {
                warn!(
                    project.id = %project_id,
                    update.id = %update_id,
                    requested = release.requested,
                    released = release.released,
                    shortfall = release.shortfall,
                    "Fund release clamped to remaining allocation"
                );
                self.emit(
                    WorkflowEventKind::FundShortfall,
                    &project_id,
                    Some(*update_id),
                    &scope.actor,
                    json!({
                        "requested": release.requested,
                        "released": release.released,
                        "shortfall": release.shortfall,
                    }),
                )
                .await;
            }
        }

        Ok(outcome)
    }

    /// Time-based delay sweep, driven by an external scheduler. Transitions
    /// IN_PROGRESS projects to DELAYED once the active milestone's target
    /// date has passed with no recent approved update. Idempotent: returns
    /// `false` without error when nothing needed to change.
    pub async fn mark_delayed(
        &self,
        project_id: &ProjectId,
        as_of: DateTime<Utc>,
    ) -> Result<bool, WorkflowError> {
        let mut guard = self.lock_project(project_id).await?;

        if !transitions::eligible_for_delay(guard.status) {
            return Ok(false);
        }
        let Some(milestone) = guard.active_milestone() else {
            return Ok(false);
        };
        let milestone_number = milestone.milestone_number;
        let target_date = milestone.target_date;
        if as_of.date_naive() <= target_date {
            return Ok(false);
        }
        if let Some(last) = self.ledger.latest_approved(project_id) {
            if let Some(decided_at) = last.decided_at {
                if (as_of - decided_at).num_days() < self.delay.stale_after_days {
                    return Ok(false);
                }
            }
        }

        guard.status = ProjectStatus::Delayed;
        drop(guard);

        warn!(
            project.id = %project_id,
            milestone = milestone_number,
            target_date = %target_date,
            "Project marked delayed"
        );
        self.emit(
            WorkflowEventKind::ProjectDelayed,
            project_id,
            None,
            &ActorId("system.scheduler".to_string()),
            json!({
                "milestone_number": milestone_number,
                "target_date": target_date,
                "as_of": as_of,
            }),
        )
        .await;
        Ok(true)
    }

    /// Administrative suspension or cancellation by the owning state
    /// authority. Terminal: the project accepts no further updates. Any
    /// still-pending update stays in the ledger until a reviewer rejects it.
    pub async fn set_administrative_status(
        &self,
        scope: &ReviewerScope,
        project_id: &ProjectId,
        action: AdministrativeAction,
        reason: String,
    ) -> Result<(), WorkflowError> {
        let mut guard = self.lock_project(project_id).await?;

        if !scope.covers(&guard) {
            return Err(WorkflowError::unauthorized(format!(
                "reviewer scoped to state {} cannot administer projects in state {}",
                scope.state_id, guard.state_id
            )));
        }
        if guard.status.is_terminal() {
            return Err(WorkflowError::InvalidState {
                project_id: guard.project_id.clone(),
                status: guard.status,
            });
        }

        let (status, kind) = match action {
            AdministrativeAction::Suspend => {
                (ProjectStatus::Suspended, WorkflowEventKind::ProjectSuspended)
            }
            AdministrativeAction::Cancel => {
                (ProjectStatus::Cancelled, WorkflowEventKind::ProjectCancelled)
            }
        };
        guard.status = status;
        drop(guard);

        warn!(
            project.id = %project_id,
            status = %status,
            reason = %reason,
            "Administrative status applied"
        );
        self.emit(kind, project_id, None, &scope.actor, json!({ "reason": reason }))
            .await;
        Ok(())
    }

    /// Apply an approved update onto the locked project record.
    fn apply_approval(
        &self,
        project: &mut Project,
        update: &ProgressUpdate,
        now: DateTime<Utc>,
    ) -> DecisionOutcome {
        project.status = transitions::status_after_approval(project.status, update.requested_percent);
        project.progress_percent = update.requested_percent;

        if let Some(number) = update.milestone_number {
            if let Some(milestone) = project.milestone_mut(number) {
                if update.requested_percent >= 100 {
                    milestone.status = MilestoneStatus::Completed;
                    milestone.completion_date = Some(now.date_naive());
                } else if milestone.status == MilestoneStatus::NotStarted {
                    milestone.status = MilestoneStatus::InProgress;
                }
            }
        }

        let fund_release = update.fund_requested.map(|requested| {
            let released = requested.min(project.remaining_allocation());
            project.total_released += released;
            FundRelease {
                requested,
                released,
                shortfall: requested - released,
            }
        });

        info!(
            project.id = %project.project_id,
            update.id = %update.id,
            progress_percent = project.progress_percent,
            status = %project.status,
            released = fund_release.map(|f| f.released),
            "Progress update approved"
        );

        DecisionOutcome {
            update: update.clone(),
            project_status: project.status,
            progress_percent: project.progress_percent,
            fund_release,
        }
    }

    async fn lock_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<OwnedMutexGuard<Project>, WorkflowError> {
        let cell = self
            .store
            .cell(project_id)
            .ok_or_else(|| WorkflowError::project_not_found(project_id))?;
        let wait = self.store.lock_timeout();
        let guard = self
            .retry
            .execute(|| {
                let cell = Arc::clone(&cell);
                let id = project_id.clone();
                async move { ProjectStore::acquire(cell, id, wait).await }
            })
            .await?;
        Ok(guard)
    }

    async fn emit(
        &self,
        kind: WorkflowEventKind,
        project_id: &ProjectId,
        update_id: Option<UpdateId>,
        actor: &ActorId,
        payload: serde_json::Value,
    ) {
        self.sink
            .deliver(WorkflowEvent::new(
                kind,
                project_id.clone(),
                update_id,
                actor.clone(),
                payload,
            ))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::new_project_input;
    use crate::domain::{AgencyId, StateId};

    fn workflow() -> ApprovalWorkflow {
        ApprovalWorkflow::new(
            Arc::new(ProjectStore::new()),
            Arc::new(ProgressUpdateLedger::new()),
        )
    }

    fn reviewer() -> ReviewerScope {
        ReviewerScope {
            actor: ActorId("state.tn".to_string()),
            state_id: StateId("TN".to_string()),
        }
    }

    fn agency() -> AgencyScope {
        AgencyScope {
            actor: ActorId("agency.pwd".to_string()),
            agency_id: AgencyId("AG-PWD-01".to_string()),
            state_id: StateId("TN".to_string()),
        }
    }

    fn submission(project: &ProjectId, percent: u8) -> SubmitProgressUpdate {
        SubmitProgressUpdate {
            project_id: project.clone(),
            milestone_number: None,
            requested_percent: percent,
            remarks: "monthly report".to_string(),
            fund_requested: None,
            fund_justification: None,
        }
    }

    #[test]
    fn submit_then_approve_moves_the_project() {
        tokio_test::block_on(async {
            let workflow = workflow();
            let project_id = workflow
                .create_project(&reviewer(), new_project_input("TN-ROAD-001"))
                .await
                .unwrap();

            let update_id = workflow
                .submit_progress_update(&agency(), submission(&project_id, 40))
                .await
                .unwrap();

            let outcome = workflow
                .decide(&reviewer(), &update_id, ReviewDecision::Approved, String::new())
                .await
                .unwrap();

            assert_eq!(outcome.progress_percent, 40);
            assert_eq!(outcome.project_status, ProjectStatus::InProgress);
        });
    }

    #[test]
    fn submission_against_missing_project_is_not_found() {
        tokio_test::block_on(async {
            let workflow = workflow();
            let err = workflow
                .submit_progress_update(
                    &agency(),
                    submission(&ProjectId("TN-GHOST-000".to_string()), 10),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::NotFound { .. }));
        });
    }

    #[test]
    fn fund_request_requires_justification() {
        tokio_test::block_on(async {
            let workflow = workflow();
            let project_id = workflow
                .create_project(&reviewer(), new_project_input("TN-ROAD-001"))
                .await
                .unwrap();

            let mut request = submission(&project_id, 30);
            request.fund_requested = Some(50_000);
            let err = workflow
                .submit_progress_update(&agency(), request)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation { .. }));
        });
    }
}
