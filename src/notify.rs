//! Outbound workflow events.
//!
//! The engine emits a structured event at each boundary (submission received,
//! decision made, delay detected, ...) to a `NotificationSink` collaborator.
//! Delivery, fan-out and retry are the collaborator's concern; a sink that
//! fails must not fail the workflow operation that produced the event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ActorId, ProjectId, UpdateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowEventKind {
    ProjectCreated,
    SubmissionReceived,
    DecisionMade,
    /// A fund release was clamped to the remaining allocation. Informational;
    /// partial release is a legitimate outcome, not an error.
    FundShortfall,
    ProjectDelayed,
    ProjectSuspended,
    ProjectCancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub event: WorkflowEventKind,
    pub project_id: ProjectId,
    pub update_id: Option<UpdateId>,
    pub actor_id: ActorId,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl WorkflowEvent {
    pub fn new(
        event: WorkflowEventKind,
        project_id: ProjectId,
        update_id: Option<UpdateId>,
        actor_id: ActorId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event,
            project_id,
            update_id,
            actor_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: WorkflowEvent);
}

/// Default sink: surfaces events as structured log lines.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, event: WorkflowEvent) {
        tracing::info!(
            event = ?event.event,
            project.id = %event.project_id,
            update.id = ?event.update_id,
            actor.id = %event.actor_id,
            payload = %event.payload,
            "Workflow event"
        );
    }
}

/// Drops every event. Useful in tests that assert on engine state only.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn deliver(&self, _event: WorkflowEvent) {}
}
