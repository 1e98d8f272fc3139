use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActorId, AgencyId, ProjectId};

/// Ledger-wide unique identifier of a progress update submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateId(pub Uuid);

impl UpdateId {
    pub fn generate() -> Self {
        UpdateId(Uuid::new_v4())
    }
}

impl std::fmt::Display for UpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Review outcome of a progress update. PENDING -> APPROVED | REJECTED,
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Pending,
    Approved,
    Rejected,
}

/// A reviewer's verdict. Deliberately excludes PENDING so a decision can
/// never return an update to the undecided state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for Decision {
    fn from(verdict: ReviewDecision) -> Self {
        match verdict {
            ReviewDecision::Approved => Decision::Approved,
            ReviewDecision::Rejected => Decision::Rejected,
        }
    }
}

/// An agency's claim of physical progress, optionally coupled with a fund
/// request. Immutable once appended to the ledger except for the single
/// decision transition; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub id: UpdateId,
    pub project_id: ProjectId,
    pub milestone_number: Option<u32>,
    pub submitting_agency_id: AgencyId,
    /// Project progress at submission time, snapshotted so reviewers see the
    /// claimed delta even after later updates land.
    pub previous_percent: u8,
    pub requested_percent: u8,
    pub remarks: String,
    pub fund_requested: Option<u64>,
    pub fund_justification: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub decision: Decision,
    pub decided_by: Option<ActorId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_remarks: Option<String>,
}

impl ProgressUpdate {
    pub fn is_pending(&self) -> bool {
        self.decision == Decision::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.decision == Decision::Approved
    }
}
