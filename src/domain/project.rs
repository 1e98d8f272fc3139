// Core records for the three-tier monitoring hierarchy:
// implementing agency -> state authority -> central ministry.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Human-readable project identifier assigned at creation, e.g. "TN-ROAD-001".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgencyId(pub String);

/// Pre-authenticated caller identity, resolved by the authorization
/// collaborator before a request reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for AgencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Project lifecycle status. Serialized in the upper-snake wire form the
/// dashboards consume ("NOT_STARTED", "IN_PROGRESS", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    NotStarted,
    InProgress,
    Completed,
    Delayed,
    Suspended,
    Cancelled,
}

impl ProjectStatus {
    /// Statuses from which an agency may submit a progress update.
    pub fn accepts_updates(&self) -> bool {
        matches!(
            self,
            ProjectStatus::NotStarted | ProjectStatus::InProgress | ProjectStatus::Delayed
        )
    }

    /// Terminal statuses admit no further transitions of any kind.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Completed | ProjectStatus::Suspended | ProjectStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ProjectStatus::NotStarted => "NOT_STARTED",
            ProjectStatus::InProgress => "IN_PROGRESS",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Delayed => "DELAYED",
            ProjectStatus::Suspended => "SUSPENDED",
            ProjectStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// A scheduled stage of a project. Milestones are ordered by
/// `milestone_number` and referenced from progress updates by that ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub milestone_number: u32,
    pub name: String,
    pub status: MilestoneStatus,
    pub target_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub budget_allocation: u64,
}

/// A government-funded project owned by the state authority that created it.
///
/// Budget invariants (enforced at creation and on every applied decision):
/// centre_share + state_share == total_budget, and
/// 0 <= total_spent <= total_released <= total_allocated <= total_budget.
///
/// Fields are only ever mutated through decisions applied by the approval
/// workflow, never directly by an agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub block_taluk: Option<String>,
    pub state_id: StateId,
    pub agency_id: AgencyId,
    pub status: ProjectStatus,
    pub progress_percent: u8,
    pub total_budget: u64,
    pub centre_share: u64,
    pub state_share: u64,
    pub total_allocated: u64,
    pub total_released: u64,
    pub total_spent: u64,
    pub target_beneficiaries: u64,
    pub actual_beneficiaries: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_months: u32,
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Headroom left for fund releases.
    pub fn remaining_allocation(&self) -> u64 {
        self.total_allocated.saturating_sub(self.total_released)
    }

    /// The first milestone that has not completed yet, in ordinal order.
    pub fn active_milestone(&self) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.status != MilestoneStatus::Completed)
    }

    pub fn milestone_mut(&mut self, number: u32) -> Option<&mut Milestone> {
        self.milestones
            .iter_mut()
            .find(|m| m.milestone_number == number)
    }

    pub fn has_milestone(&self, number: u32) -> bool {
        self.milestones
            .iter()
            .any(|m| m.milestone_number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::sample_project;

    #[test]
    fn updatable_statuses() {
        assert!(ProjectStatus::NotStarted.accepts_updates());
        assert!(ProjectStatus::InProgress.accepts_updates());
        assert!(ProjectStatus::Delayed.accepts_updates());
        assert!(!ProjectStatus::Completed.accepts_updates());
        assert!(!ProjectStatus::Suspended.accepts_updates());
        assert!(!ProjectStatus::Cancelled.accepts_updates());
    }

    #[test]
    fn status_wire_form_is_upper_snake() {
        let json = serde_json::to_string(&ProjectStatus::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
        let back: ProjectStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(back, ProjectStatus::InProgress);
    }

    #[test]
    fn active_milestone_skips_completed() {
        let mut project = sample_project("TN-ROAD-001");
        project.milestones[0].status = MilestoneStatus::Completed;
        let active = project.active_milestone().unwrap();
        assert_eq!(active.milestone_number, 2);
    }

    #[test]
    fn remaining_allocation_never_underflows() {
        let mut project = sample_project("TN-ROAD-001");
        project.total_allocated = 100;
        project.total_released = 100;
        assert_eq!(project.remaining_allocation(), 0);
    }
}
