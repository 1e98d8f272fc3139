use serde::{Deserialize, Serialize};

use crate::domain::{AgencyId, ProjectId, ProjectStatus, StateId};

/// Project counts broken out by lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub not_started: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub delayed: u64,
    pub suspended: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: ProjectStatus) {
        match status {
            ProjectStatus::NotStarted => self.not_started += 1,
            ProjectStatus::InProgress => self.in_progress += 1,
            ProjectStatus::Completed => self.completed += 1,
            ProjectStatus::Delayed => self.delayed += 1,
            ProjectStatus::Suspended => self.suspended += 1,
            ProjectStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn merge(&mut self, other: &StatusCounts) {
        self.not_started += other.not_started;
        self.in_progress += other.in_progress;
        self.completed += other.completed;
        self.delayed += other.delayed;
        self.suspended += other.suspended;
        self.cancelled += other.cancelled;
    }
}

/// Fund flow totals across a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundTotals {
    pub total_budget: u64,
    pub total_allocated: u64,
    pub total_released: u64,
    pub total_spent: u64,
}

impl FundTotals {
    pub fn merge(&mut self, other: &FundTotals) {
        self.total_budget += other.total_budget;
        self.total_allocated += other.total_allocated;
        self.total_released += other.total_released;
        self.total_spent += other.total_spent;
    }

    /// total_spent / total_allocated, 0 when nothing is allocated.
    pub fn utilization_rate(&self) -> f64 {
        if self.total_allocated == 0 {
            0.0
        } else {
            self.total_spent as f64 / self.total_allocated as f64
        }
    }
}

/// State-level dashboard aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSummary {
    pub state_id: StateId,
    pub total_projects: u64,
    pub by_status: StatusCounts,
    pub funds: FundTotals,
    pub target_beneficiaries: u64,
    pub actual_beneficiaries: u64,
    pub pending_approvals: u64,
    /// completed / total_projects, 0 when the state has no projects.
    pub completion_rate: f64,
    pub utilization_rate: f64,
}

/// National totals across every state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationalTotals {
    pub total_states: u64,
    pub total_projects: u64,
    pub by_status: StatusCounts,
    pub funds: FundTotals,
    pub completion_rate: f64,
    pub utilization_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationalSummary {
    pub states: Vec<StateSummary>,
    pub totals: NationalTotals,
    pub top_escalations: Vec<Escalation>,
}

/// Why a project surfaced on the national escalation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationReason {
    /// The delay sweep moved the project to DELAYED.
    Delayed { days_overdue: i64 },
    /// The latest live fund request outweighs what is left to release.
    FundPressure { requested: u64, headroom: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    pub project_id: ProjectId,
    pub state_id: StateId,
    pub project_name: String,
    pub reason: EscalationReason,
}

impl Escalation {
    /// Ordering key: delayed projects outrank fund pressure, and within each
    /// band the larger magnitude wins.
    pub(crate) fn rank(&self) -> (u8, u64) {
        match &self.reason {
            EscalationReason::Delayed { days_overdue } => (0, *days_overdue as u64),
            EscalationReason::FundPressure {
                requested,
                headroom,
            } => (1, requested.saturating_sub(*headroom)),
        }
    }
}

/// Agency-level dashboard aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencySummary {
    pub agency_id: AgencyId,
    pub total_projects: u64,
    pub by_status: StatusCounts,
    pub funds: FundTotals,
    pub average_progress: f64,
    pub pending_updates: u64,
}
