//! Pure validation and derivation applied at submission time.
//!
//! The source portal derived the centre/state budget split and the project
//! duration live in a form; here the same derivations run once, inside the
//! engine, when a project is created.

use chrono::{DateTime, NaiveDate, Utc};

use super::project::{
    AgencyId, Milestone, MilestoneStatus, Project, ProjectId, ProjectStatus, StateId,
};
use crate::errors::WorkflowError;

/// Centre share of the total budget for a centrally sponsored scheme,
/// expressed as a numerator over 100. The state carries the remainder.
pub const CENTRE_SHARE_PERCENT: u64 = 60;

/// Everything a state authority supplies when setting up a project. Shares
/// may be given explicitly (they must then sum to the total budget) or left
/// out to be derived.
#[derive(Debug, Clone)]
pub struct NewProjectInput {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub block_taluk: Option<String>,
    pub agency_id: AgencyId,
    pub total_budget: u64,
    pub centre_share: Option<u64>,
    pub state_share: Option<u64>,
    /// Funds sanctioned for release so far. Defaults to the full budget.
    pub initial_allocation: Option<u64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_beneficiaries: u64,
    pub milestones: Vec<MilestoneInput>,
}

#[derive(Debug, Clone)]
pub struct MilestoneInput {
    pub name: String,
    pub target_date: NaiveDate,
    pub budget_allocation: u64,
}

/// Default 60/40 centre/state split. Integer arithmetic, remainder to the
/// state so the two shares always sum back to the total.
pub fn derive_budget_split(total_budget: u64) -> (u64, u64) {
    let centre = total_budget / 100 * CENTRE_SHARE_PERCENT
        + total_budget % 100 * CENTRE_SHARE_PERCENT / 100;
    (centre, total_budget - centre)
}

/// Project duration in whole months, rounded from 30-day blocks, at least 1.
pub fn derive_duration_months(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days().max(0) as f64;
    ((days / 30.0).round() as u32).max(1)
}

pub fn validate_percent(percent: u8) -> Result<(), WorkflowError> {
    if percent > 100 {
        return Err(WorkflowError::validation(format!(
            "requested_percent must be within 0..=100, got {percent}"
        )));
    }
    Ok(())
}

/// Validate a creation request and assemble the initial project record.
pub fn build_project(
    state_id: StateId,
    input: NewProjectInput,
    now: DateTime<Utc>,
) -> Result<Project, WorkflowError> {
    if input.name.trim().is_empty() {
        return Err(WorkflowError::validation("project name must not be empty"));
    }
    if input.total_budget == 0 {
        return Err(WorkflowError::validation("total_budget must be positive"));
    }
    if input.end_date <= input.start_date {
        return Err(WorkflowError::validation(
            "end_date must fall after start_date",
        ));
    }

    let (centre_share, state_share) = match (input.centre_share, input.state_share) {
        (Some(centre), Some(state)) => {
            if centre + state != input.total_budget {
                return Err(WorkflowError::validation(format!(
                    "centre_share + state_share must equal total_budget ({} + {} != {})",
                    centre, state, input.total_budget
                )));
            }
            (centre, state)
        }
        (None, None) => derive_budget_split(input.total_budget),
        _ => {
            return Err(WorkflowError::validation(
                "centre_share and state_share must be given together or not at all",
            ));
        }
    };

    let total_allocated = input.initial_allocation.unwrap_or(input.total_budget);
    if total_allocated > input.total_budget {
        return Err(WorkflowError::validation(format!(
            "initial_allocation {} exceeds total_budget {}",
            total_allocated, input.total_budget
        )));
    }

    let milestone_budget: u64 = input.milestones.iter().map(|m| m.budget_allocation).sum();
    if milestone_budget > input.total_budget {
        return Err(WorkflowError::validation(format!(
            "milestone allocations sum to {}, above the total budget {}",
            milestone_budget, input.total_budget
        )));
    }

    let milestones = input
        .milestones
        .into_iter()
        .enumerate()
        .map(|(idx, m)| Milestone {
            milestone_number: idx as u32 + 1,
            name: m.name,
            status: MilestoneStatus::NotStarted,
            target_date: m.target_date,
            completion_date: None,
            budget_allocation: m.budget_allocation,
        })
        .collect();

    Ok(Project {
        project_id: input.project_id,
        name: input.name,
        description: input.description,
        block_taluk: input.block_taluk,
        state_id,
        agency_id: input.agency_id,
        status: ProjectStatus::NotStarted,
        progress_percent: 0,
        total_budget: input.total_budget,
        centre_share,
        state_share,
        total_allocated,
        total_released: 0,
        total_spent: 0,
        target_beneficiaries: input.target_beneficiaries,
        actual_beneficiaries: 0,
        duration_months: derive_duration_months(input.start_date, input.end_date),
        start_date: input.start_date,
        end_date: input.end_date,
        milestones,
        created_at: now,
    })
}
