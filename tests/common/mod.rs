#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pragati_engine::{
    ActorId, AgencyId, AgencyScope, ApprovalWorkflow, MilestoneInput, NewProjectInput,
    NotificationSink, ProgressUpdateLedger, ProjectId, ProjectStore, ReviewerScope,
    RollupAggregator, StateId, SubmitProgressUpdate, WorkflowEvent,
};

pub struct Harness {
    pub store: Arc<ProjectStore>,
    pub ledger: Arc<ProgressUpdateLedger>,
    pub workflow: ApprovalWorkflow,
    pub rollup: RollupAggregator,
}

pub fn harness() -> Harness {
    let store = Arc::new(ProjectStore::new());
    let ledger = Arc::new(ProgressUpdateLedger::new());
    Harness {
        workflow: ApprovalWorkflow::new(Arc::clone(&store), Arc::clone(&ledger)),
        rollup: RollupAggregator::new(Arc::clone(&store), Arc::clone(&ledger)),
        store,
        ledger,
    }
}

/// Sink that records every delivered event, for assertions on the outbound
/// contract.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    pub async fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, event: WorkflowEvent) {
        self.events.lock().await.push(event);
    }
}

pub fn reviewer(state: &str) -> ReviewerScope {
    ReviewerScope {
        actor: ActorId(format!("state.{}", state.to_lowercase())),
        state_id: StateId(state.to_string()),
    }
}

pub fn agency(agency_id: &str, state: &str) -> AgencyScope {
    AgencyScope {
        actor: ActorId(format!("user.{}", agency_id.to_lowercase())),
        agency_id: AgencyId(agency_id.to_string()),
        state_id: StateId(state.to_string()),
    }
}

/// Project fixture with the first milestone already overdue, so delay-sweep
/// tests do not depend on the date the suite runs.
pub fn project_input(id: &str, agency_id: &str, total_budget: u64) -> NewProjectInput {
    let today = chrono::Utc::now().date_naive();
    NewProjectInput {
        project_id: ProjectId(id.to_string()),
        name: format!("Works package {id}"),
        description: "Infrastructure works under the scheme".to_string(),
        block_taluk: None,
        agency_id: AgencyId(agency_id.to_string()),
        total_budget,
        centre_share: None,
        state_share: None,
        initial_allocation: None,
        start_date: today - chrono::Duration::days(300),
        end_date: today + chrono::Duration::days(300),
        target_beneficiaries: 500,
        milestones: vec![
            MilestoneInput {
                name: "Groundwork".to_string(),
                target_date: today - chrono::Duration::days(30),
                budget_allocation: total_budget / 2,
            },
            MilestoneInput {
                name: "Handover".to_string(),
                target_date: today + chrono::Duration::days(200),
                budget_allocation: total_budget / 2,
            },
        ],
    }
}

pub fn submission(project_id: &ProjectId, percent: u8) -> SubmitProgressUpdate {
    SubmitProgressUpdate {
        project_id: project_id.clone(),
        milestone_number: None,
        requested_percent: percent,
        remarks: "monthly progress report".to_string(),
        fund_requested: None,
        fund_justification: None,
    }
}

pub fn funded_submission(
    project_id: &ProjectId,
    percent: u8,
    fund_requested: u64,
) -> SubmitProgressUpdate {
    SubmitProgressUpdate {
        fund_requested: Some(fund_requested),
        fund_justification: Some("material procurement for the next stage".to_string()),
        ..submission(project_id, percent)
    }
}
