// Pragati Engine - progress & approval workflow for centrally sponsored schemes
// This exposes the core components for embedding and integration testing

pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod notify;
pub mod retry;
pub mod rollup;
pub mod scope;
pub mod store;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, init_config, DelayConfig, EscalationConfig, PragatiConfig};
pub use domain::{
    ActorId, AgencyId, Decision, Milestone, MilestoneInput, MilestoneStatus, NewProjectInput,
    ProgressUpdate, Project, ProjectId, ProjectStatus, ReviewDecision, StateId, UpdateId,
};
pub use errors::{StorageError, WorkflowError};
pub use ledger::ProgressUpdateLedger;
pub use notify::{NotificationSink, NullSink, TracingSink, WorkflowEvent, WorkflowEventKind};
pub use retry::{RetryConfig, RetryHandler};
pub use rollup::{AgencySummary, Escalation, EscalationReason, NationalSummary, RollupAggregator, StateSummary};
pub use scope::{AgencyScope, CentralScope, ReviewerScope};
pub use store::ProjectStore;
pub use telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflow::{
    AdministrativeAction, ApprovalWorkflow, DecisionOutcome, FundRelease, SubmitProgressUpdate,
};
