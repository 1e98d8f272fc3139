pub mod project;
pub mod update;
pub mod validation;

pub use project::{
    ActorId, AgencyId, Milestone, MilestoneStatus, Project, ProjectId, ProjectStatus, StateId,
};
pub use update::{Decision, ProgressUpdate, ReviewDecision, UpdateId};
pub use validation::{MilestoneInput, NewProjectInput};
