//! Typed caller scopes.
//!
//! Authorization itself lives outside the engine: an external collaborator
//! resolves a session to one of these scopes before calling in. The engine
//! only checks structurally that the scope covers the target project.

use serde::{Deserialize, Serialize};

use crate::domain::{ActorId, AgencyId, Project, StateId};

/// An implementing agency user. May submit progress updates for projects
/// assigned to that agency only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyScope {
    pub actor: ActorId,
    pub agency_id: AgencyId,
    pub state_id: StateId,
}

/// A state authority reviewer. May create projects for and decide updates
/// within exactly one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerScope {
    pub actor: ActorId,
    pub state_id: StateId,
}

/// A central ministry officer. Read-only over national rollups; carried for
/// event attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralScope {
    pub actor: ActorId,
}

impl AgencyScope {
    pub fn implements(&self, project: &Project) -> bool {
        self.agency_id == project.agency_id
    }
}

impl ReviewerScope {
    pub fn covers(&self, project: &Project) -> bool {
        self.state_id == project.state_id
    }
}
