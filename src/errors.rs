use thiserror::Error;

use crate::domain::{ProjectId, ProjectStatus, UpdateId};

/// Storage-layer failures. Only transient ones are eligible for automatic
/// retry; everything else surfaces to the caller unchanged.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("timed out after {waited_ms}ms waiting for the lock on project {project_id}")]
    LockTimeout {
        project_id: ProjectId,
        waited_ms: u64,
    },

    #[error("storage backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("storage invariant violated: {reason}")]
    Corrupted { reason: String },
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::LockTimeout { .. } => true,
            StorageError::Unavailable { .. } => true,
            StorageError::Corrupted { .. } => false,
        }
    }
}

/// Business error taxonomy for workflow operations. Every variant is terminal
/// for the triggering call; the engine never retries these on its own.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed or out-of-range input. The caller must correct and resubmit.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The operation raced with existing state (a pending update, a duplicate
    /// id). The caller must re-fetch current state before retrying.
    #[error("{reason}")]
    Conflict { reason: String },

    /// The update already left PENDING. The first decision's effect stands.
    #[error("update {update_id} has already been decided")]
    AlreadyDecided { update_id: UpdateId },

    /// Caller's resolved scope does not cover the target project.
    #[error("{reason}")]
    Unauthorized { reason: String },

    #[error("unknown {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// The project's lifecycle status does not permit the operation.
    #[error("project {project_id} does not accept this operation while {status}")]
    InvalidState {
        project_id: ProjectId,
        status: ProjectStatus,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        WorkflowError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn pending_update_exists(project_id: &ProjectId) -> Self {
        WorkflowError::Conflict {
            reason: format!("project {project_id} already has a pending update awaiting review"),
        }
    }

    pub(crate) fn duplicate_project(project_id: &ProjectId) -> Self {
        WorkflowError::Conflict {
            reason: format!("project {project_id} already exists"),
        }
    }

    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        WorkflowError::Unauthorized {
            reason: reason.into(),
        }
    }

    pub(crate) fn project_not_found(id: &ProjectId) -> Self {
        WorkflowError::NotFound {
            entity: "project",
            id: id.to_string(),
        }
    }

    pub(crate) fn update_not_found(id: &UpdateId) -> Self {
        WorkflowError::NotFound {
            entity: "update",
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_is_transient() {
        let err = StorageError::LockTimeout {
            project_id: ProjectId("TN-ROAD-001".to_string()),
            waited_ms: 2000,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn workflow_errors_render_their_reason() {
        let err = WorkflowError::validation("requested_percent must not exceed 100");
        assert_eq!(
            err.to_string(),
            "validation failed: requested_percent must not exceed 100"
        );

        let err = WorkflowError::project_not_found(&ProjectId("MH-HSTL-009".to_string()));
        assert_eq!(err.to_string(), "unknown project MH-HSTL-009");
    }
}
