//! Durable record of projects.
//!
//! Each project lives behind its own `tokio::sync::Mutex` cell; that cell is
//! the per-project critical section every workflow mutation runs under, and
//! the unit of snapshot isolation for aggregate reads. The outer map lock is
//! a plain `std::sync::RwLock` held only for map lookups, never across an
//! await point.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{Project, ProjectId};
use crate::errors::{StorageError, WorkflowError};

pub type ProjectCell = Arc<Mutex<Project>>;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug)]
pub struct ProjectStore {
    lock_timeout: Duration,
    projects: RwLock<HashMap<ProjectId, ProjectCell>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            lock_timeout,
            projects: RwLock::new(HashMap::new()),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Register a newly created project. Ids are unique for the lifetime of
    /// the store.
    pub fn insert(&self, project: Project) -> Result<(), WorkflowError> {
        let mut projects = self.projects.write().expect("project map poisoned");
        if projects.contains_key(&project.project_id) {
            return Err(WorkflowError::duplicate_project(&project.project_id));
        }
        projects.insert(
            project.project_id.clone(),
            Arc::new(Mutex::new(project)),
        );
        Ok(())
    }

    pub fn cell(&self, id: &ProjectId) -> Option<ProjectCell> {
        self.projects
            .read()
            .expect("project map poisoned")
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.projects
            .read()
            .expect("project map poisoned")
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.projects.read().expect("project map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All project cells, for full-scan aggregation. Callers lock each cell
    /// briefly to clone a consistent snapshot and must not hold a guard while
    /// visiting the next cell.
    pub fn cells(&self) -> Vec<(ProjectId, ProjectCell)> {
        self.projects
            .read()
            .expect("project map poisoned")
            .iter()
            .map(|(id, cell)| (id.clone(), Arc::clone(cell)))
            .collect()
    }

    /// Acquire a project's exclusive critical section, bounded by `wait`.
    /// Exceeding the bound is a transient storage failure, distinct from any
    /// business error, and eligible for retry with backoff.
    pub async fn acquire(
        cell: ProjectCell,
        project_id: ProjectId,
        wait: Duration,
    ) -> Result<OwnedMutexGuard<Project>, StorageError> {
        match tokio::time::timeout(wait, cell.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => Err(StorageError::LockTimeout {
                project_id,
                waited_ms: wait.as_millis() as u64,
            }),
        }
    }

    /// Clone a point-in-time snapshot of one project.
    pub async fn snapshot(&self, id: &ProjectId) -> Option<Project> {
        let cell = self.cell(id)?;
        let guard = cell.lock().await;
        Some(guard.clone())
    }
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}
