//! Pure lifecycle transition rules.
//!
//! NOT_STARTED -> IN_PROGRESS on the first approved update,
//! -> COMPLETED when an approved update reaches 100,
//! IN_PROGRESS <-> DELAYED (time-based, reversed by any approved update),
//! SUSPENDED / CANCELLED are administrative and terminal.

use crate::domain::ProjectStatus;

/// Status a project lands in after an update is approved at `new_percent`.
/// Callers must not invoke this for terminal statuses.
pub fn status_after_approval(current: ProjectStatus, new_percent: u8) -> ProjectStatus {
    debug_assert!(current.accepts_updates(), "approval applied in {current}");

    if new_percent >= 100 {
        return ProjectStatus::Completed;
    }
    match current {
        ProjectStatus::NotStarted => ProjectStatus::InProgress,
        ProjectStatus::Delayed => ProjectStatus::InProgress,
        other => other,
    }
}

/// Whether the time-based delay sweep may move this status to DELAYED.
pub fn eligible_for_delay(status: ProjectStatus) -> bool {
    status == ProjectStatus::InProgress
}
