//! Append-only ledger of progress update submissions and their outcomes.
//!
//! The ledger is the source of truth for project state transitions: a
//! project's progress is whatever its most recently APPROVED update claims.
//! Entries are never deleted. Two indexes sit beside the primary map: the
//! per-project append history, and the PENDING index enforcing the
//! one-outstanding-update rule.
//!
//! Mutations for a given project are expected to run inside that project's
//! critical section (the workflow guarantees this); the ledger still
//! re-checks the pending and decided-once rules so it is safe on its own.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::domain::{ActorId, Decision, ProgressUpdate, ProjectId, ReviewDecision, UpdateId};
use crate::errors::WorkflowError;

#[derive(Debug, Default)]
pub struct ProgressUpdateLedger {
    updates: RwLock<HashMap<UpdateId, ProgressUpdate>>,
    /// (project, decision=PENDING) secondary index; at most one entry per
    /// project at any time.
    pending: RwLock<HashMap<ProjectId, UpdateId>>,
    /// Append order per project, oldest first.
    history: RwLock<HashMap<ProjectId, Vec<UpdateId>>>,
}

impl ProgressUpdateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a freshly submitted update in PENDING state. Fails with
    /// `Conflict` when the project already has an outstanding update.
    pub fn append_pending(&self, update: ProgressUpdate) -> Result<UpdateId, WorkflowError> {
        debug_assert!(update.is_pending());

        let mut pending = self.pending.write().expect("pending index poisoned");
        if pending.contains_key(&update.project_id) {
            return Err(WorkflowError::pending_update_exists(&update.project_id));
        }

        let id = update.id;
        pending.insert(update.project_id.clone(), id);
        self.history
            .write()
            .expect("history index poisoned")
            .entry(update.project_id.clone())
            .or_default()
            .push(id);
        self.updates
            .write()
            .expect("update map poisoned")
            .insert(id, update);
        Ok(id)
    }

    pub fn get(&self, id: &UpdateId) -> Option<ProgressUpdate> {
        self.updates
            .read()
            .expect("update map poisoned")
            .get(id)
            .cloned()
    }

    /// Transition an update out of PENDING, exactly once. Returns the decided
    /// entry; a second call for the same id fails with `AlreadyDecided` and
    /// leaves the first outcome untouched.
    pub fn record_decision(
        &self,
        id: &UpdateId,
        verdict: ReviewDecision,
        decided_by: ActorId,
        decided_at: DateTime<Utc>,
        decision_remarks: String,
    ) -> Result<ProgressUpdate, WorkflowError> {
        let mut updates = self.updates.write().expect("update map poisoned");
        let update = updates
            .get_mut(id)
            .ok_or_else(|| WorkflowError::update_not_found(id))?;
        if !update.is_pending() {
            return Err(WorkflowError::AlreadyDecided { update_id: *id });
        }

        update.decision = verdict.into();
        update.decided_by = Some(decided_by);
        update.decided_at = Some(decided_at);
        update.decision_remarks = Some(decision_remarks);

        self.pending
            .write()
            .expect("pending index poisoned")
            .remove(&update.project_id);

        Ok(update.clone())
    }

    pub fn pending_for(&self, project_id: &ProjectId) -> Option<UpdateId> {
        self.pending
            .read()
            .expect("pending index poisoned")
            .get(project_id)
            .copied()
    }

    /// Most recently approved update for a project, if any. Defines the
    /// project's authoritative progress percent.
    pub fn latest_approved(&self, project_id: &ProjectId) -> Option<ProgressUpdate> {
        self.for_project_rev(project_id, |u| u.is_approved())
    }

    /// Latest non-rejected update carrying a fund request. Feeds the
    /// fund-pressure escalation signal.
    pub fn latest_fund_request(&self, project_id: &ProjectId) -> Option<ProgressUpdate> {
        self.for_project_rev(project_id, |u| {
            u.decision != Decision::Rejected && u.fund_requested.is_some()
        })
    }

    /// Full submission history for a project, oldest first.
    pub fn updates_for(&self, project_id: &ProjectId) -> Vec<ProgressUpdate> {
        let history = self.history.read().expect("history index poisoned");
        let updates = self.updates.read().expect("update map poisoned");
        history
            .get(project_id)
            .map(|ids| ids.iter().filter_map(|id| updates.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.updates.read().expect("update map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn for_project_rev(
        &self,
        project_id: &ProjectId,
        matches: impl Fn(&ProgressUpdate) -> bool,
    ) -> Option<ProgressUpdate> {
        let history = self.history.read().expect("history index poisoned");
        let updates = self.updates.read().expect("update map poisoned");
        history
            .get(project_id)?
            .iter()
            .rev()
            .filter_map(|id| updates.get(id))
            .find(|u| matches(u))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgencyId;

    fn pending_update(project: &str, percent: u8, fund: Option<u64>) -> ProgressUpdate {
        ProgressUpdate {
            id: UpdateId::generate(),
            project_id: ProjectId(project.to_string()),
            milestone_number: None,
            submitting_agency_id: AgencyId("AG-PWD-01".to_string()),
            previous_percent: 0,
            requested_percent: percent,
            remarks: "monthly report".to_string(),
            fund_requested: fund,
            fund_justification: fund.map(|_| "material procurement".to_string()),
            submitted_at: Utc::now(),
            decision: Decision::Pending,
            decided_by: None,
            decided_at: None,
            decision_remarks: None,
        }
    }

    fn decide(
        ledger: &ProgressUpdateLedger,
        id: &UpdateId,
        verdict: ReviewDecision,
    ) -> Result<ProgressUpdate, WorkflowError> {
        ledger.record_decision(
            id,
            verdict,
            ActorId("state.tn".to_string()),
            Utc::now(),
            String::new(),
        )
    }

    #[test]
    fn second_pending_for_same_project_conflicts() {
        let ledger = ProgressUpdateLedger::new();
        ledger.append_pending(pending_update("TN-ROAD-001", 20, None)).unwrap();

        let err = ledger
            .append_pending(pending_update("TN-ROAD-001", 30, None))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }));

        // A different project is unaffected.
        ledger.append_pending(pending_update("TN-HOUSE-002", 10, None)).unwrap();
    }

    #[test]
    fn decision_recorded_exactly_once() {
        let ledger = ProgressUpdateLedger::new();
        let id = ledger
            .append_pending(pending_update("TN-ROAD-001", 20, None))
            .unwrap();

        let decided = decide(&ledger, &id, ReviewDecision::Approved).unwrap();
        assert_eq!(decided.decision, Decision::Approved);
        assert!(decided.decided_at.is_some());

        let err = decide(&ledger, &id, ReviewDecision::Rejected).unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyDecided { .. }));

        // First outcome preserved.
        let stored = ledger.get(&id).unwrap();
        assert_eq!(stored.decision, Decision::Approved);
    }

    #[test]
    fn deciding_clears_the_pending_index() {
        let ledger = ProgressUpdateLedger::new();
        let project = ProjectId("TN-ROAD-001".to_string());
        let id = ledger
            .append_pending(pending_update("TN-ROAD-001", 20, None))
            .unwrap();
        assert_eq!(ledger.pending_for(&project), Some(id));

        decide(&ledger, &id, ReviewDecision::Rejected).unwrap();
        assert_eq!(ledger.pending_for(&project), None);

        // Room for the next submission.
        ledger.append_pending(pending_update("TN-ROAD-001", 20, None)).unwrap();
    }

    #[test]
    fn latest_approved_walks_history_backwards() {
        let ledger = ProgressUpdateLedger::new();
        let project = ProjectId("TN-ROAD-001".to_string());

        let first = ledger
            .append_pending(pending_update("TN-ROAD-001", 20, None))
            .unwrap();
        decide(&ledger, &first, ReviewDecision::Approved).unwrap();

        let second = ledger
            .append_pending(pending_update("TN-ROAD-001", 60, None))
            .unwrap();
        decide(&ledger, &second, ReviewDecision::Rejected).unwrap();

        let latest = ledger.latest_approved(&project).unwrap();
        assert_eq!(latest.id, first);
        assert_eq!(latest.requested_percent, 20);
    }

    #[test]
    fn latest_fund_request_ignores_rejected() {
        let ledger = ProgressUpdateLedger::new();
        let project = ProjectId("TN-ROAD-001".to_string());

        let funded = ledger
            .append_pending(pending_update("TN-ROAD-001", 20, Some(200_000)))
            .unwrap();
        decide(&ledger, &funded, ReviewDecision::Approved).unwrap();

        let rejected = ledger
            .append_pending(pending_update("TN-ROAD-001", 40, Some(900_000)))
            .unwrap();
        decide(&ledger, &rejected, ReviewDecision::Rejected).unwrap();

        let signal = ledger.latest_fund_request(&project).unwrap();
        assert_eq!(signal.id, funded);
        assert_eq!(signal.fund_requested, Some(200_000));
    }

    #[test]
    fn history_preserves_append_order() {
        let ledger = ProgressUpdateLedger::new();
        let project = ProjectId("TN-ROAD-001".to_string());

        let first = ledger
            .append_pending(pending_update("TN-ROAD-001", 20, None))
            .unwrap();
        decide(&ledger, &first, ReviewDecision::Approved).unwrap();
        let second = ledger
            .append_pending(pending_update("TN-ROAD-001", 40, None))
            .unwrap();

        let all = ledger.updates_for(&project);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first);
        assert_eq!(all[1].id, second);
    }
}
