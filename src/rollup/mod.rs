//! Dashboard aggregation over the project store and update ledger.
//!
//! Every summary is a pure snapshot function of current state: a full scan
//! that reads each project once, inside its lock cell, so a project mid-
//! mutation is never observed half-written. No running counters exist that
//! could drift from the source data. Locks are held per project only for the
//! duration of one clone, never across the whole scan.

pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::config::EscalationConfig;
use crate::domain::{AgencyId, Project, ProjectStatus, StateId};
use crate::ledger::ProgressUpdateLedger;
use crate::store::ProjectStore;

pub use types::{
    AgencySummary, Escalation, EscalationReason, FundTotals, NationalSummary, NationalTotals,
    StateSummary, StatusCounts,
};

pub struct RollupAggregator {
    store: Arc<ProjectStore>,
    ledger: Arc<ProgressUpdateLedger>,
    escalation: EscalationConfig,
}

/// Point-in-time read of one project plus the ledger facts the dashboards
/// need, captured together under the project's lock.
struct ProjectView {
    project: Project,
    has_pending: bool,
    live_fund_request: Option<u64>,
}

impl RollupAggregator {
    pub fn new(store: Arc<ProjectStore>, ledger: Arc<ProgressUpdateLedger>) -> Self {
        Self {
            store,
            ledger,
            escalation: EscalationConfig::default(),
        }
    }

    pub fn with_escalation(mut self, escalation: EscalationConfig) -> Self {
        self.escalation = escalation;
        self
    }

    /// Aggregate every project of one state.
    pub async fn state_summary(&self, state_id: &StateId) -> StateSummary {
        let views = self.snapshots().await;
        let state_views: Vec<&ProjectView> = views
            .iter()
            .filter(|v| v.project.state_id == *state_id)
            .collect();
        summarize_state(state_id.clone(), &state_views)
    }

    /// National rollup: per-state summaries, overall totals and the ranked
    /// escalation list for central oversight.
    pub async fn national_summary(&self) -> NationalSummary {
        let views = self.snapshots().await;

        let mut by_state: BTreeMap<String, Vec<&ProjectView>> = BTreeMap::new();
        for view in &views {
            by_state
                .entry(view.project.state_id.0.clone())
                .or_default()
                .push(view);
        }

        let states: Vec<StateSummary> = by_state
            .iter()
            .map(|(state, group)| summarize_state(StateId(state.clone()), group))
            .collect();

        let mut by_status = StatusCounts::default();
        let mut funds = FundTotals::default();
        for summary in &states {
            by_status.merge(&summary.by_status);
            funds.merge(&summary.funds);
        }
        let total_projects = views.len() as u64;
        let totals = NationalTotals {
            total_states: states.len() as u64,
            total_projects,
            by_status,
            completion_rate: rate(by_status.completed, total_projects),
            utilization_rate: funds.utilization_rate(),
            funds,
        };

        let top_escalations = self.escalations(&views);

        info!(
            total_states = totals.total_states,
            total_projects = totals.total_projects,
            escalations = top_escalations.len(),
            "National summary computed"
        );

        NationalSummary {
            states,
            totals,
            top_escalations,
        }
    }

    /// Aggregate the projects implemented by one agency.
    pub async fn agency_summary(&self, agency_id: &AgencyId) -> AgencySummary {
        let views = self.snapshots().await;
        let mut by_status = StatusCounts::default();
        let mut funds = FundTotals::default();
        let mut pending_updates = 0;
        let mut progress_sum: u64 = 0;
        let mut total = 0u64;

        for view in views.iter().filter(|v| v.project.agency_id == *agency_id) {
            total += 1;
            by_status.record(view.project.status);
            funds.merge(&fund_totals(&view.project));
            progress_sum += view.project.progress_percent as u64;
            if view.has_pending {
                pending_updates += 1;
            }
        }

        AgencySummary {
            agency_id: agency_id.clone(),
            total_projects: total,
            by_status,
            average_progress: if total == 0 {
                0.0
            } else {
                progress_sum as f64 / total as f64
            },
            funds,
            pending_updates,
        }
    }

    /// One consistent view per project. The ledger facts are read while the
    /// project's lock is held so progress and pending state line up.
    async fn snapshots(&self) -> Vec<ProjectView> {
        let mut views = Vec::new();
        for (project_id, cell) in self.store.cells() {
            let guard = cell.lock().await;
            let project = guard.clone();
            let has_pending = self.ledger.pending_for(&project_id).is_some();
            let live_fund_request = self
                .ledger
                .latest_fund_request(&project_id)
                .and_then(|u| u.fund_requested);
            drop(guard);
            views.push(ProjectView {
                project,
                has_pending,
                live_fund_request,
            });
        }
        views
    }

    fn escalations(&self, views: &[ProjectView]) -> Vec<Escalation> {
        let today = Utc::now().date_naive();
        let mut escalations: Vec<Escalation> = Vec::new();

        for view in views {
            let project = &view.project;
            if project.status == ProjectStatus::Delayed {
                let days_overdue = project
                    .active_milestone()
                    .map(|m| (today - m.target_date).num_days().max(0))
                    .unwrap_or(0);
                escalations.push(Escalation {
                    project_id: project.project_id.clone(),
                    state_id: project.state_id.clone(),
                    project_name: project.name.clone(),
                    reason: EscalationReason::Delayed { days_overdue },
                });
                continue;
            }

            if project.status.is_terminal() {
                continue;
            }
            if let Some(requested) = view.live_fund_request {
                let headroom = project.remaining_allocation();
                if requested as f64 > self.escalation.fund_pressure_ratio * headroom as f64 {
                    escalations.push(Escalation {
                        project_id: project.project_id.clone(),
                        state_id: project.state_id.clone(),
                        project_name: project.name.clone(),
                        reason: EscalationReason::FundPressure {
                            requested,
                            headroom,
                        },
                    });
                }
            }
        }

        escalations.sort_by(|a, b| {
            let (band_a, magnitude_a) = a.rank();
            let (band_b, magnitude_b) = b.rank();
            band_a.cmp(&band_b).then(magnitude_b.cmp(&magnitude_a))
        });
        escalations.truncate(self.escalation.max_escalations);
        escalations
    }
}

fn summarize_state(state_id: StateId, views: &[&ProjectView]) -> StateSummary {
    let mut by_status = StatusCounts::default();
    let mut funds = FundTotals::default();
    let mut target_beneficiaries = 0;
    let mut actual_beneficiaries = 0;
    let mut pending_approvals = 0;

    for view in views {
        by_status.record(view.project.status);
        funds.merge(&fund_totals(&view.project));
        target_beneficiaries += view.project.target_beneficiaries;
        actual_beneficiaries += view.project.actual_beneficiaries;
        if view.has_pending {
            pending_approvals += 1;
        }
    }

    let total_projects = views.len() as u64;
    StateSummary {
        state_id,
        total_projects,
        by_status,
        completion_rate: rate(by_status.completed, total_projects),
        utilization_rate: funds.utilization_rate(),
        funds,
        target_beneficiaries,
        actual_beneficiaries,
        pending_approvals,
    }
}

fn fund_totals(project: &Project) -> FundTotals {
    FundTotals {
        total_budget: project.total_budget,
        total_allocated: project.total_allocated,
        total_released: project.total_released,
        total_spent: project.total_spent,
    }
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Compact Indian-currency rendering for log lines and escalation text:
/// crores above 1,00,00,000, lakhs above 1,00,000, thousands below that.
pub fn format_inr(amount: u64) -> String {
    if amount >= 10_000_000 {
        format!("₹{:.2} Cr", amount as f64 / 10_000_000.0)
    } else if amount >= 100_000 {
        format!("₹{:.2} L", amount as f64 / 100_000.0)
    } else if amount >= 1_000 {
        format!("₹{:.1}K", amount as f64 / 1_000.0)
    } else {
        format!("₹{amount}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ProgressUpdateLedger;

    #[test]
    fn format_inr_picks_the_right_unit() {
        assert_eq!(format_inr(0), "₹0");
        assert_eq!(format_inr(950), "₹950");
        assert_eq!(format_inr(5_000), "₹5.0K");
        assert_eq!(format_inr(250_000), "₹2.50 L");
        assert_eq!(format_inr(12_500_000), "₹1.25 Cr");
    }

    #[test]
    fn empty_scope_rates_are_zero_not_nan() {
        tokio_test::block_on(async {
            let aggregator = RollupAggregator::new(
                Arc::new(ProjectStore::new()),
                Arc::new(ProgressUpdateLedger::new()),
            );

            let summary = aggregator.state_summary(&StateId("TN".to_string())).await;
            assert_eq!(summary.total_projects, 0);
            assert_eq!(summary.completion_rate, 0.0);
            assert_eq!(summary.utilization_rate, 0.0);

            let national = aggregator.national_summary().await;
            assert_eq!(national.totals.total_states, 0);
            assert_eq!(national.totals.completion_rate, 0.0);
            assert!(national.top_escalations.is_empty());
        });
    }
}
