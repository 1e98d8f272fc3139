//! Property tests for the ledger/store invariants: progress is monotonic and
//! equals the latest approved claim, and released funds never exceed the
//! allocation, for any sequence of submissions and decisions.

mod common;

use common::*;
use pragati_engine::{ReviewDecision, WorkflowError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Op {
    percent: u8,
    fund: Option<u64>,
    approve: bool,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (0u8..=110, prop::option::of(1u64..1_500_000), any::<bool>()).prop_map(
        |(percent, fund, approve)| Op {
            percent,
            fund,
            approve,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn progress_monotonic_and_release_bounded(ops in prop::collection::vec(op_strategy(), 0..24)) {
        tokio_test::block_on(async move {
            let h = harness();
            let reviewer = reviewer("TN");
            let agency = agency("AG-PWD-01", "TN");
            let project_id = h
                .workflow
                .create_project(&reviewer, project_input("TN-ROAD-001", "AG-PWD-01", 1_000_000))
                .await
                .unwrap();

            // Reference model the engine must agree with.
            let mut model_progress: u8 = 0;
            let mut model_released: u64 = 0;
            let allocated: u64 = 1_000_000;

            for op in ops {
                let request = match op.fund {
                    Some(fund) => funded_submission(&project_id, op.percent, fund),
                    None => submission(&project_id, op.percent),
                };
                let submitted = h.workflow.submit_progress_update(&agency, request).await;

                if op.percent > 100 {
                    assert!(
                        matches!(submitted, Err(WorkflowError::Validation { .. })),
                        "out-of-range submission must fail validation"
                    );
                    continue;
                }
                if model_progress >= 100 {
                    // Completed projects accept nothing further.
                    assert!(matches!(submitted, Err(WorkflowError::InvalidState { .. })));
                    continue;
                }
                if op.percent < model_progress {
                    assert!(
                        matches!(submitted, Err(WorkflowError::Validation { .. })),
                        "regressing submission must fail validation"
                    );
                    continue;
                }
                let update_id = submitted.unwrap();

                let decision = if op.approve {
                    ReviewDecision::Approved
                } else {
                    ReviewDecision::Rejected
                };
                h.workflow
                    .decide(&reviewer, &update_id, decision, String::new())
                    .await
                    .unwrap();

                if op.approve {
                    model_progress = op.percent;
                    if let Some(fund) = op.fund {
                        model_released += fund.min(allocated - model_released);
                    }
                }

                let project = h.store.snapshot(&project_id).await.unwrap();
                assert_eq!(project.progress_percent, model_progress);
                assert_eq!(project.total_released, model_released);
                assert!(project.total_released <= project.total_allocated);
            }

            // The project's progress is exactly the latest approved claim.
            let project = h.store.snapshot(&project_id).await.unwrap();
            match h.ledger.latest_approved(&project_id) {
                Some(update) => assert_eq!(project.progress_percent, update.requested_percent),
                None => assert_eq!(project.progress_percent, 0),
            }
        });
    }
}
