use proptest::prelude::*;
use studio_core::{DecisionGate, OverallDecision, Stage, StageDecision, StageResult};
use studio_test_utils::output;

const ALL: [StageDecision; 3] = [
    StageDecision::Go,
    StageDecision::ConditionalGo,
    StageDecision::NoGo,
];

fn expected(decisions: &[StageDecision]) -> OverallDecision {
    if decisions.contains(&StageDecision::NoGo) {
        OverallDecision::Rejected
    } else if decisions.contains(&StageDecision::ConditionalGo) {
        OverallDecision::ConditionalApproval
    } else {
        OverallDecision::Approved
    }
}

fn results(decisions: &[StageDecision]) -> Vec<StageResult> {
    Stage::GATING
        .iter()
        .zip(decisions)
        .map(|(stage, decision)| {
            StageResult::completed(*stage, output(serde_json::json!({ "decision": decision })))
        })
        .collect()
}

fn decision_strategy() -> impl Strategy<Value = StageDecision> {
    prop_oneof![
        Just(StageDecision::Go),
        Just(StageDecision::ConditionalGo),
        Just(StageDecision::NoGo),
    ]
}

#[test]
fn test_every_combination_of_four_stages() {
    let mut checked = 0;
    for a in ALL {
        for b in ALL {
            for c in ALL {
                for d in ALL {
                    let decisions = [a, b, c, d];
                    assert_eq!(
                        DecisionGate::evaluate(&results(&decisions)),
                        expected(&decisions),
                        "decisions {decisions:?}"
                    );
                    checked += 1;
                }
            }
        }
    }
    assert_eq!(checked, 81);
}

#[test]
fn test_single_failure_rejects_partial_run() {
    let failed = StageResult::failed(
        Stage::EconomicJudge,
        &studio_core::InvocationError::Transport("down".into()),
    );
    assert_eq!(DecisionGate::evaluate(&[failed]), OverallDecision::Rejected);
}

proptest! {
    #[test]
    fn prop_gate_is_order_independent(
        decisions in proptest::collection::vec(decision_strategy(), 0..8)
    ) {
        let forward = DecisionGate::reduce(decisions.iter().copied());
        let backward = DecisionGate::reduce(decisions.iter().rev().copied());
        prop_assert_eq!(forward, backward);
        prop_assert_eq!(forward, expected(&decisions));
    }

    #[test]
    fn prop_unknown_raw_decisions_condition(raw in "[a-z ]{0,12}") {
        let value = serde_json::Value::from(raw.clone());
        let parsed = StageDecision::normalize(Some(&value));
        let known = ["go", "conditional_go", "no_go"];
        if !known.contains(&raw.as_str()) {
            prop_assert_eq!(parsed, StageDecision::ConditionalGo);
        }
    }
}
