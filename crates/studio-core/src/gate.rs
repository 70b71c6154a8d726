//! Decision gate
//!
//! Reduces gating-stage decisions to one overall verdict. Precedence is
//! strict: any NO_GO rejects, otherwise any CONDITIONAL_GO conditions,
//! otherwise the run is approved.

use crate::types::{OverallDecision, StageDecision, StageResult};

/// Pure reducer over stage decisions
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionGate;

impl DecisionGate {
    /// Evaluate the gating results of a run
    ///
    /// Results from non-gating stages are ignored.
    #[must_use]
    pub fn evaluate(results: &[StageResult]) -> OverallDecision {
        Self::reduce(
            results
                .iter()
                .filter(|r| r.stage().is_gating())
                .map(StageResult::decision),
        )
    }

    /// Reduce a sequence of decisions
    ///
    /// An empty sequence is approved.
    #[must_use]
    pub fn reduce(decisions: impl IntoIterator<Item = StageDecision>) -> OverallDecision {
        let mut conditional = false;
        for decision in decisions {
            match decision {
                StageDecision::NoGo => return OverallDecision::Rejected,
                StageDecision::ConditionalGo => conditional = true,
                StageDecision::Go => {}
            }
        }
        if conditional {
            OverallDecision::ConditionalApproval
        } else {
            OverallDecision::Approved
        }
    }
}
