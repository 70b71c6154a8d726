//! Pipeline orchestrator
//!
//! Runs the gating stages in order, stops at the first invocation failure,
//! reduces the decisions and, unless rejected, builds the POC.
//!
//! # Critical Invariant
//!
//! A POC failure downgrades an otherwise approved run to REJECTED while the
//! gating results already collected stay visible on the run.

use crate::error::PocError;
use crate::gate::DecisionGate;
use crate::invoker::{AgentInvoker, StageRequest};
use crate::observability::Trace;
use crate::stages::Stage;
use crate::types::{PipelineRun, PocArtifact, RunContext, StageResult};
use std::sync::Arc;

/// Sequential stage runner
#[derive(Clone)]
pub struct PipelineOrchestrator {
    invoker: Arc<dyn AgentInvoker>,
    appeal_token_limit: usize,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("strategy", &self.invoker.strategy())
            .field("appeal_token_limit", &self.appeal_token_limit)
            .finish()
    }
}

impl PipelineOrchestrator {
    /// Create a new orchestrator
    #[must_use]
    pub fn new(invoker: Arc<dyn AgentInvoker>, appeal_token_limit: usize) -> Self {
        Self {
            invoker,
            appeal_token_limit,
        }
    }

    /// Invoker in use
    #[inline]
    #[must_use]
    pub fn invoker(&self) -> &Arc<dyn AgentInvoker> {
        &self.invoker
    }

    /// Run the pipeline for one idea
    ///
    /// Never fails: invocation errors become NO_GO results and POC errors
    /// become a REJECTED run.
    pub async fn run(&self, idea: &str, context: &RunContext, trace: &Trace) -> PipelineRun {
        let mut results: Vec<StageResult> = Vec::with_capacity(Stage::GATING.len());

        for stage in Stage::GATING {
            let request = self.request(stage, idea, context, &results);
            let outcome = trace
                .instrument_stage(
                    stage,
                    request.observation_input(),
                    self.invoker.model_label(),
                    self.invoker.invoke(&request),
                )
                .await;
            match outcome {
                Ok(output) => {
                    let result = StageResult::completed(stage, output);
                    tracing::debug!("Stage {} completed with {}", stage, result.decision());
                    results.push(result);
                }
                Err(err) => {
                    tracing::warn!("Stage {} failed: {}", stage, err);
                    results.push(StageResult::failed(stage, &err));
                    break;
                }
            }
        }

        let decision = DecisionGate::evaluate(&results);
        if decision.is_rejected() {
            return PipelineRun::rejected(results);
        }

        let request = self.request(Stage::PocBuilder, idea, context, &results);
        let poc = trace
            .instrument_stage(
                Stage::PocBuilder,
                request.observation_input(),
                self.invoker.model_label(),
                self.build_poc(&request),
            )
            .await;
        match poc {
            Ok(poc) => PipelineRun::approved(decision, results, poc),
            Err(err) => {
                tracing::warn!("POC generation failed: {}", err);
                PipelineRun::poc_failed(results, &err)
            }
        }
    }

    async fn build_poc(&self, request: &StageRequest) -> Result<PocArtifact, PocError> {
        let output = self.invoker.invoke(request).await?;
        PocArtifact::from_output(&output)
    }

    fn request(
        &self,
        stage: Stage,
        idea: &str,
        context: &RunContext,
        results: &[StageResult],
    ) -> StageRequest {
        StageRequest::new(stage, idea, context.clone())
            .with_prior_results(results.to_vec())
            .with_appeal_token_limit(self.appeal_token_limit)
    }
}
