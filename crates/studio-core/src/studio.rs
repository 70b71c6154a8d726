//! Studio facade
//!
//! Entry point for the three flows: submit, appeal and paid override. Input
//! is validated before any trace is opened or any stage runs.

use crate::appeal::{AppealController, AppealOutcome};
use crate::config::StudioConfig;
use crate::error::StudioError;
use crate::invoker::{AgentInvoker, InvocationStrategy};
use crate::observability::{NoopRecorder, ObservabilityRecorder, Trace, TraceFlow};
use crate::overrides::{OverrideReceipt, OverrideRegistry, OverrideStore};
use crate::pipeline::PipelineOrchestrator;
use crate::types::{OverrideRecord, PipelineRun, Submission};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Outcome of an idea submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    /// The run
    #[serde(flatten)]
    pub run: PipelineRun,
    /// Configured appeal limit, for the caller's appeal form
    pub appeal_token_limit: usize,
}

/// The studio
///
/// Owns the pipeline, the appeal controller and the override ledger.
#[derive(Clone)]
pub struct Studio {
    config: StudioConfig,
    pipeline: PipelineOrchestrator,
    appeals: AppealController,
    overrides: OverrideRegistry,
    recorder: Arc<dyn ObservabilityRecorder>,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("overrides", &self.overrides)
            .field("observability", &self.recorder.is_enabled())
            .finish()
    }
}

impl Studio {
    /// Create a studio with an in-memory ledger and no observability
    #[must_use]
    pub fn new(config: StudioConfig, invoker: Arc<dyn AgentInvoker>) -> Self {
        Self {
            pipeline: PipelineOrchestrator::new(invoker, config.appeal_token_limit),
            appeals: AppealController::new(config.appeal_token_limit),
            overrides: OverrideRegistry::default(),
            recorder: Arc::new(NoopRecorder),
            config,
        }
    }

    /// With observability recorder
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ObservabilityRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// With override store
    #[must_use]
    pub fn with_override_store(mut self, store: Arc<dyn OverrideStore>) -> Self {
        self.overrides = OverrideRegistry::new(store);
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Active invocation strategy
    #[must_use]
    pub fn strategy(&self) -> InvocationStrategy {
        self.pipeline.invoker().strategy()
    }

    /// Whether observability is enabled
    #[must_use]
    pub fn observability_enabled(&self) -> bool {
        self.recorder.is_enabled()
    }

    /// Recorded override requests, newest first
    #[must_use]
    pub fn override_records(&self) -> Vec<OverrideRecord> {
        self.overrides.records()
    }

    /// Evaluate an idea
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionOutcome, StudioError> {
        let submission = submission.normalized()?;
        let input = json!({
            "idea": submission.idea,
            "founderName": submission.founder_name,
            "targetUser": submission.target_user,
        });
        tracing::info!("Evaluating idea for '{}'", submission.founder_name);

        let trace = self.open_trace(TraceFlow::Submit, input).await;
        let run = self
            .pipeline
            .run(&submission.idea, &submission.context(), &trace)
            .await;
        trace.update(json!(run), None).await;

        tracing::info!("Run finished: {} ({} stages)", run.decision(), run.stages().len());
        Ok(SubmissionOutcome {
            run,
            appeal_token_limit: self.config.appeal_token_limit,
        })
    }

    /// Re-evaluate an idea with an appeal argument
    ///
    /// Over-budget appeals are rejected before any stage runs.
    pub async fn appeal(
        &self,
        submission: Submission,
        appeal_text: &str,
    ) -> Result<AppealOutcome, StudioError> {
        let screened = self.appeals.screen(submission, appeal_text)?;
        let input = json!({
            "idea": screened.submission().idea,
            "founderName": screened.submission().founder_name,
            "targetUser": screened.submission().target_user,
            "appeal": screened.submission().appeal,
        });

        let trace = self.open_trace(TraceFlow::Appeal, input).await;
        let outcome = self.appeals.run(&self.pipeline, screened, &trace).await;
        trace
            .update(json!(outcome.run), Some(json!({ "appealMode": true })))
            .await;
        Ok(outcome)
    }

    /// Record a paid-override request
    pub async fn request_override(
        &self,
        submission: Submission,
        contact_email: &str,
        notes: &str,
    ) -> Result<OverrideReceipt, StudioError> {
        let record = self.overrides.record(submission, contact_email, notes)?;
        let trace = self.open_trace(TraceFlow::Override, json!(record)).await;
        trace
            .update(json!({ "accepted": true, "recordId": record.id.to_string() }), None)
            .await;
        Ok(OverrideRegistry::receipt(record))
    }

    async fn open_trace(&self, flow: TraceFlow, input: serde_json::Value) -> Trace {
        Trace::open(
            self.recorder.clone(),
            self.config.recorder_budget(),
            flow,
            input,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::HeuristicInvoker;
    use crate::types::OverallDecision;

    fn studio() -> Studio {
        Studio::new(StudioConfig::default(), Arc::new(HeuristicInvoker::new()))
    }

    #[tokio::test]
    async fn submit_reports_appeal_limit() {
        let outcome = studio()
            .submit(Submission::new("B2B SaaS automation for invoicing"))
            .await
            .unwrap();
        assert_eq!(outcome.appeal_token_limit, 220);
        let wire = serde_json::to_value(&outcome).unwrap();
        assert_eq!(wire["decision"], "APPROVED");
        assert_eq!(wire["appealTokenLimit"], 220);
    }

    #[tokio::test]
    async fn empty_idea_is_rejected() {
        let err = studio().submit(Submission::new("  ")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "idea is required");
    }

    #[tokio::test]
    async fn appeal_over_budget_reports_usage() {
        let studio = Studio::new(
            StudioConfig::default().with_appeal_token_limit(1),
            Arc::new(HeuristicInvoker::new()),
        );
        let err = studio
            .appeal(Submission::new("idea"), "more than four chars")
            .await
            .unwrap_err();
        assert_eq!(err.appeal_budget(), Some((5, 1)));
    }

    #[tokio::test]
    async fn appeal_signal_lifts_conditional_run() {
        let idea = "A cozy board game cafe";
        let first = studio().submit(Submission::new(idea)).await.unwrap();
        assert_eq!(first.run.decision(), OverallDecision::ConditionalApproval);

        let outcome = studio()
            .appeal(Submission::new(idea), "Bookings run as SaaS")
            .await
            .unwrap();
        assert!(outcome.appeal_accepted);
        assert_eq!(outcome.run.decision(), OverallDecision::Approved);
        assert_eq!(outcome.appeal_tokens_used, 5);
    }

    #[tokio::test]
    async fn override_is_recorded() {
        let studio = studio();
        let receipt = studio
            .request_override(Submission::new("idea"), "founder@example.com", "")
            .await
            .unwrap();
        assert!(receipt.accepted);
        assert_eq!(studio.override_records().len(), 1);
        assert_eq!(studio.override_records()[0].id, receipt.record.id);
    }
}
