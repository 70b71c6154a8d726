//! Testing utilities for the Studio workspace
//!
//! Scripted invokers, recording recorders, and fixtures.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use studio_core::{
    AgentInvoker, HeuristicInvoker, InvocationError, InvocationStrategy, ObservabilityError,
    ObservabilityRecorder, ObservationEnd, ObservationLevel, ObservationStart, Stage,
    StageDecision, StageOutput, StageRequest, Studio, StudioConfig, Submission, TraceStart,
    TraceUpdate,
};

pub const B2B_IDEA: &str = "B2B SaaS automation for invoicing";

/// Convert a JSON object literal into stage output
pub fn output(value: Value) -> StageOutput {
    match value {
        Value::Object(map) => map,
        other => panic!("stage output fixture must be an object, got {other}"),
    }
}

pub fn b2b_submission() -> Submission {
    Submission::new(B2B_IDEA)
        .with_founder("Ada")
        .with_target_user("Finance teams")
}

pub fn heuristic_studio() -> Studio {
    Studio::new(StudioConfig::default(), Arc::new(HeuristicInvoker::new()))
}

#[derive(Debug, Clone)]
enum Reply {
    Output(StageOutput),
    Decision(StageDecision),
    Fail(InvocationError),
}

/// Invoker answering from a per-stage script
///
/// Unscripted stages answer like the heuristic. Every call is logged.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    replies: HashMap<Stage, Reply>,
    calls: Mutex<Vec<StageRequest>>,
    delay: Option<Duration>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer a stage with fixed output
    #[must_use]
    pub fn with_output(mut self, stage: Stage, output: StageOutput) -> Self {
        self.replies.insert(stage, Reply::Output(output));
        self
    }

    /// Answer a stage with heuristic output carrying another decision
    #[must_use]
    pub fn with_decision(mut self, stage: Stage, decision: StageDecision) -> Self {
        self.replies.insert(stage, Reply::Decision(decision));
        self
    }

    /// Fail a stage
    #[must_use]
    pub fn with_failure(mut self, stage: Stage, error: InvocationError) -> Self {
        self.replies.insert(stage, Reply::Fail(error));
        self
    }

    /// Sleep before every answer
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stages invoked, in order
    pub fn invoked(&self) -> Vec<Stage> {
        self.calls.lock().iter().map(|r| r.stage).collect()
    }

    /// Requests received, in order
    pub fn requests(&self) -> Vec<StageRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl AgentInvoker for ScriptedInvoker {
    fn strategy(&self) -> InvocationStrategy {
        InvocationStrategy::Wrapper
    }

    fn model_label(&self) -> &str {
        "scripted-model"
    }

    async fn invoke(&self, request: &StageRequest) -> Result<StageOutput, InvocationError> {
        self.calls.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.replies.get(&request.stage) {
            Some(Reply::Output(output)) => Ok(output.clone()),
            Some(Reply::Fail(error)) => Err(error.clone()),
            Some(Reply::Decision(decision)) => {
                let mut output = HeuristicInvoker::new().evaluate(request);
                output.insert("decision".into(), Value::from(decision.as_str()));
                Ok(output)
            }
            None => Ok(HeuristicInvoker::new().evaluate(request)),
        }
    }
}

/// One recorder call
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    TraceCreated(TraceStart),
    TraceUpdated(TraceUpdate),
    SpanStarted(ObservationStart),
    SpanEnded(ObservationEnd),
    GenerationStarted(ObservationStart),
    GenerationEnded(ObservationEnd),
}

/// Recorder keeping every call in memory
#[derive(Debug, Default)]
pub struct RecordingRecorder {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    pub fn traces(&self) -> Vec<TraceStart> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::TraceCreated(start) => Some(start.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn trace_updates(&self) -> Vec<TraceUpdate> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::TraceUpdated(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    /// Span names opened, in order
    pub fn span_names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::SpanStarted(start) => Some(start.name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Closed spans, in order
    pub fn span_ends(&self) -> Vec<ObservationEnd> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::SpanEnded(end) => Some(end.clone()),
                _ => None,
            })
            .collect()
    }

    /// Counts of (span starts, span ends, generation starts, generation ends)
    pub fn observation_counts(&self) -> (usize, usize, usize, usize) {
        let events = self.events.lock();
        let count = |f: fn(&Recorded) -> bool| events.iter().filter(|e| f(*e)).count();
        (
            count(|e| matches!(e, Recorded::SpanStarted(_))),
            count(|e| matches!(e, Recorded::SpanEnded(_))),
            count(|e| matches!(e, Recorded::GenerationStarted(_))),
            count(|e| matches!(e, Recorded::GenerationEnded(_))),
        )
    }

    /// Levels of closed spans, in order
    pub fn span_levels(&self) -> Vec<ObservationLevel> {
        self.span_ends().iter().map(|e| e.level).collect()
    }

    fn push(&self, event: Recorded) -> Result<(), ObservabilityError> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObservabilityRecorder for RecordingRecorder {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn trace_created(&self, event: &TraceStart) -> Result<(), ObservabilityError> {
        self.push(Recorded::TraceCreated(event.clone()))
    }

    async fn trace_updated(&self, event: &TraceUpdate) -> Result<(), ObservabilityError> {
        self.push(Recorded::TraceUpdated(event.clone()))
    }

    async fn span_started(&self, event: &ObservationStart) -> Result<(), ObservabilityError> {
        self.push(Recorded::SpanStarted(event.clone()))
    }

    async fn span_ended(&self, event: &ObservationEnd) -> Result<(), ObservabilityError> {
        self.push(Recorded::SpanEnded(event.clone()))
    }

    async fn generation_started(&self, event: &ObservationStart) -> Result<(), ObservabilityError> {
        self.push(Recorded::GenerationStarted(event.clone()))
    }

    async fn generation_ended(&self, event: &ObservationEnd) -> Result<(), ObservabilityError> {
        self.push(Recorded::GenerationEnded(event.clone()))
    }
}

/// Recorder failing every call
#[derive(Debug, Default)]
pub struct FailingRecorder;

#[async_trait::async_trait]
impl ObservabilityRecorder for FailingRecorder {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn trace_created(&self, _event: &TraceStart) -> Result<(), ObservabilityError> {
        Err(ObservabilityError::Rejected(500))
    }

    async fn trace_updated(&self, _event: &TraceUpdate) -> Result<(), ObservabilityError> {
        Err(ObservabilityError::Rejected(500))
    }

    async fn span_started(&self, _event: &ObservationStart) -> Result<(), ObservabilityError> {
        Err(ObservabilityError::Transport("unreachable".into()))
    }

    async fn span_ended(&self, _event: &ObservationEnd) -> Result<(), ObservabilityError> {
        Err(ObservabilityError::Transport("unreachable".into()))
    }

    async fn generation_started(&self, _event: &ObservationStart) -> Result<(), ObservabilityError> {
        Err(ObservabilityError::Transport("unreachable".into()))
    }

    async fn generation_ended(&self, _event: &ObservationEnd) -> Result<(), ObservabilityError> {
        Err(ObservabilityError::Transport("unreachable".into()))
    }
}

/// Recorder stalling on every call
#[derive(Debug)]
pub struct SlowRecorder {
    pub delay: Duration,
}

impl SlowRecorder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    async fn stall(&self) -> Result<(), ObservabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObservabilityRecorder for SlowRecorder {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn trace_created(&self, _event: &TraceStart) -> Result<(), ObservabilityError> {
        self.stall().await
    }

    async fn trace_updated(&self, _event: &TraceUpdate) -> Result<(), ObservabilityError> {
        self.stall().await
    }

    async fn span_started(&self, _event: &ObservationStart) -> Result<(), ObservabilityError> {
        self.stall().await
    }

    async fn span_ended(&self, _event: &ObservationEnd) -> Result<(), ObservabilityError> {
        self.stall().await
    }

    async fn generation_started(&self, _event: &ObservationStart) -> Result<(), ObservabilityError> {
        self.stall().await
    }

    async fn generation_ended(&self, _event: &ObservationEnd) -> Result<(), ObservabilityError> {
        self.stall().await
    }
}
