//! Observability seam
//!
//! The core opens one trace per flow and one span plus one generation per
//! attempted stage. Every recorder call is best-effort: failures and budget
//! overruns are logged at debug level and discarded, so a broken or slow
//! recorder never changes a run.

use crate::error::ObservabilityError;
use crate::stages::Stage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Status message attached to successful observations
pub const STATUS_OK: &str = "ok";

/// Status message used when a stage future is dropped before finishing
pub const STATUS_CANCELLED: &str = "stage cancelled before completion";

/// Flow a trace belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceFlow {
    /// Initial idea submission
    Submit,
    /// Appeal re-run
    Appeal,
    /// Paid override request
    Override,
}

impl TraceFlow {
    /// Trace name
    #[must_use]
    pub fn trace_name(self) -> &'static str {
        match self {
            TraceFlow::Submit => "idea_to_poc_pipeline",
            TraceFlow::Appeal => "idea_appeal_pipeline",
            TraceFlow::Override => "paid_override_request",
        }
    }

    /// Short flow label carried in trace metadata
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TraceFlow::Submit => "submit",
            TraceFlow::Appeal => "appeal",
            TraceFlow::Override => "paid_override",
        }
    }
}

/// Trace creation event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStart {
    /// Trace ID
    pub id: Uuid,
    /// Trace name
    pub name: String,
    /// Flow input
    pub input: Value,
    /// Free-form metadata
    pub metadata: Value,
}

/// Trace update event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceUpdate {
    /// Trace ID
    pub id: Uuid,
    /// Final output or `{error}`
    pub output: Value,
    /// Extra metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Span or generation creation event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationStart {
    /// Observation ID
    pub id: Uuid,
    /// Owning trace
    pub trace_id: Uuid,
    /// Observation name
    pub name: String,
    /// Observation input
    pub input: Value,
    /// Model label, generations only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Start time
    pub start_time: DateTime<Utc>,
}

/// Observation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationLevel {
    /// Normal completion
    Default,
    /// Failed stage
    Error,
}

/// Span or generation close event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationEnd {
    /// Observation ID
    pub id: Uuid,
    /// Owning trace
    pub trace_id: Uuid,
    /// Output or `{error}`
    pub output: Value,
    /// Severity
    pub level: ObservationLevel,
    /// Status message
    pub status_message: String,
    /// End time
    pub end_time: DateTime<Utc>,
}

/// Observability recorder trait
///
/// Implement this trait to ship traces to a backend. Errors are logged and
/// discarded by the caller.
#[async_trait::async_trait]
pub trait ObservabilityRecorder: Send + Sync {
    /// Whether the recorder does anything
    fn is_enabled(&self) -> bool;

    /// A trace was opened
    async fn trace_created(&self, event: &TraceStart) -> Result<(), ObservabilityError>;

    /// A trace received its final output
    async fn trace_updated(&self, event: &TraceUpdate) -> Result<(), ObservabilityError>;

    /// A span was opened
    async fn span_started(&self, event: &ObservationStart) -> Result<(), ObservabilityError>;

    /// A span was closed
    async fn span_ended(&self, event: &ObservationEnd) -> Result<(), ObservabilityError>;

    /// A generation was opened
    async fn generation_started(&self, event: &ObservationStart) -> Result<(), ObservabilityError>;

    /// A generation was closed
    async fn generation_ended(&self, event: &ObservationEnd) -> Result<(), ObservabilityError>;
}

/// Recorder that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

#[async_trait::async_trait]
impl ObservabilityRecorder for NoopRecorder {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn trace_created(&self, _event: &TraceStart) -> Result<(), ObservabilityError> {
        Ok(())
    }

    async fn trace_updated(&self, _event: &TraceUpdate) -> Result<(), ObservabilityError> {
        Ok(())
    }

    async fn span_started(&self, _event: &ObservationStart) -> Result<(), ObservabilityError> {
        Ok(())
    }

    async fn span_ended(&self, _event: &ObservationEnd) -> Result<(), ObservabilityError> {
        Ok(())
    }

    async fn generation_started(&self, _event: &ObservationStart) -> Result<(), ObservabilityError> {
        Ok(())
    }

    async fn generation_ended(&self, _event: &ObservationEnd) -> Result<(), ObservabilityError> {
        Ok(())
    }
}

/// Handle to an open trace
#[derive(Clone)]
pub struct Trace {
    recorder: Arc<dyn ObservabilityRecorder>,
    id: Uuid,
    budget: Duration,
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("id", &self.id)
            .field("enabled", &self.recorder.is_enabled())
            .field("budget", &self.budget)
            .finish()
    }
}

impl Trace {
    /// Open a trace for a flow
    pub async fn open(
        recorder: Arc<dyn ObservabilityRecorder>,
        budget: Duration,
        flow: TraceFlow,
        input: Value,
    ) -> Self {
        let trace = Self {
            recorder,
            id: Uuid::new_v4(),
            budget,
        };
        let event = TraceStart {
            id: trace.id,
            name: flow.trace_name().to_string(),
            input,
            metadata: json!({ "flow": flow.label() }),
        };
        trace
            .deliver("trace-create", trace.recorder.trace_created(&event))
            .await;
        trace
    }

    /// Trace ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Record the flow's final output
    pub async fn update(&self, output: Value, metadata: Option<Value>) {
        let event = TraceUpdate {
            id: self.id,
            output,
            metadata,
        };
        self.deliver("trace-update", self.recorder.trace_updated(&event))
            .await;
    }

    /// Run a stage inside a span and a generation
    ///
    /// Both observations are closed exactly once: with the serialized output
    /// on success, with level ERROR on failure, and from the guard's `Drop`
    /// when the returned future is dropped early.
    pub async fn instrument_stage<T, E, F>(
        &self,
        stage: Stage,
        input: Value,
        model: &str,
        work: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        T: Serialize,
        E: fmt::Display,
    {
        let observation = self.open_stage(stage, input, model).await;
        let result = work.await;
        match &result {
            Ok(output) => {
                let output = serde_json::to_value(output).unwrap_or(Value::Null);
                observation.succeed(output).await;
            }
            Err(err) => observation.fail(&err.to_string()).await,
        }
        result
    }

    /// Open a span and a generation for a stage
    pub async fn open_stage(&self, stage: Stage, input: Value, model: &str) -> StageObservation {
        let span = ObservationStart {
            id: Uuid::new_v4(),
            trace_id: self.id,
            name: stage.name().to_string(),
            input: input.clone(),
            model: None,
            start_time: Utc::now(),
        };
        let generation = ObservationStart {
            id: Uuid::new_v4(),
            trace_id: self.id,
            name: stage.generation_name(),
            input,
            model: Some(model.to_string()),
            start_time: Utc::now(),
        };
        let observation = StageObservation {
            trace: self.clone(),
            ids: Some(ObservationIds {
                span: span.id,
                generation: generation.id,
            }),
        };
        self.deliver("span-create", self.recorder.span_started(&span))
            .await;
        self.deliver("generation-create", self.recorder.generation_started(&generation))
            .await;
        observation
    }

    async fn close(&self, ids: ObservationIds, output: Value, level: ObservationLevel, status: String) {
        let generation = ObservationEnd {
            id: ids.generation,
            trace_id: self.id,
            output: output.clone(),
            level,
            status_message: status.clone(),
            end_time: Utc::now(),
        };
        let span = ObservationEnd {
            id: ids.span,
            trace_id: self.id,
            output,
            level,
            status_message: status,
            end_time: Utc::now(),
        };
        self.deliver("generation-update", self.recorder.generation_ended(&generation))
            .await;
        self.deliver("span-update", self.recorder.span_ended(&span))
            .await;
    }

    async fn deliver<F>(&self, event: &'static str, call: F)
    where
        F: Future<Output = Result<(), ObservabilityError>>,
    {
        if !self.recorder.is_enabled() {
            return;
        }
        match tokio::time::timeout(self.budget, call).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!("Observability {} for trace {} dropped: {}", event, self.id, err);
            }
            Err(_) => {
                let err = ObservabilityError::Budget(
                    u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX),
                );
                tracing::debug!("Observability {} for trace {} dropped: {}", event, self.id, err);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ObservationIds {
    span: Uuid,
    generation: Uuid,
}

/// Open span and generation for one stage
///
/// Closed by [`succeed`](Self::succeed) or [`fail`](Self::fail). If dropped
/// while still open, an ERROR close is spawned on the current runtime.
#[derive(Debug)]
pub struct StageObservation {
    trace: Trace,
    ids: Option<ObservationIds>,
}

impl StageObservation {
    /// Close with the stage output
    pub async fn succeed(mut self, output: Value) {
        if let Some(ids) = self.disarm() {
            self.trace
                .close(ids, output, ObservationLevel::Default, STATUS_OK.to_string())
                .await;
        }
    }

    /// Close with an error
    pub async fn fail(mut self, reason: &str) {
        if let Some(ids) = self.disarm() {
            self.trace
                .close(
                    ids,
                    json!({ "error": reason }),
                    ObservationLevel::Error,
                    reason.to_string(),
                )
                .await;
        }
    }

    fn disarm(&mut self) -> Option<ObservationIds> {
        self.ids.take()
    }
}

impl Drop for StageObservation {
    fn drop(&mut self) {
        let Some(ids) = self.ids.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("Stage observation for trace {} dropped outside a runtime", self.trace.id);
            return;
        };
        let trace = self.trace.clone();
        handle.spawn(async move {
            trace
                .close(
                    ids,
                    json!({ "error": STATUS_CANCELLED }),
                    ObservationLevel::Error,
                    STATUS_CANCELLED.to_string(),
                )
                .await;
        });
    }
}
