//! Core types for Studio
//!
//! Defines the fundamental types for the pipeline:
//! - Submissions and the run context handed to stages
//! - Stage decisions, stage results and the overall verdict
//! - Pipeline runs and POC artifacts
//! - Override records

use crate::error::{InvocationError, PocError, ValidationError};
use crate::stages::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use ulid::Ulid;

/// Opaque structured output of one stage
pub type StageOutput = Map<String, Value>;

/// Case-insensitive opening tag marking a complete document
pub const DOCUMENT_ROOT_MARKER: &str = "<html";

/// Submitted idea plus optional appeal context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Idea text (required)
    pub idea: String,
    /// Founder name
    pub founder_name: String,
    /// Target user description
    pub target_user: String,
    /// Appeal argument
    pub appeal: Option<String>,
    /// Whether this submission re-runs the pipeline as an appeal
    pub appeal_mode: bool,
}

impl Submission {
    /// Create new submission
    #[inline]
    #[must_use]
    pub fn new(idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            ..Self::default()
        }
    }

    /// With founder name
    #[inline]
    #[must_use]
    pub fn with_founder(mut self, founder_name: impl Into<String>) -> Self {
        self.founder_name = founder_name.into();
        self
    }

    /// With target user
    #[inline]
    #[must_use]
    pub fn with_target_user(mut self, target_user: impl Into<String>) -> Self {
        self.target_user = target_user.into();
        self
    }

    /// Copy of this submission in appeal mode
    #[must_use]
    pub fn into_appeal(mut self, appeal: impl Into<String>) -> Self {
        self.appeal = Some(appeal.into());
        self.appeal_mode = true;
        self
    }

    /// Trim every field and require a non-empty idea
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let normalized = Self {
            idea: self.idea.trim().to_string(),
            founder_name: self.founder_name.trim().to_string(),
            target_user: self.target_user.trim().to_string(),
            appeal: self
                .appeal
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            appeal_mode: self.appeal_mode,
        };
        if normalized.idea.is_empty() {
            return Err(ValidationError::MissingIdea);
        }
        Ok(normalized)
    }

    /// Context handed to every stage
    #[must_use]
    pub fn context(&self) -> RunContext {
        RunContext {
            founder_name: self.founder_name.clone(),
            target_user: self.target_user.clone(),
            appeal: self.appeal.clone(),
            appeal_mode: self.appeal_mode,
        }
    }
}

/// Per-run context carried to stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    /// Founder name
    pub founder_name: String,
    /// Target user description
    pub target_user: String,
    /// Appeal argument, when re-running as an appeal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appeal: Option<String>,
    /// Appeal mode flag
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub appeal_mode: bool,
}

/// Verdict of a single gating stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageDecision {
    /// Proceed
    Go,
    /// Proceed with conditions
    ConditionalGo,
    /// Stop
    NoGo,
}

impl StageDecision {
    /// Wire representation
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StageDecision::Go => "GO",
            StageDecision::ConditionalGo => "CONDITIONAL_GO",
            StageDecision::NoGo => "NO_GO",
        }
    }

    /// Parse an exact wire value, without defaulting
    #[must_use]
    pub fn parse_strict(raw: &str) -> Option<Self> {
        match raw {
            "GO" => Some(StageDecision::Go),
            "CONDITIONAL_GO" => Some(StageDecision::ConditionalGo),
            "NO_GO" => Some(StageDecision::NoGo),
            _ => None,
        }
    }

    /// Normalize any raw value
    ///
    /// Missing values, non-strings and unknown strings all become
    /// `ConditionalGo`. Never fails.
    #[must_use]
    pub fn normalize(raw: Option<&Value>) -> Self {
        raw.and_then(Value::as_str)
            .and_then(|s| Self::parse_strict(&s.to_ascii_uppercase()))
            .unwrap_or(StageDecision::ConditionalGo)
    }
}

impl fmt::Display for StageDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallDecision {
    /// Every gating stage returned GO
    Approved,
    /// At least one CONDITIONAL_GO, no NO_GO
    ConditionalApproval,
    /// At least one NO_GO, or the POC build failed
    Rejected,
}

impl OverallDecision {
    /// Fixed human-readable reason
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            OverallDecision::Approved => "All agents passed.",
            OverallDecision::ConditionalApproval => {
                "Agents requested conditions before scale; POC generated for validation."
            }
            OverallDecision::Rejected => "One or more agents returned NO_GO.",
        }
    }

    /// Whether the run was rejected
    #[inline]
    #[must_use]
    pub fn is_rejected(self) -> bool {
        matches!(self, OverallDecision::Rejected)
    }
}

impl fmt::Display for OverallDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverallDecision::Approved => "APPROVED",
            OverallDecision::ConditionalApproval => "CONDITIONAL_APPROVAL",
            OverallDecision::Rejected => "REJECTED",
        })
    }
}

/// Follow-up offered to a rejected founder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    /// Re-run with an appeal argument
    Appeal,
    /// Request a paid human review
    PaidOverride,
}

impl NextAction {
    /// Actions offered after a rejection
    pub const AFTER_REJECTION: [NextAction; 2] = [NextAction::Appeal, NextAction::PaidOverride];
}

/// Record of one attempted stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    #[serde(rename = "agent")]
    stage: Stage,
    output: StageOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip)]
    decision: StageDecision,
}

impl StageResult {
    /// Record a completed stage
    ///
    /// The `decision` field of the output is replaced by its normalized form.
    /// The POC stage carries no decision.
    #[must_use]
    pub fn completed(stage: Stage, mut output: StageOutput) -> Self {
        let decision = StageDecision::normalize(output.get("decision"));
        if stage.is_gating() {
            output.insert("decision".to_string(), Value::from(decision.as_str()));
        }
        Self {
            stage,
            output,
            error: None,
            decision,
        }
    }

    /// Synthesize a NO_GO result for a failed invocation
    #[must_use]
    pub fn failed(stage: Stage, error: &InvocationError) -> Self {
        let reason = error.to_string();
        let mut output = StageOutput::new();
        output.insert("decision".to_string(), Value::from(StageDecision::NoGo.as_str()));
        output.insert("error".to_string(), Value::from(reason.clone()));
        Self {
            stage,
            output,
            error: Some(reason),
            decision: StageDecision::NoGo,
        }
    }

    /// Stage this result belongs to
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Normalized decision
    #[inline]
    #[must_use]
    pub fn decision(&self) -> StageDecision {
        self.decision
    }

    /// Structured output
    #[inline]
    #[must_use]
    pub fn output(&self) -> &StageOutput {
        &self.output
    }

    /// Error text, for synthesized failures
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Generated prototype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PocArtifact {
    /// Title
    pub title: String,
    /// One-line summary
    pub summary: String,
    /// Complete self-contained document
    pub html: String,
}

impl PocArtifact {
    /// Build from POC stage output and validate the document marker
    ///
    /// Missing fields fall back to defaults; an empty or markerless document
    /// is rejected.
    pub fn from_output(output: &StageOutput) -> Result<Self, PocError> {
        let text = |key: &str, default: &str| {
            output
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let artifact = Self {
            title: text("title", "Generated POC"),
            summary: text("summary", "POC generated."),
            html: text("html", ""),
        };
        if artifact.has_document_root() {
            Ok(artifact)
        } else {
            Err(PocError::MissingDocumentRoot)
        }
    }

    /// Whether the document contains the root marker
    #[must_use]
    pub fn has_document_root(&self) -> bool {
        self.html.to_lowercase().contains(DOCUMENT_ROOT_MARKER)
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    decision: OverallDecision,
    reason: String,
    #[serde(rename = "agents")]
    stages: Vec<StageResult>,
    poc: Option<PocArtifact>,
    next_actions: Vec<NextAction>,
}

impl PipelineRun {
    /// Rejected at the gate; POC never attempted
    #[must_use]
    pub fn rejected(stages: Vec<StageResult>) -> Self {
        Self {
            decision: OverallDecision::Rejected,
            reason: OverallDecision::Rejected.reason().to_string(),
            stages,
            poc: None,
            next_actions: NextAction::AFTER_REJECTION.to_vec(),
        }
    }

    /// Passed the gate but the POC build failed
    #[must_use]
    pub fn poc_failed(stages: Vec<StageResult>, error: &PocError) -> Self {
        Self {
            decision: OverallDecision::Rejected,
            reason: format!("POC generation failed: {error}"),
            stages,
            poc: None,
            next_actions: NextAction::AFTER_REJECTION.to_vec(),
        }
    }

    /// Passed the gate and produced a POC
    #[must_use]
    pub fn approved(decision: OverallDecision, stages: Vec<StageResult>, poc: PocArtifact) -> Self {
        debug_assert!(!decision.is_rejected());
        Self {
            decision,
            reason: decision.reason().to_string(),
            stages,
            poc: Some(poc),
            next_actions: Vec::new(),
        }
    }

    /// Overall decision
    #[inline]
    #[must_use]
    pub fn decision(&self) -> OverallDecision {
        self.decision
    }

    /// Human-readable reason
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Attempted stages in order
    #[inline]
    #[must_use]
    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    /// Result for one stage, when attempted
    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// Generated POC
    #[inline]
    #[must_use]
    pub fn poc(&self) -> Option<&PocArtifact> {
        self.poc.as_ref()
    }

    /// Offered follow-ups
    #[inline]
    #[must_use]
    pub fn next_actions(&self) -> &[NextAction] {
        &self.next_actions
    }
}

/// Unique override identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverrideId(pub Ulid);

impl OverrideId {
    /// Generate new override ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for OverrideId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OverrideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "po_{}", self.0)
    }
}

impl Serialize for OverrideId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Override lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideStatus {
    /// Awaiting follow-up from the team
    PendingContact,
}

/// Paid-override request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    /// Identifier
    pub id: OverrideId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Founder name
    pub founder_name: String,
    /// Target user description
    pub target_user: String,
    /// Idea text
    pub idea: String,
    /// Contact email
    pub email: String,
    /// Free-form notes
    pub notes: String,
    /// Status, fixed at creation
    pub status: OverrideStatus,
}
