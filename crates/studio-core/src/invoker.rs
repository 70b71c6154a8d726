//! Agent invocation seam
//!
//! The orchestrator never talks to a model runtime directly. It hands a
//! [`StageRequest`] to an [`AgentInvoker`], which is chosen once when the
//! studio is built.

use crate::error::InvocationError;
use crate::stages::Stage;
use crate::types::{RunContext, StageOutput, StageResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// User prompt sent to wrappers for the POC stage
pub const POC_WRAPPER_PROMPT: &str =
    "Generate a runnable single-page POC for this startup idea using plain HTML/CSS/JS in one document.";

/// Closing instruction of the structured POC prompt
pub const POC_BUILD_INSTRUCTION: &str = "Build a runnable POC homepage with one key interaction.";

/// Invocation strategy in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStrategy {
    /// Structured-output chat completions runtime
    Structured,
    /// Generic model wrapper endpoint
    Wrapper,
    /// Deterministic keyword heuristic
    Heuristic,
}

impl InvocationStrategy {
    /// Stable strategy name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InvocationStrategy::Structured => "structured",
            InvocationStrategy::Wrapper => "wrapper",
            InvocationStrategy::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for InvocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a strategy needs to run one stage
#[derive(Debug, Clone)]
pub struct StageRequest {
    /// Stage to run
    pub stage: Stage,
    /// Normalized idea text
    pub idea: String,
    /// Run context
    pub context: RunContext,
    /// Results recorded so far in this run
    pub prior_results: Vec<StageResult>,
    /// Configured appeal budget
    pub appeal_token_limit: usize,
}

impl StageRequest {
    /// Create a request with no prior results
    #[must_use]
    pub fn new(stage: Stage, idea: impl Into<String>, context: RunContext) -> Self {
        Self {
            stage,
            idea: idea.into(),
            context,
            prior_results: Vec::new(),
            appeal_token_limit: 0,
        }
    }

    /// With prior results
    #[inline]
    #[must_use]
    pub fn with_prior_results(mut self, results: Vec<StageResult>) -> Self {
        self.prior_results = results;
        self
    }

    /// With appeal token limit
    #[inline]
    #[must_use]
    pub fn with_appeal_token_limit(mut self, limit: usize) -> Self {
        self.appeal_token_limit = limit;
        self
    }

    /// Observation input: `{idea, context}`, plus `results` for the POC stage
    #[must_use]
    pub fn observation_input(&self) -> Value {
        let mut input = json!({ "idea": self.idea, "context": self.context });
        if self.stage == Stage::PocBuilder {
            input["results"] = self.prior_results_value();
        }
        input
    }

    /// Context sent to wrappers; the POC stage also carries `agentResults`
    #[must_use]
    pub fn wrapper_context(&self) -> Value {
        let mut context = json!(self.context);
        if self.stage == Stage::PocBuilder {
            context["agentResults"] = self.prior_results_value();
        }
        context
    }

    /// User prompt sent to wrappers
    #[must_use]
    pub fn wrapper_user_prompt(&self) -> String {
        match self.stage {
            Stage::PocBuilder => POC_WRAPPER_PROMPT.to_string(),
            _ => format!("Idea: {}\nContext: {}", self.idea, json!(self.context)),
        }
    }

    /// User prompt sent to structured-output runtimes
    #[must_use]
    pub fn structured_user_prompt(&self) -> String {
        let mut lines = vec![
            format!("Idea: {}", self.idea),
            format!("Founder: {}", self.context.founder_name),
            format!("Target user: {}", self.context.target_user),
        ];
        match self.stage {
            Stage::EconomicJudge => {
                lines.push(format!("Appeal mode: {}", self.context.appeal_mode));
                lines.push(format!(
                    "Appeal argument: {}",
                    self.context.appeal.as_deref().unwrap_or_default()
                ));
                lines.push(format!("Appeal token limit: {}", self.appeal_token_limit));
            }
            Stage::EngineeringManager => {
                lines.push(format!("Product context: {}", self.prior_results_value()));
            }
            Stage::PocBuilder => {
                lines.push(format!("Validated context: {}", self.prior_results_value()));
                lines.push(POC_BUILD_INSTRUCTION.to_string());
            }
            Stage::MarketCompetitor | Stage::ProductService => {}
        }
        lines.join("\n")
    }

    fn prior_results_value(&self) -> Value {
        serde_json::to_value(&self.prior_results).unwrap_or(Value::Array(Vec::new()))
    }
}

/// Stage invoker trait
///
/// Implement this trait to connect a model runtime. Errors are never fatal
/// to a run; the orchestrator records them as NO_GO results.
#[async_trait::async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Strategy implemented
    fn strategy(&self) -> InvocationStrategy;

    /// Model label recorded on generations
    fn model_label(&self) -> &str;

    /// Run one stage
    async fn invoke(&self, request: &StageRequest) -> Result<StageOutput, InvocationError>;
}
