//! Structured-output strategy
//!
//! Calls an OpenAI-compatible chat completions endpoint with a strict JSON
//! schema response format, then validates the answer against the stage
//! schema.

use crate::http::{status_error, transport_error};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use studio_core::response::tolerant_parse;
use studio_core::{AgentInvoker, InvocationError, InvocationStrategy, StageOutput, StageRequest};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [Message<'a>; 2],
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Invoker backed by a structured-output chat completions runtime
#[derive(Debug, Clone)]
pub struct StructuredInvoker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl StructuredInvoker {
    /// Create a structured invoker against the default base URL
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            timeout,
        }
    }

    /// With API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// With sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Request body for a stage
    #[must_use]
    pub fn request_body(&self, request: &StageRequest) -> Value {
        let stage = request.stage;
        let user_prompt = request.structured_user_prompt();
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                Message {
                    role: "system",
                    content: stage.structured_system_prompt(),
                },
                Message {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": stage.name(),
                    "strict": true,
                    "schema": stage.json_schema(),
                },
            }),
        };
        serde_json::to_value(body).unwrap_or(Value::Null)
    }

    async fn call(&self, request: &StageRequest) -> Result<StageOutput, InvocationError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let chat: ChatResponse = response.json().await.map_err(|e| {
            InvocationError::Unparseable(format!("Structured response was not valid JSON: {e}"))
        })?;
        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| InvocationError::Unparseable("Structured response had no choices".into()))?;
        if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
            return Err(InvocationError::Unparseable(format!(
                "Model refused {}: {refusal}",
                request.stage
            )));
        }
        let output = message
            .content
            .as_deref()
            .and_then(tolerant_parse)
            .ok_or_else(|| {
                InvocationError::Unparseable(
                    "Structured response did not include a parseable JSON object".into(),
                )
            })?;
        request.stage.validate_structured(output)
    }
}

#[async_trait]
impl AgentInvoker for StructuredInvoker {
    fn strategy(&self) -> InvocationStrategy {
        InvocationStrategy::Structured
    }

    fn model_label(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, request: &StageRequest) -> Result<StageOutput, InvocationError> {
        tokio::time::timeout(self.timeout, self.call(request))
            .await
            .map_err(|_| InvocationError::Timeout {
                stage: request.stage,
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}
