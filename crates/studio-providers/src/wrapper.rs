//! Model wrapper strategy
//!
//! POSTs the stage prompt to a generic wrapper endpoint and resolves the
//! answer with the response unwrapping protocol.

use crate::http::{status_error, transport_error};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use studio_core::response;
use studio_core::{AgentInvoker, InvocationError, InvocationStrategy, StageOutput, StageRequest};

/// Model label recorded on wrapper generations
pub const WRAPPER_MODEL_LABEL: &str = "wrapper-model";

/// Invoker backed by a model wrapper endpoint
#[derive(Debug, Clone)]
pub struct WrapperInvoker {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl WrapperInvoker {
    /// Create a wrapper invoker
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: None,
            timeout,
        }
    }

    /// With bearer API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Request body for a stage
    #[must_use]
    pub fn request_body(request: &StageRequest) -> Value {
        let stage = request.stage;
        json!({
            "agent": stage.name(),
            "systemPrompt": stage.system_prompt(),
            "userPrompt": request.wrapper_user_prompt(),
            "schemaHint": stage.schema_hint(),
            "input": {
                "idea": request.idea,
                "context": request.wrapper_context(),
            },
        })
    }

    async fn call(&self, request: &StageRequest) -> Result<StageOutput, InvocationError> {
        let mut builder = self
            .client
            .post(&self.url)
            .json(&Self::request_body(request));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let payload: Value = response.json().await.map_err(|e| {
            InvocationError::Unparseable(format!("Wrapper response was not JSON: {e}"))
        })?;
        response::resolve(&payload)
    }
}

#[async_trait]
impl AgentInvoker for WrapperInvoker {
    fn strategy(&self) -> InvocationStrategy {
        InvocationStrategy::Wrapper
    }

    fn model_label(&self) -> &str {
        WRAPPER_MODEL_LABEL
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
