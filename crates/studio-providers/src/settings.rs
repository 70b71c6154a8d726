//! Provider settings and strategy selection

use crate::error::ProviderError;
use crate::http::build_client;
use crate::langfuse::{LangfuseRecorder, DEFAULT_HOST};
use crate::structured::{StructuredInvoker, DEFAULT_BASE_URL, DEFAULT_TEMPERATURE};
use crate::wrapper::WrapperInvoker;
use std::sync::Arc;
use std::time::Duration;
use studio_core::{
    AgentInvoker, HeuristicInvoker, InvocationStrategy, NoopRecorder, ObservabilityRecorder,
};

/// Default hard timeout for one model call
pub const DEFAULT_MODEL_TIMEOUT_MS: u64 = 45_000;

/// Settings for model runtimes and observability backends
///
/// Empty strings count as unset.
#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    /// Model wrapper endpoint
    pub wrapper_url: Option<String>,
    /// Bearer key for the wrapper
    pub wrapper_api_key: Option<String>,
    /// Hard timeout for one model call
    pub model_timeout_ms: u64,
    /// Structured-output model identifier
    pub structured_model: Option<String>,
    /// Structured-output API key
    pub structured_api_key: Option<String>,
    /// Structured-output API base URL
    pub structured_base_url: String,
    /// Structured-output sampling temperature
    pub temperature: f32,
    /// Langfuse host
    pub langfuse_host: String,
    /// Langfuse public key
    pub langfuse_public_key: Option<String>,
    /// Langfuse secret key
    pub langfuse_secret_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            wrapper_url: None,
            wrapper_api_key: None,
            model_timeout_ms: DEFAULT_MODEL_TIMEOUT_MS,
            structured_model: None,
            structured_api_key: None,
            structured_base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            langfuse_host: DEFAULT_HOST.to_string(),
            langfuse_public_key: None,
            langfuse_secret_key: None,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("wrapper_url", &self.wrapper_url)
            .field("model_timeout_ms", &self.model_timeout_ms)
            .field("structured_model", &self.structured_model)
            .field("structured_base_url", &self.structured_base_url)
            .field("temperature", &self.temperature)
            .field("langfuse_host", &self.langfuse_host)
            .field("strategy", &self.strategy())
            .field("langfuse_enabled", &self.langfuse_enabled())
            .finish_non_exhaustive()
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl ProviderSettings {
    /// Whether a wrapper URL is set
    #[must_use]
    pub fn wrapper_configured(&self) -> bool {
        present(self.wrapper_url.as_ref()).is_some()
    }

    /// Whether both a structured model and its key are set
    #[must_use]
    pub fn structured_enabled(&self) -> bool {
        present(self.structured_model.as_ref()).is_some()
            && present(self.structured_api_key.as_ref()).is_some()
    }

    /// Whether both Langfuse keys are set
    #[must_use]
    pub fn langfuse_enabled(&self) -> bool {
        present(self.langfuse_public_key.as_ref()).is_some()
            && present(self.langfuse_secret_key.as_ref()).is_some()
    }

    /// Strategy the settings select
    ///
    /// Structured output wins over the wrapper; the heuristic is used when
    /// neither is configured.
    #[must_use]
    pub fn strategy(&self) -> InvocationStrategy {
        if self.structured_enabled() {
            InvocationStrategy::Structured
        } else if self.wrapper_configured() {
            InvocationStrategy::Wrapper
        } else {
            InvocationStrategy::Heuristic
        }
    }

    /// Model call timeout
    #[must_use]
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if self.model_timeout_ms == 0 {
            return Err(ProviderError::InvalidSetting {
                name: "model_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ProviderError::InvalidSetting {
                name: "temperature",
                reason: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }
        Ok(())
    }

    /// Build the invoker for the selected strategy
    pub fn build_invoker(&self) -> Result<Arc<dyn AgentInvoker>, ProviderError> {
        self.validate()?;
        let invoker: Arc<dyn AgentInvoker> = match (
            present(self.structured_model.as_ref()),
            present(self.structured_api_key.as_ref()),
            present(self.wrapper_url.as_ref()),
        ) {
            (Some(model), Some(api_key), _) => Arc::new(
                StructuredInvoker::new(build_client()?, model, api_key, self.model_timeout())
                    .with_base_url(self.structured_base_url.as_str())
                    .with_temperature(self.temperature),
            ),
            (_, _, Some(url)) => {
                let mut wrapper = WrapperInvoker::new(build_client()?, url, self.model_timeout());
                if let Some(api_key) = present(self.wrapper_api_key.as_ref()) {
                    wrapper = wrapper.with_api_key(api_key);
                }
                Arc::new(wrapper)
            }
            _ => Arc::new(HeuristicInvoker::new()),
        };
        tracing::info!(
            "Invocation strategy: {} (model {})",
            invoker.strategy(),
            invoker.model_label()
        );
        Ok(invoker)
    }

    /// Build the observability recorder
    pub fn build_recorder(&self) -> Result<Arc<dyn ObservabilityRecorder>, ProviderError> {
        match (
            present(self.langfuse_public_key.as_ref()),
            present(self.langfuse_secret_key.as_ref()),
        ) {
            (Some(public_key), Some(secret_key)) => {
                tracing::info!("Langfuse tracing enabled at {}", self.langfuse_host);
                Ok(Arc::new(LangfuseRecorder::new(
                    build_client()?,
                    &self.langfuse_host,
                    public_key,
                    secret_key,
                )))
            }
            _ => Ok(Arc::new(NoopRecorder)),
        }
    }
}
