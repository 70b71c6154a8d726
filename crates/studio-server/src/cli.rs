//! Command line and environment configuration

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use studio_core::StudioConfig;
use studio_providers::settings::DEFAULT_MODEL_TIMEOUT_MS;
use studio_providers::ProviderSettings;

/// Pro Bono Studio server
#[derive(Debug, Clone, Parser)]
#[command(name = "studio-server", version, about = "Idea-to-POC evaluation service")]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8787)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Appeal budget in estimated tokens
    #[arg(long, env = "APPEAL_TOKEN_LIMIT", default_value_t = 220)]
    pub appeal_token_limit: usize,

    /// Model wrapper endpoint
    #[arg(long, env = "MODEL_WRAPPER_URL")]
    pub model_wrapper_url: Option<String>,

    /// Bearer key for the model wrapper
    #[arg(long, env = "MODEL_WRAPPER_API_KEY", hide_env_values = true)]
    pub model_wrapper_api_key: Option<String>,

    /// Hard timeout for one model call
    #[arg(long, env = "MODEL_WRAPPER_TIMEOUT_MS", default_value_t = DEFAULT_MODEL_TIMEOUT_MS)]
    pub model_timeout_ms: u64,

    /// Structured-output model identifier
    #[arg(long, env = "STRUCTURED_MODEL")]
    pub structured_model: Option<String>,

    /// Structured-output API key; `OPENAI_API_KEY` is used when unset
    #[arg(long, env = "STRUCTURED_API_KEY", hide_env_values = true)]
    pub structured_api_key: Option<String>,

    /// Structured-output API base URL
    #[arg(long, env = "STRUCTURED_BASE_URL")]
    pub structured_base_url: Option<String>,

    /// Structured-output sampling temperature
    #[arg(long, env = "STRUCTURED_TEMPERATURE")]
    pub structured_temperature: Option<f32>,

    /// Langfuse host
    #[arg(long, env = "LANGFUSE_HOST")]
    pub langfuse_host: Option<String>,

    /// Langfuse public key
    #[arg(long, env = "LANGFUSE_PUBLIC_KEY")]
    pub langfuse_public_key: Option<String>,

    /// Langfuse secret key
    #[arg(long, env = "LANGFUSE_SECRET_KEY", hide_env_values = true)]
    pub langfuse_secret_key: Option<String>,

    /// Time budget for one observability call
    #[arg(long, env = "OBSERVABILITY_BUDGET_MS", default_value_t = 2000)]
    pub observability_budget_ms: u64,

    /// Emit JSON logs
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Socket address to bind
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Core configuration
    #[must_use]
    pub fn studio_config(&self) -> StudioConfig {
        StudioConfig::new()
            .with_appeal_token_limit(self.appeal_token_limit)
            .with_recorder_budget_ms(self.observability_budget_ms)
    }

    /// Provider settings
    #[must_use]
    pub fn provider_settings(&self) -> ProviderSettings {
        let defaults = ProviderSettings::default();
        ProviderSettings {
            wrapper_url: self.model_wrapper_url.clone(),
            wrapper_api_key: self.model_wrapper_api_key.clone(),
            model_timeout_ms: self.model_timeout_ms,
            structured_model: self.structured_model.clone(),
            structured_api_key: self
                .structured_api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            structured_base_url: self
                .structured_base_url
                .clone()
                .unwrap_or(defaults.structured_base_url),
            temperature: self.structured_temperature.unwrap_or(defaults.temperature),
            langfuse_host: self.langfuse_host.clone().unwrap_or(defaults.langfuse_host),
            langfuse_public_key: self.langfuse_public_key.clone(),
            langfuse_secret_key: self.langfuse_secret_key.clone(),
        }
    }
}
