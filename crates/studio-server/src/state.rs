//! Shared server state

use serde::Serialize;
use studio_core::Studio;
use studio_providers::ProviderSettings;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "ai-pro-bono-studio";

/// Health endpoint body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub ok: bool,
    pub service: &'static str,
    pub model_wrapper_configured: bool,
    pub structured_output_enabled: bool,
    pub langfuse_enabled: bool,
    pub invocation_strategy: String,
    pub appeal_token_limit: usize,
}

/// State handed to every route
#[derive(Debug, Clone)]
pub struct AppState {
    studio: Studio,
    model_wrapper_configured: bool,
    structured_output_enabled: bool,
}

impl AppState {
    /// Wrap a studio built from `settings`
    #[must_use]
    pub fn new(studio: Studio, settings: &ProviderSettings) -> Self {
        Self {
            studio,
            model_wrapper_configured: settings.wrapper_configured(),
            structured_output_enabled: settings.structured_enabled(),
        }
    }

    #[inline]
    #[must_use]
    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    /// Current configuration flags
    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport {
            ok: true,
            service: SERVICE_NAME,
            model_wrapper_configured: self.model_wrapper_configured,
            structured_output_enabled: self.structured_output_enabled,
            langfuse_enabled: self.studio.observability_enabled(),
            invocation_strategy: self.studio.strategy().to_string(),
            appeal_token_limit: self.studio.config().appeal_token_limit,
        }
    }
}
