//! Langfuse recorder
//!
//! Ships every observability event as a one-item batch to the public
//! ingestion API.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use studio_core::{
    ObservabilityError, ObservabilityRecorder, ObservationEnd, ObservationStart, TraceStart,
    TraceUpdate,
};
use uuid::Uuid;

/// Default Langfuse host
pub const DEFAULT_HOST: &str = "https://cloud.langfuse.com";

/// Ingestion path under the host
pub const INGESTION_PATH: &str = "/api/public/ingestion";

/// Langfuse ingestion recorder
#[derive(Clone)]
pub struct LangfuseRecorder {
    client: reqwest::Client,
    endpoint: String,
    public_key: String,
    secret_key: String,
}

impl std::fmt::Debug for LangfuseRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangfuseRecorder")
            .field("endpoint", &self.endpoint)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl LangfuseRecorder {
    /// Create a recorder for a host
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        host: &str,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}{INGESTION_PATH}", host.trim_end_matches('/')),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
        }
    }

    async fn ingest<B: Serialize + Sync>(&self, kind: &str, body: &B) -> Result<(), ObservabilityError> {
        let batch = json!({
            "batch": [{
                "id": Uuid::new_v4(),
                "type": kind,
                "timestamp": Utc::now().to_rfc3339(),
                "body": body,
            }],
        });
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&batch)
            .send()
            .await
            .map_err(|e| ObservabilityError::Transport(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ObservabilityError::Rejected(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl ObservabilityRecorder for LangfuseRecorder {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn trace_created(&self, event: &TraceStart) -> Result<(), ObservabilityError> {
        self.ingest("trace-create", event).await
    }

    async fn trace_updated(&self, event: &TraceUpdate) -> Result<(), ObservabilityError> {
        self.ingest("trace-update", event).await
    }

    async fn span_started(&self, event: &ObservationStart) -> Result<(), ObservabilityError> {
        self.ingest("span-create", event).await
    }

    async fn span_ended(&self, event: &ObservationEnd) -> Result<(), ObservabilityError> {
        self.ingest("span-update", event).await
    }

    async fn generation_started(&self, event: &ObservationStart) -> Result<(), ObservabilityError> {
        self.ingest("generation-create", event).await
    }

    async fn generation_ended(&self, event: &ObservationEnd) -> Result<(), ObservabilityError> {
        self.ingest("generation-update", event).await
    }
}
