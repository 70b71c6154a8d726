//! Studio Core - staged idea evaluation
//!
//! The pipeline that:
//! - Runs four gating stages in a fixed order
//! - Reduces their decisions to an overall verdict
//! - Builds a proof-of-concept page for approved ideas
//! - Re-runs appeals under a token budget
//! - Records paid-override requests
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_core::{HeuristicInvoker, Studio, StudioConfig, Submission};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let studio = Studio::new(StudioConfig::new(), Arc::new(HeuristicInvoker::new()));
//!
//! let outcome = studio.submit(Submission::new("B2B SaaS automation for invoicing")).await?;
//! println!("{}: {}", outcome.run.decision(), outcome.run.reason());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod appeal;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gate;
pub mod invoker;
pub mod observability;
pub mod overrides;
pub mod pipeline;
pub mod response;
pub mod stages;
pub mod studio;
pub mod types;

// Re-exports for convenience
pub use appeal::{estimate_tokens, AppealController, AppealOutcome, ScreenedAppeal};
pub use config::StudioConfig;
pub use error::{InvocationError, ObservabilityError, PocError, StudioError, ValidationError};
pub use fallback::HeuristicInvoker;
pub use gate::DecisionGate;
pub use invoker::{AgentInvoker, InvocationStrategy, StageRequest};
pub use observability::{
    NoopRecorder, ObservabilityRecorder, ObservationEnd, ObservationLevel, ObservationStart,
    StageObservation, Trace, TraceFlow, TraceStart, TraceUpdate,
};
pub use overrides::{InMemoryOverrideStore, OverrideReceipt, OverrideRegistry, OverrideStore};
pub use pipeline::PipelineOrchestrator;
pub use response::{ResponseCandidate, Unwrapped};
pub use stages::Stage;
pub use studio::{Studio, SubmissionOutcome};
pub use types::{
    NextAction, OverallDecision, OverrideId, OverrideRecord, OverrideStatus, PipelineRun,
    PocArtifact, RunContext, StageDecision, StageOutput, StageResult, Submission,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Studio Core
    pub use crate::{
        AgentInvoker, HeuristicInvoker, ObservabilityRecorder, OverallDecision, PipelineRun,
        Stage, StageDecision, StageRequest, Studio, StudioConfig, StudioError, Submission,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn studio_full_flow() {
        let studio = Studio::new(StudioConfig::new(), Arc::new(HeuristicInvoker::new()));

        let outcome = studio
            .submit(Submission::new("B2B SaaS automation for invoicing").with_founder("Ada"))
            .await
            .unwrap();
        assert_eq!(outcome.run.decision(), OverallDecision::Approved);

        let receipt = studio
            .request_override(Submission::new("Other idea"), "ada@example.com", "")
            .await
            .unwrap();
        assert_eq!(receipt.record.status, OverrideStatus::PendingContact);
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
