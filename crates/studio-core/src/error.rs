//! Error types for Studio Core
//!
//! Provides the error taxonomy for:
//! - Request validation (rejected before any stage runs)
//! - Stage invocation failures (converted into synthetic NO_GO results)
//! - POC generation failures (downgrade an approved run to REJECTED)
//! - Observability collaborator failures (always swallowed)

use crate::stages::Stage;

/// Maximum length of upstream text embedded in error messages
pub const MAX_ERROR_DETAIL_LEN: usize = 200;

/// Top-level error returned by the [`Studio`](crate::Studio) facade
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// Request rejected before the pipeline ran
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StudioError {
    /// Check if error is a caller-side validation failure
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Appeal budget figures, when the failure was an over-budget appeal
    #[must_use]
    pub fn appeal_budget(&self) -> Option<(usize, usize)> {
        match self {
            Self::Validation(ValidationError::AppealOverBudget { used, limit }) => {
                Some((*used, *limit))
            }
            Self::Validation(_) => None,
        }
    }
}

/// Validation failures
///
/// Raised before any stage invocation or trace is opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Idea text empty after trimming
    #[error("idea is required")]
    MissingIdea,

    /// Appeal submitted without idea or argument text
    #[error("idea and appeal are required")]
    MissingAppeal,

    /// Override requested without idea or contact email
    #[error("idea and email are required")]
    MissingContact,

    /// Appeal argument exceeds the token budget proxy
    #[error("Appeal is over token limit ({used}/{limit})")]
    AppealOverBudget {
        /// Estimated tokens used by the appeal text
        used: usize,
        /// Configured limit
        limit: usize,
    },
}

/// Stage invocation failures
///
/// Never fatal to a run: the orchestrator turns these into a NO_GO result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvocationError {
    /// Network or transport failure
    #[error("request failed: {0}")]
    Transport(String),

    /// Hard timeout expired
    #[error("{stage} timed out after {timeout_ms}ms")]
    Timeout {
        /// Stage being invoked
        stage: Stage,
        /// Configured timeout
        timeout_ms: u64,
    },

    /// Upstream answered with a non-success status
    #[error("Wrapper returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// No rule of the unwrapping protocol produced a mapping
    #[error("{0}")]
    Unparseable(String),

    /// Output did not satisfy the stage schema
    #[error("{stage} output violated schema: {detail}")]
    SchemaViolation {
        /// Stage whose output was rejected
        stage: Stage,
        /// What was wrong
        detail: String,
    },
}

impl InvocationError {
    /// Check if error is a timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Build a status error with a truncated body
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate_detail(body),
        }
    }
}

/// POC build stage failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum PocError {
    /// The build stage invocation itself failed
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// Document string lacks the root-document marker
    #[error("Generated POC html was missing a full HTML document")]
    MissingDocumentRoot,
}

/// Observability collaborator failures
///
/// The core logs these at debug level and discards them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ObservabilityError {
    /// Delivery failed
    #[error("observability transport failed: {0}")]
    Transport(String),

    /// Collaborator rejected the event
    #[error("observability backend rejected event with status {0}")]
    Rejected(u16),

    /// Call exceeded the recorder budget
    #[error("observability call exceeded {0}ms budget")]
    Budget(u64),
}

/// Truncate upstream text for inclusion in error messages
#[must_use]
pub fn truncate_detail(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_DETAIL_LEN {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ERROR_DETAIL_LEN).collect();
        format!("{head}...")
    }
}
