//! Appeal controller
//!
//! Screens an appeal against the token budget before any stage runs, then
//! re-runs the pipeline in appeal mode.

use crate::error::ValidationError;
use crate::observability::Trace;
use crate::pipeline::PipelineOrchestrator;
use crate::types::{PipelineRun, Submission};
use serde::Serialize;

/// Characters per estimated token
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of a text
///
/// A character-count proxy, not a tokenizer.
#[inline]
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Appeal that passed screening
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenedAppeal {
    submission: Submission,
    tokens_used: usize,
}

impl ScreenedAppeal {
    /// Normalized submission in appeal mode
    #[inline]
    #[must_use]
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// Estimated tokens of the appeal text
    #[inline]
    #[must_use]
    pub fn tokens_used(&self) -> usize {
        self.tokens_used
    }
}

/// Outcome of an appeal run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppealOutcome {
    /// The re-run
    #[serde(flatten)]
    pub run: PipelineRun,
    /// Whether the re-run was not rejected
    pub appeal_accepted: bool,
    /// Estimated tokens of the appeal text
    pub appeal_tokens_used: usize,
    /// Configured limit
    pub appeal_token_limit: usize,
}

/// Budgeted appeal runner
#[derive(Debug, Clone, Copy)]
pub struct AppealController {
    limit: usize,
}

impl AppealController {
    /// Create a controller with a token limit
    #[inline]
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Configured limit
    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Validate an appeal without running anything
    ///
    /// Requires idea and appeal text after trimming, then rejects texts over
    /// the budget with the computed usage.
    pub fn screen(&self, submission: Submission, appeal_text: &str) -> Result<ScreenedAppeal, ValidationError> {
        let submission = submission
            .into_appeal(appeal_text)
            .normalized()
            .map_err(|_| ValidationError::MissingAppeal)?;
        let Some(appeal) = submission.appeal.as_deref() else {
            return Err(ValidationError::MissingAppeal);
        };
        let used = estimate_tokens(appeal);
        if used > self.limit {
            return Err(ValidationError::AppealOverBudget {
                used,
                limit: self.limit,
            });
        }
        Ok(ScreenedAppeal {
            submission,
            tokens_used: used,
        })
    }

    /// Re-run the pipeline for a screened appeal
    pub async fn run(
        &self,
        pipeline: &PipelineOrchestrator,
        appeal: ScreenedAppeal,
        trace: &Trace,
    ) -> AppealOutcome {
        let context = appeal.submission.context();
        let run = pipeline.run(&appeal.submission.idea, &context, trace).await;
        let appeal_accepted = !run.decision().is_rejected();
        tracing::info!(
            "Appeal {} with {} ({}/{} tokens)",
            if appeal_accepted { "accepted" } else { "rejected" },
            run.decision(),
            appeal.tokens_used,
            self.limit
        );
        AppealOutcome {
            run,
            appeal_accepted,
            appeal_tokens_used: appeal.tokens_used,
            appeal_token_limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("ééééé"), 2);
    }

    #[test]
    fn screen_requires_idea_and_appeal() {
        let controller = AppealController::new(220);
        assert_eq!(
            controller.screen(Submission::new(""), "please"),
            Err(ValidationError::MissingAppeal)
        );
        assert_eq!(
            controller.screen(Submission::new("idea"), "   "),
            Err(ValidationError::MissingAppeal)
        );
    }

    #[test]
    fn screen_reports_usage_over_budget() {
        let controller = AppealController::new(2);
        assert_eq!(
            controller.screen(Submission::new("idea"), "123456789"),
            Err(ValidationError::AppealOverBudget { used: 3, limit: 2 })
        );
    }

    #[test]
    fn screen_accepts_at_limit() {
        let controller = AppealController::new(2);
        let screened = controller.screen(Submission::new(" idea "), " 12345678 ").unwrap();
        assert_eq!(screened.tokens_used(), 2);
        assert!(screened.submission().appeal_mode);
        assert_eq!(screened.submission().appeal.as_deref(), Some("12345678"));
        assert_eq!(screened.submission().idea, "idea");
    }
}
