//! Studio configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default appeal budget in estimated tokens
pub const DEFAULT_APPEAL_TOKEN_LIMIT: usize = 220;

/// Default per-call observability budget
pub const DEFAULT_RECORDER_BUDGET_MS: u64 = 2_000;

/// Studio configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Maximum estimated tokens accepted in an appeal argument
    pub appeal_token_limit: usize,
    /// Upper bound on any single observability call
    pub recorder_budget_ms: u64,
}

impl StudioConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With appeal token limit
    #[inline]
    #[must_use]
    pub fn with_appeal_token_limit(mut self, limit: usize) -> Self {
        self.appeal_token_limit = limit;
        self
    }

    /// With recorder budget
    #[inline]
    #[must_use]
    pub fn with_recorder_budget_ms(mut self, budget_ms: u64) -> Self {
        self.recorder_budget_ms = budget_ms;
        self
    }

    /// Recorder budget as a duration
    #[inline]
    #[must_use]
    pub fn recorder_budget(&self) -> Duration {
        Duration::from_millis(self.recorder_budget_ms)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            appeal_token_limit: DEFAULT_APPEAL_TOKEN_LIMIT,
            recorder_budget_ms: DEFAULT_RECORDER_BUDGET_MS,
        }
    }
}
