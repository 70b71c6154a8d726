//! Provider construction errors

/// Failure to assemble a provider from settings
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// A setting is present but unusable
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
