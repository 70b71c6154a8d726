//! Shared HTTP client construction

use crate::error::ProviderError;
use std::time::Duration;
use studio_core::error::truncate_detail;
use studio_core::InvocationError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const POOL_MAX_IDLE_PER_HOST: usize = 16;

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .user_agent(concat!("studio-providers/", env!("CARGO_PKG_VERSION")))
}

/// Build the client shared by one provider
///
/// Request deadlines are enforced per call by the caller.
pub fn build_client() -> Result<reqwest::Client, ProviderError> {
    Ok(base_client_builder().build()?)
}

pub(crate) fn transport_error(err: &reqwest::Error) -> InvocationError {
    InvocationError::Transport(truncate_detail(&err.to_string()))
}

/// Status error with the body text, truncated
pub(crate) async fn status_error(response: reqwest::Response) -> InvocationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    InvocationError::status(status, &body)
}
