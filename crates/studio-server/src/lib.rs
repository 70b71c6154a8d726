//! Studio Server - HTTP surface
//!
//! Serves the studio flows as JSON over HTTP:
//! - [`api::routes`]: health, submit, appeal and paid-override routes
//! - [`AppState`]: studio plus the configuration flags reported by health
//! - [`Cli`]: flags and environment variables

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod api;
pub mod cli;
pub mod state;

pub use api::{routes, IntakeForm, MAX_BODY_BYTES};
pub use cli::Cli;
pub use state::{AppState, HealthReport, SERVICE_NAME};

use studio_core::Studio;

/// Build the state for a parsed command line
pub fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    let settings = cli.provider_settings();
    let studio = Studio::new(cli.studio_config(), settings.build_invoker()?)
        .with_recorder(settings.build_recorder()?);
    Ok(AppState::new(studio, &settings))
}
