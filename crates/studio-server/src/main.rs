use clap::Parser;
use studio_server::{build_state, routes, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "studio_server=info,studio_core=info,studio_providers=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let state = build_state(&cli)?;
    let health = state.health();
    tracing::info!(
        "Studio ready: strategy={}, langfuse={}, appeal limit={}",
        health.invocation_strategy,
        health.langfuse_enabled,
        health.appeal_token_limit
    );

    let (addr, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(cli.listen_addr(), async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
        })?;
    tracing::info!("Listening on http://{}", addr);
    server.await;
    tracing::info!("Shut down");
    Ok(())
}
