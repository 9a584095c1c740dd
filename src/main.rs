//! `kg-visualizer` HTTP server.

use kg_visualizer::observability::{DEFAULT_FILTER, init_tracing};
use kg_visualizer::server::{AppState, router};
use kg_visualizer::{Result, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing(DEFAULT_FILTER);
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let settings = Settings::from_env()?;
    let addr = settings.bind_addr.clone();
    let state = AppState::new(settings);

    tracing::info!(
        env = %state.settings.app_env,
        provider = %state.settings.ai_provider,
        budget_usd = state.settings.monthly_budget_usd,
        enforce = state.settings.budget_enforce,
        hard_cap = state.budget.has_cost_source(),
        "kg-visualizer initialized"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}
