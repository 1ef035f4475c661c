//! Main Entrypoint for the Room Agent API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the token issuer and the agent session supervisor.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and closing every session on shutdown.

use anyhow::Context;
use roomagent_api::{config::Config, router::create_router, state::AppState};
use roomagent_core::{PluginInitializer, SessionController, SessionSupervisor, TokenIssuer};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal, then closes every active agent session
/// before the server stops accepting connections.
async fn shutdown_signal(supervisor: Arc<SessionSupervisor>) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
    supervisor.shutdown().await;
}

fn build_token_issuer(config: &Config) -> Option<TokenIssuer> {
    let livekit = match config.livekit() {
        Ok(livekit) => livekit,
        Err(e) => {
            error!(error = %e, "LiveKit is not configured. Token endpoints will return errors.");
            return None;
        }
    };
    match TokenIssuer::new(livekit.api_key, livekit.api_secret) {
        Ok(issuer) => Some(issuer.with_ttl(chrono::Duration::seconds(config.token_ttl_secs))),
        Err(e) => {
            error!(error = %e, "Failed to build token issuer");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    config.log_summary();

    // --- 3. Initialize Shared Services ---
    let token_issuer = build_token_issuer(&config);
    let plugins = Arc::new(PluginInitializer::new(config.agent_settings()));
    let supervisor = Arc::new(SessionSupervisor::new(Arc::new(SessionController::new(
        plugins,
    ))));

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        token_issuer,
        supervisor: supervisor.clone(),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // --- 5. Start Server ---
    info!(
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(supervisor))
    .await?;

    info!("Server has shut down.");
    Ok(())
}
