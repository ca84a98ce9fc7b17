use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hexpop::rewards::InMemoryResultSink;
use hexpop::user::InMemoryIdentityLookup;
use hexpop::websockets::{get_session, websocket_handler};
use hexpop::{AppState, GameConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hexpop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hexpop game server");

    let server = ServerConfig::from_env();
    let config = GameConfig::from_env();

    // Swap in real identity and result stores here
    let identity = if server.auto_register {
        Arc::new(InMemoryIdentityLookup::with_auto_register())
    } else {
        warn!("Auto-registration disabled, no player can connect until profiles are registered");
        Arc::new(InMemoryIdentityLookup::new())
    };
    let sink = Arc::new(InMemoryResultSink::new());

    let app_state = AppState::new(config, identity, sink);

    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/sessions/:session_id", get(get_session))
        .route("/ws/:player_id", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;
    info!(addr = %server.bind_addr, "Server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
