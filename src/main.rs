use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podium::config::RelayConfig;
use podium::heartbeat::{self, HeartbeatConfig};
use podium::monitor;
use podium::shared::AppState;
use podium::websockets::relay_handler;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podium=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting podium relay server");

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration, aborting startup");
            std::process::exit(1);
        }
    };

    let state = AppState::from_config(config.clone());

    // Liveness monitor runs for the whole server lifetime
    let heartbeat_handle = tokio::spawn(heartbeat::run_heartbeat(
        Arc::clone(&state.registry),
        state.broadcaster.clone(),
        HeartbeatConfig {
            interval: config.heartbeat_interval,
        },
    ));

    let relay_routes = Router::new().route("/ws", get(relay_handler));

    let app = match config.monitor_port {
        // Separate monitor listener: the relay port serves only /ws
        Some(port) => {
            let monitor_app = monitor::routes()
                .layer(CorsLayer::permissive())
                .layer(TraceLayer::new_for_http())
                .with_state(state.clone());
            tokio::spawn(async move {
                let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
                    .await
                    .expect("Failed to bind monitor port");
                info!(port = port, "Monitor surface listening");
                axum::serve(listener, monitor_app)
                    .await
                    .expect("Monitor server failed");
            });
            relay_routes
        }
        None => relay_routes.merge(monitor::routes().layer(CorsLayer::permissive())),
    }
    .layer(TraceLayer::new_for_http())
    .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.relay_port))
        .await
        .expect("Failed to bind relay port");
    info!(port = config.relay_port, "Relay server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(heartbeat_handle, state.clone()))
        .await
        .expect("Relay server failed");

    info!("Server shutdown complete");
}

/// Resolves on Ctrl+C. The heartbeat stops first so no probe races the
/// teardown, then every open connection is hard-terminated; only after that
/// does axum stop accepting and release the port.
async fn shutdown_signal(heartbeat_handle: JoinHandle<()>, state: AppState) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received");

    heartbeat_handle.abort();
    let closed = state.registry.terminate_all();
    info!(closed = closed, "Terminated open connections");
}
