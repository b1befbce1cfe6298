//! HTTP server wiring: router, shared state, CORS, graceful shutdown.

use crate::config::ServerConfig;
use crate::handlers;
use axum::routing::{get, post};
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
///
/// The archive store backs `/download_batch/{id}`: batch archives are kept
/// in memory under the identifier minted by the orchestrator. Process
/// lifetime only; there is no durable store.
pub struct AppState {
    pub archives: Mutex<HashMap<String, Vec<u8>>>,
}

pub type SharedState = Arc<AppState>;

/// Run the HTTP server
pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = Arc::new(AppState {
        archives: Mutex::new(HashMap::new()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/grayscale", post(handlers::grayscale))
        .route("/colorspace", post(handlers::colorspace))
        .route("/draw", post(handlers::draw))
        .route("/transform", post(handlers::transform))
        .route("/resize_crop", post(handlers::resize_crop))
        .route("/arithmetic", post(handlers::arithmetic))
        .route("/convolution", post(handlers::convolution))
        .route("/threshold", post(handlers::threshold))
        .route("/morph_edge", post(handlers::morph_edge))
        .route("/histogram", post(handlers::histogram))
        .route("/denoise", post(handlers::denoise))
        .route("/batch_process", post(handlers::batch_process))
        .route("/download_batch/{batch_id}", get(handlers::download_batch))
        .route("/compare", post(handlers::compare))
        .route("/export", post(handlers::export))
        .route("/create_report", post(handlers::create_report))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
