//! The board relay server: an axum WebSocket endpoint in front of the
//! authoritative board state.

pub mod auth;
pub mod authority;
pub mod db;
pub mod ws;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::sync::ServerEvent;

pub use auth::{AuthError, DbTokenVerifier, Identity, TokenVerifier};
pub use authority::{BoardAuthority, HandleOutcome};
pub use db::BoardDb;

/// Configuration for the relay server.
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            db_path: PathBuf::from(".daytrack/board.db"),
            dev_mode: false,
        }
    }
}

impl ServerConfig {
    /// Config whose state lives only in memory (for testing).
    pub fn in_memory() -> Self {
        Self {
            db_path: PathBuf::new(),
            ..Self::default()
        }
    }
}

/// Shared state behind every connection: the authority, the broadcast
/// channel fanning accepted mutations out, and the token verifier.
pub struct AppState {
    pub authority: Mutex<BoardAuthority>,
    pub ws_tx: broadcast::Sender<ServerEvent>,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Open the database and assemble the shared state. An empty `db_path`
/// selects an in-memory database.
pub fn new_app_state(config: &ServerConfig) -> Result<Arc<AppState>> {
    let db = if config.db_path.as_os_str().is_empty() {
        BoardDb::new_in_memory()?
    } else {
        if let Some(parent) = config.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        BoardDb::new(&config.db_path).context("Failed to initialize board database")?
    };

    // The sessions table backing the verifier lives in its own connection
    // so the authority keeps exclusive use of the main one.
    let auth_db = if config.db_path.as_os_str().is_empty() {
        BoardDb::new_in_memory()?
    } else {
        BoardDb::new(&config.db_path)?
    };

    let (ws_tx, _rx) = broadcast::channel::<ServerEvent>(256);
    Ok(Arc::new(AppState {
        authority: Mutex::new(BoardAuthority::new(db)),
        ws_tx,
        verifier: Arc::new(DbTokenVerifier::new(Arc::new(Mutex::new(auth_db)))),
    }))
}

/// Build the application router: the WebSocket endpoint plus a health probe.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Start the relay server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let state = new_app_state(&config)?;
    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, "board relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("shutting down");
}
