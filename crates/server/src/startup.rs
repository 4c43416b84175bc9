use std::sync::Arc;

use axum::Router;
use configs::AppConfig;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;
use service::{
    gitea::GiteaClient,
    slack::SlackClient,
    threads::repo::seaorm::SeaOrmThreadRepository,
    NotificationService,
};

fn build_cors() -> CorsLayer {
    CorsLayer::new()
}

/// Wire the real Slack, Gitea and Postgres backed notifier.
pub fn build_state(cfg: &AppConfig, db: DatabaseConnection) -> Result<ServerState, StartupError> {
    let chat = SlackClient::new(&cfg.slack).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let directory = GiteaClient::new(&cfg.gitea).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let threads = SeaOrmThreadRepository { db };
    let notifier = NotificationService::new(
        Arc::new(chat),
        Arc::new(directory),
        Arc::new(threads),
        cfg.slack.channel.clone(),
    );
    Ok(ServerState::new(notifier))
}

pub fn build_app(state: ServerState) -> Router {
    routes::build_router(state, build_cors())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves on Ctrl+C or SIGTERM; `docker stop` sends the latter to PID 1.
pub(crate) async fn shutdown_signal() {
    let signal = tokio::select! {
        _ = ctrl_c() => "SIGINT",
        _ = terminate() => "SIGTERM",
    };
    info!(event = "shutdown_signal", signal, "shutdown requested, draining connections");
}

/// Public entry: connect storage, build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> Result<(), StartupError> {
    let db = models::db::connect(&cfg.database).await?;
    if cfg.database.run_migrations {
        models::db::migrate(&db).await?;
    }

    let state = build_state(&cfg, db)?;
    let app = build_app(state);

    let addr = cfg.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr: addr.to_string(), source })?;
    info!(%addr, channel = %cfg.slack.channel, "pr notifier listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Any(e.into()))?;
    Ok(())
}
