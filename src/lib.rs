use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub mod auth;
pub mod config;
pub mod consent;
pub mod cookie;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod pages;
pub mod response;
pub mod routes;
pub mod telemetry;
pub mod templates;

use auth::{Firewall, SessionStore, UserProvider};
use config::Config;
use consent::{BasePathResolver, ConsentGate};
use error::AppError;
use response::RequestContext;
use templates::{HandlebarsRenderer, TemplateRenderer};

/// Shared, read-mostly state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub users: Arc<UserProvider>,
    pub firewall: Arc<Firewall>,
    pub consent: Arc<ConsentGate>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        config.validate()?;

        let users = UserProvider::from_config(&config.users)?;
        if users.is_empty() {
            tracing::warn!("No users configured; nobody can log in");
        }

        Ok(Self {
            sessions: Arc::new(SessionStore::new(
                config.session.timeout_secs,
                config.session.remember_me_lifetime_secs,
            )),
            users: Arc::new(users),
            firewall: Arc::new(Firewall::from_config(&config)),
            consent: Arc::new(ConsentGate::new(
                Arc::new(BasePathResolver),
                config.home_route.clone(),
            )),
            renderer: Arc::new(HandlebarsRenderer::new()?),
            config: Arc::new(config),
        })
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_parts(
            &parts.headers,
            &state.config.base_path,
            parts.uri.path(),
        ))
    }
}

/// Starts the web server with custom configuration.
///
/// Binds the listener, spawns the server and returns the bound port. The
/// server stops when `shutdown_rx` fires or its sender is dropped.
pub async fn start_server_with_config(
    config: Config,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<u16> {
    let addr = config.server_addr();
    let cleanup_every = Duration::from_secs(config.session.cleanup_interval_secs);
    let state = AppState::from_config(config)?;
    let sessions = state.sessions.clone();
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    let local_addr = listener.local_addr()?;

    info!("listening on {}", local_addr);

    let cleanup = auth::session::spawn_cleanup_task(sessions, cleanup_every);
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
            debug!("shutdown signal received");
        });
        if let Err(e) = server.await {
            tracing::error!("server error: {}", e);
        }
        cleanup.abort();
    });

    Ok(local_addr.port())
}
