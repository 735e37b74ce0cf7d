//! HTTP surface: the browser flow plus the JSON API.

use std::num::NonZeroU16;
use std::sync::Arc;

use askama::Template;
use axum::Router;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing::{error, info};

use crate::config::GeneratorConfig;
use crate::constants::SESSION_PURGE_INTERVAL;
use crate::error::MangaError;
use crate::export::LandingPage;
use crate::orchestrator::PanelOrchestrator;
use crate::render::GeminiRenderer;
use crate::script::ScriptGenerator;

mod api;
mod csrf;
mod flash;
mod prelude;
mod session;
mod store;
mod views;

use store::{BoundedMemoryStore, purge_expired_sessions};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    scripts: Arc<ScriptGenerator>,
    panels: Arc<PanelOrchestrator<GeminiRenderer>>,
}

impl AppState {
    pub(crate) fn new(scripts: ScriptGenerator, panels: PanelOrchestrator<GeminiRenderer>) -> Self {
        Self {
            scripts: Arc::new(scripts),
            panels: Arc::new(panels),
        }
    }

    fn from_config(config: &GeneratorConfig) -> Result<Self, MangaError> {
        let (scripts, panels) = config.build()?;
        Ok(Self::new(scripts, panels))
    }

    /// Whether panel images can be requested at all.
    pub(crate) fn images_enabled(&self) -> bool {
        self.panels.renderer().is_configured()
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(views::index_handler))
        .route("/generate", post(views::generate_handler))
        .route("/comic", get(views::comic_handler))
        .route(
            "/comic/panels/{number}/regenerate",
            post(views::regenerate_handler),
        )
        .route("/comic/export", get(views::export_download_handler))
        .route("/comic/landing-page", get(views::landing_page_handler))
        .route("/api/generate-prompts", post(api::generate_prompts_handler))
        .route("/api/generate-manga", post(api::generate_manga_handler))
        .route("/api/export", post(api::export_handler))
        .route("/static/styles.css", get(styles_handler))
        .route("/healthcheck", get(healthcheck_handler))
}

/// How long sessions live and how many are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions expire after this long without a request
    pub idle_timeout: time::Duration,
    /// Live sessions kept before the oldest is evicted
    pub max_sessions: usize,
}

fn build_app(state: AppState, store: BoundedMemoryStore, limits: SessionLimits) -> Router {
    let sessions = SessionManagerLayer::new(store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(limits.idle_timeout));
    create_router()
        .with_state(state)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

async fn healthcheck_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Landing page as an `.html` attachment.
pub(crate) fn download(page: &LandingPage<'_>) -> Result<Response, MangaError> {
    let html = page.render()?;
    let disposition = HeaderValue::from_str(&page.content_disposition())
        .map_err(|err| MangaError::InternalServerError(err.to_string()))?;
    info!("Exporting landing page as {}", page.file_name());
    Ok((
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            ),
            (CONTENT_DISPOSITION, disposition),
        ],
        html,
    )
        .into_response())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutting down");
}

/// Binds the listener and serves until interrupted.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    config: &GeneratorConfig,
    limits: SessionLimits,
) -> Result<(), anyhow::Error> {
    let store = BoundedMemoryStore::new(limits.max_sessions);
    let purge = tokio::spawn(purge_expired_sessions(store.clone(), SESSION_PURGE_INTERVAL));
    let app = build_app(AppState::from_config(config)?, store, limits);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    purge.abort();
    Ok(())
}
