use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::api;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::llm::{CompletionClient, GeminiClient};
use crate::uploads::UploadStore;

/// Wrap the API router with middleware and state.
pub fn build_app(state: AppState, request_timeout: Duration, max_body_bytes: usize) -> Router {
    api::router()
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(request_timeout, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => ApiError::Timeout.into_response(),
                }
            },
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.llm_settings()?;

    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        "LLM configuration loaded"
    );

    let completions: Arc<dyn CompletionClient> = Arc::new(GeminiClient::new(settings)?);

    let uploads = UploadStore::new(&config.upload.dir);
    tokio::fs::create_dir_all(uploads.root()).await?;

    let state = AppState::new(completions, uploads);
    let app = build_app(
        state,
        config.request_timeout(),
        config.server.max_body_bytes,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        upload_dir = %config.upload.dir,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
