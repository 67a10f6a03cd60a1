use anyhow::Context;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::storage::{BlobStore, ObjectStoreBlobStore};
use crate::task_list::TaskListService;

pub mod api;

/// Shared state handed to every handler: the configured object store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

/// Creates the complete application router, including health check and middleware.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .merge(api::create_api_router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let store = ObjectStoreBlobStore::from_config(&config)?;
    store
        .check_bucket()
        .await
        .context("Task bucket does not exist or is not accessible")?;
    let store: Arc<dyn BlobStore> = Arc::new(store);

    // Make sure the index document exists before taking requests.
    let index = TaskListService::new(store.as_ref())
        .get_index()
        .await
        .context("Failed to load task list index")?;
    tracing::info!("Task list index ready with {} lists", index.len());

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let app = create_app_router(Arc::new(AppState::new(store)));
    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
