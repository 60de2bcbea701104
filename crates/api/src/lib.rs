pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod request;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use ingest::{Chunker, ChunkerConfig, FileStore};
use query::DocumentProcessor;
use std::sync::Arc;
use store::Store;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::AppConfig;
pub use error::ApiError;
pub use metrics::Metrics;

pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub files: FileStore,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Open the database and upload directory named in `config`
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = Store::open(&config.storage.database_path)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: AppConfig, store: Store) -> Self {
        let files = FileStore::new(config.storage.upload_dir.clone());
        Self {
            config,
            store,
            files,
            metrics: Metrics::new(),
        }
    }

    /// A fresh processor for the current request
    pub fn processor(&self) -> DocumentProcessor {
        DocumentProcessor::new(
            self.store.clone(),
            Chunker::new(ChunkerConfig {
                max_chars: self.config.chunking.max_chars,
            }),
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;
    let state = Arc::new(state);

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/documents", get(handlers::list_documents))
        .route("/api/documents/upload", post(handlers::upload_document))
        .route(
            "/api/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/api/documents/:id/chat-history", get(handlers::chat_history))
        .route("/api/ask", post(handlers::ask_question))
        .route("/api/stats", get(handlers::get_stats))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn track_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    state
        .metrics
        .record_request(status.is_success() || status.is_redirection());
    response
}
