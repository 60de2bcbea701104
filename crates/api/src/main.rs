use anyhow::Context;
use api::{AppConfig, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenv::dotenv().ok();

    init_tracing();

    let config = AppConfig::from_env()?;
    info!(
        database = %config.storage.database_path.display(),
        uploads = %config.storage.upload_dir.display(),
        chunk_max_chars = config.chunking.max_chars,
        "Configuration loaded"
    );

    let bind_addr = config.server.bind_addr.clone();
    let state = AppState::new(config)?;
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context(format!("Failed to bind {bind_addr}"))?;

    info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// `RUST_LOG` filters (default: info for our crates); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("api=info,query=info,store=info,ingest=info,tower_http=info")
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
