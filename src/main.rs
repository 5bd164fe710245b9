mod config;
mod db;
mod error;
mod llm;
mod rate_limit;
mod routes;
mod services;
mod state;
mod vector;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::llm::LlmClient;
use crate::vector::pinecone::{PineconeClient, PineconeConfig};

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(std::env::var("LOG_LEVEL").map_or_else(|_| "info".to_owned(), |l| l.to_ascii_lowercase()))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn build_state(settings: Settings) -> Result<state::AppState, Box<dyn std::error::Error>> {
    let pool = db::init_pool(&settings.database_url, settings.db_max_connections).await?;

    let llm = match LlmClient::from_env(&settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "llm: disabled; answers fall back to a fixed apology");
            None
        }
    };
    let vectors = match PineconeConfig::from_env(&settings) {
        Ok(config) => match PineconeClient::connect(config).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "vector: connection failed; retrieval disabled");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "vector: disabled");
            None
        }
    };

    let mut state = state::AppState::new(pool, settings);
    if let Some(llm) = llm {
        state = state.with_llm(llm.clone()).with_embedder(llm);
    }
    if let Some(vectors) = vectors {
        state = state.with_vectors(vectors);
    }
    Ok(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env()?;
    let addr = settings.bind_addr();
    let (name, version) = (settings.app_name.clone(), settings.app_version.clone());

    let state = build_state(settings).await?;
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, %name, %version, "vaidya listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
