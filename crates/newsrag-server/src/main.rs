//! newsrag server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and the
//! environment, picks a session store from the available credentials, wires
//! the retriever and generation clients, and serves the chat API over HTTP.
//!
//! Only the session store is probed at startup. Missing provider keys are
//! logged here and reported per request.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::http::HeaderValue;
use clap::Parser;
use newsrag_api::ChatPipeline;
use newsrag_providers::{
  GeminiClient, JinaEmbedder, QdrantIndex, VectorRetriever,
};
use newsrag_store::SessionBackend;
use tokio::net::TcpListener;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "newsrag chat server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;
  let timeout = cfg.http_timeout();

  // Session store.
  let store = SessionBackend::select(&cfg.store_settings())
    .context("failed to configure session store")?;
  tracing::info!(backend = store.kind(), "session store selected");
  if !store.is_durable() {
    tracing::warn!(
      "no Upstash or Redis credentials; chat history is kept in memory and \
       lost on restart"
    );
  }

  // Retrieval.
  let mut embedder = JinaEmbedder::new(cfg.jina_api_key.clone(), timeout)
    .context("failed to build embedding client")?;
  if let Some(url) = &cfg.jina_base_url {
    embedder = embedder.with_base_url(url);
  }
  let index = QdrantIndex::new(
    cfg.qdrant_url.clone(),
    cfg.qdrant_api_key.clone(),
    &cfg.collection_name,
    timeout,
  )
  .context("failed to build vector index client")?;
  if cfg.qdrant_url.is_none() || cfg.jina_api_key.is_none() {
    tracing::warn!("QDRANT_URL or JINA_API_KEY unset; chat requests will fail");
  }

  // Generation.
  let mut generator =
    GeminiClient::new(cfg.gemini_api_key.clone(), &cfg.gemini_model, timeout)
      .context("failed to build generation client")?
      .with_retry(cfg.retry_policy());
  if let Some(url) = &cfg.gemini_base_url {
    generator = generator.with_base_url(url);
  }
  if cfg.gemini_api_key.is_none() {
    tracing::warn!("GEMINI_API_KEY unset; answers will list sources only");
  }

  let pipeline = ChatPipeline::new(
    store,
    VectorRetriever::new(embedder, index),
    generator,
  )
  .with_top_k(cfg.top_k);

  let app = newsrag_api::router(Arc::new(pipeline))
    .layer(TraceLayer::new_for_http())
    .layer(cors_layer(cfg.cors_origin.as_deref()));

  let address = cfg.address();
  tracing::info!(
    collection = %cfg.collection_name,
    model = %cfg.gemini_model,
    top_k = cfg.top_k,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

/// Any origin unless `origin` names one explicitly.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
  let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
  match origin.map(str::parse::<HeaderValue>) {
    Some(Ok(origin)) => cors.allow_origin(origin),
    Some(Err(e)) => {
      tracing::warn!(error = %e, "invalid CORS_ORIGIN; allowing any origin");
      cors.allow_origin(Any)
    }
    None => cors.allow_origin(Any),
  }
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut s) => {
        s.recv().await;
      }
      Err(e) => tracing::warn!(error = %e, "failed to install SIGTERM handler"),
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {}
    _ = terminate => {}
  }

  tracing::info!("shutdown signal received; draining connections");
}
