//! `GET /api/stats` and `GET /health`.

use std::sync::Arc;

use axum::{Json, extract::State};
use newsrag_core::{
  provider::{Generator, Retriever},
  store::SessionStore,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{error::ApiError, pipeline::ChatPipeline};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  /// Indexed chunks in the collection.
  pub docs:           u64,
  pub last_ingest_at: Option<String>,
}

/// `GET /api/stats`
///
/// The document count is required; the ingest timestamp is best-effort and
/// reported as `null` when the store cannot be read.
pub async fn handler<S, R, G>(
  State(pipeline): State<Arc<ChatPipeline<S, R, G>>>,
) -> Result<Json<Stats>, ApiError>
where
  S: SessionStore,
  R: Retriever,
  G: Generator,
{
  let docs = pipeline
    .retriever()
    .document_count()
    .await
    .map_err(|e| ApiError::IndexUnavailable(Box::new(e)))?;

  let last_ingest_at = match pipeline.store().last_ingest_at().await {
    Ok(value) => value,
    Err(e) => {
      tracing::warn!(error = %e, "could not read last ingest time");
      None
    }
  };

  Ok(Json(Stats { docs, last_ingest_at }))
}

/// `GET /health`
pub async fn health() -> Json<Value> { Json(json!({ "ok": true })) }
