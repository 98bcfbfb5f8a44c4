//! Handlers for session endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/session/new` | Fresh UUID v4; nothing is stored until the first chat turn |
//! | `GET`  | `/api/history/{id}` | Empty list for unknown or expired sessions |
//! | `POST` | `/api/reset/{id}` | Idempotent |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use newsrag_core::{
  message::Message,
  provider::{Generator, Retriever},
  store::SessionStore,
};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{error::ApiError, pipeline::ChatPipeline};

// ─── New ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
  pub session_id: String,
}

/// `POST /api/session/new`
pub async fn create() -> Json<NewSession> {
  Json(NewSession { session_id: Uuid::new_v4().to_string() })
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct History {
  pub messages: Vec<Message>,
}

/// `GET /api/history/{id}`
pub async fn history<S, R, G>(
  State(pipeline): State<Arc<ChatPipeline<S, R, G>>>,
  Path(id): Path<String>,
) -> Result<Json<History>, ApiError>
where
  S: SessionStore,
  R: Retriever,
  G: Generator,
{
  let messages = pipeline
    .store()
    .read_all(&id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(History { messages }))
}

// ─── Reset ────────────────────────────────────────────────────────────────────

/// `POST /api/reset/{id}`
pub async fn reset<S, R, G>(
  State(pipeline): State<Arc<ChatPipeline<S, R, G>>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: SessionStore,
  R: Retriever,
  G: Generator,
{
  pipeline.store().reset(&id).await.map_err(ApiError::store)?;
  tracing::info!(session_id = %id, "session reset");
  Ok(Json(json!({ "ok": true })))
}
