//! `POST /api/chat`, body: `{"sessionId":"…","message":"…"}`

use std::sync::Arc;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use newsrag_core::{
  provider::{Generator, Retriever},
  store::SessionStore,
};
use serde::Deserialize;

use crate::{
  error::{ApiError, ChatError},
  pipeline::{ChatPipeline, ChatReply},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
  pub session_id: Option<String>,
  pub message:    Option<String>,
}

/// Bodies that fail to parse are reported the same way as missing fields.
pub async fn handler<S, R, G>(
  State(pipeline): State<Arc<ChatPipeline<S, R, G>>>,
  body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError>
where
  S: SessionStore,
  R: Retriever,
  G: Generator,
{
  let Ok(Json(body)) = body else {
    return Err(ChatError::InvalidRequest.into());
  };
  let reply = pipeline
    .chat(
      body.session_id.as_deref().unwrap_or_default(),
      body.message.as_deref().unwrap_or_default(),
    )
    .await?;
  Ok(Json(reply))
}
