//! JSON HTTP API for the newsrag chat service.
//!
//! Exposes an axum [`Router`] backed by a [`ChatPipeline`] over any
//! [`SessionStore`], [`Retriever`] and [`Generator`]. CORS, tracing and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = newsrag_api::router(Arc::new(pipeline)).layer(cors);
//! ```

pub mod chat;
pub mod error;
pub mod pipeline;
pub mod sessions;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use newsrag_core::{
  provider::{Generator, Retriever},
  store::SessionStore,
};

pub use error::{ApiError, ChatError};
pub use pipeline::{ChatPipeline, ChatReply};

/// Build the full router, `/health` included.
pub fn router<S, R, G>(pipeline: Arc<ChatPipeline<S, R, G>>) -> Router<()>
where
  S: SessionStore + 'static,
  R: Retriever + 'static,
  G: Generator + 'static,
{
  Router::new()
    // Sessions
    .route("/api/session/new", post(sessions::create))
    .route("/api/history/{id}", get(sessions::history::<S, R, G>))
    .route("/api/reset/{id}", post(sessions::reset::<S, R, G>))
    // Chat
    .route("/api/chat", post(chat::handler::<S, R, G>))
    // Read-only
    .route("/api/stats", get(stats::handler::<S, R, G>))
    .route("/health", get(stats::health))
    .with_state(pipeline)
}
