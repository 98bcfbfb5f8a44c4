//! One grounded chat turn, start to finish, as a [`ChatPipeline`].
//!
//! Steps run strictly in order: validate, record the user turn, retrieve,
//! build the prompt, generate, record the assistant turn, respond. Only the
//! first three can fail the request; generation degrades to a sources-only
//! answer and a failed assistant write is logged, not surfaced.

use std::sync::Arc;

use newsrag_core::{
  clock::{Clock, SystemClock},
  message::{Message, Source},
  prompt::{UNSURE_ANSWER, build_prompt, fallback_answer},
  provider::{DEFAULT_TOP_K, Generator, Retriever},
  store::SessionStore,
};
use serde::Serialize;

use crate::error::ChatError;

/// The answer to one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
  pub answer:  String,
  /// One per retrieved passage, ranked from 1, whether or not generation
  /// succeeded.
  pub sources: Vec<Source>,
}

pub struct ChatPipeline<S, R, G> {
  store:     S,
  retriever: R,
  generator: G,
  clock:     Arc<dyn Clock>,
  top_k:     usize,
}

impl<S, R, G> ChatPipeline<S, R, G>
where
  S: SessionStore,
  R: Retriever,
  G: Generator,
{
  pub fn new(store: S, retriever: R, generator: G) -> Self {
    Self {
      store,
      retriever,
      generator,
      clock: Arc::new(SystemClock),
      top_k: DEFAULT_TOP_K,
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn retriever(&self) -> &R { &self.retriever }

  pub fn generator(&self) -> &G { &self.generator }

  /// Run one turn for `session_id`. Both inputs must be non-blank.
  pub async fn chat(
    &self,
    session_id: &str,
    message: &str,
  ) -> Result<ChatReply, ChatError> {
    let query = message.trim();
    if session_id.trim().is_empty() || query.is_empty() {
      return Err(ChatError::InvalidRequest);
    }

    let user_ts = self.clock.now_millis();
    self
      .store
      .append(session_id, &Message::user(message, user_ts))
      .await
      .map_err(|e| ChatError::StoreUnavailable(Box::new(e)))?;

    let passages = self
      .retriever
      .retrieve(query, self.top_k)
      .await
      .map_err(|e| ChatError::RetrievalUnavailable(Box::new(e)))?;

    let prompt = build_prompt(query, &passages);

    let answer = match self.generator.complete(&prompt).await {
      Ok(text) if text.trim().is_empty() => UNSURE_ANSWER.to_owned(),
      Ok(text) => text,
      Err(e) => {
        tracing::warn!(
          session_id,
          passages = passages.len(),
          error = %e,
          "generation unavailable; answering with sources only"
        );
        fallback_answer(&passages)
      }
    };

    let sources = Source::from_passages(&passages);

    let answer_ts = self.clock.now_millis().max(user_ts);
    let assistant = Message::assistant(answer.clone(), answer_ts, sources.clone());
    if let Err(e) = self.store.append(session_id, &assistant).await {
      tracing::error!(
        session_id,
        error = %e,
        "failed to record assistant turn; replying anyway"
      );
    }

    Ok(ChatReply { answer, sources })
  }
}
