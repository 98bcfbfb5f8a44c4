//! Chat messages and citations.
//!
//! A session's history is an ordered, append-only sequence of [`Message`]s.
//! Messages are never updated once written.

use serde::{Deserialize, Serialize};

use crate::{Result, passage::Passage};

// ─── Role ────────────────────────────────────────────────────────────────────

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// A citation attached to an assistant answer.
///
/// `rank` is the 1-based position of the passage in the retrieval result and
/// matches the `[S<rank>]` markers the prompt asks the model to emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  #[serde(rename = "id")]
  pub rank:  usize,
  pub title: String,
  pub url:   String,
}

impl Source {
  /// Derive citations 1:1 from passages, preserving retrieval order.
  pub fn from_passages(passages: &[Passage]) -> Vec<Source> {
    passages
      .iter()
      .enumerate()
      .map(|(i, p)| Source {
        rank:  i + 1,
        title: p.title.clone(),
        url:   p.url.clone(),
      })
      .collect()
  }
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub role:      Role,
  pub content:   String,
  /// Epoch milliseconds, assigned by the server when the turn is recorded.
  pub timestamp: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sources:   Option<Vec<Source>>,
}

impl Message {
  pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
    Self {
      role: Role::User,
      content: content.into(),
      timestamp,
      sources: None,
    }
  }

  pub fn assistant(
    content: impl Into<String>,
    timestamp: i64,
    sources: Vec<Source>,
  ) -> Self {
    Self {
      role: Role::Assistant,
      content: content.into(),
      timestamp,
      sources: Some(sources),
    }
  }

  /// The JSON form stored as one list element by the key/value backends.
  pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn decode(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }
}
