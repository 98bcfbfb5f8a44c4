//! Session logs in a managed Redis reached through the
//! Upstash REST API.
//!
//! Commands are sent as JSON arrays (`["RPUSH", key, value]`) with a bearer
//! token. Each reply is `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use newsrag_core::{
  message::Message,
  store::{LAST_INGEST_KEY, SESSION_TTL, SessionStore, session_key},
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct Reply {
  #[serde(default)]
  result: Value,
  error:  Option<String>,
}

impl Reply {
  fn into_result(self) -> Result<Value> {
    match self.error {
      Some(e) => Err(Error::Upstash(e)),
      None => Ok(self.result),
    }
  }
}

/// A session store backed by Upstash Redis over HTTPS.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct UpstashStore {
  client:   Client,
  base_url: String,
  token:    String,
}

impl UpstashStore {
  /// Every request is bounded by `timeout`.
  pub fn new(
    base_url: impl Into<String>,
    token: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
      token: token.into(),
    })
  }

  /// Run a single command.
  async fn command(&self, args: &[&str]) -> Result<Value> {
    let resp = self
      .client
      .post(&self.base_url)
      .bearer_auth(&self.token)
      .json(args)
      .send()
      .await?;

    let status = resp.status();
    let body = resp.text().await?;
    match serde_json::from_str::<Reply>(&body) {
      Ok(reply) if status.is_success() => reply.into_result(),
      Ok(Reply { error: Some(e), .. }) => {
        Err(Error::Upstash(format!("{status}: {e}")))
      }
      _ => Err(Error::Upstash(format!("{status}: {body}"))),
    }
  }

  /// Run several commands in one round trip. Replies come back in command
  /// order; the batch is not atomic.
  async fn pipeline(&self, commands: &[Vec<&str>]) -> Result<Vec<Reply>> {
    let resp = self
      .client
      .post(format!("{}/pipeline", self.base_url))
      .bearer_auth(&self.token)
      .json(commands)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Upstash(format!("{status}: {body}")));
    }

    let replies: Vec<Reply> = resp.json().await?;
    if replies.len() != commands.len() {
      return Err(Error::Upstash(format!(
        "pipeline returned {} replies for {} commands",
        replies.len(),
        commands.len()
      )));
    }
    Ok(replies)
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for UpstashStore {
  type Error = Error;

  async fn append(&self, session_id: &str, message: &Message) -> Result<()> {
    let key = session_key(session_id);
    let payload = message.encode()?;
    let ttl = SESSION_TTL.as_secs().to_string();

    let mut replies = self
      .pipeline(&[
        vec!["RPUSH", key.as_str(), payload.as_str()],
        vec!["EXPIRE", key.as_str(), ttl.as_str()],
      ])
      .await?
      .into_iter();

    // Lengths were checked by `pipeline`.
    if let Some(push) = replies.next() {
      push.into_result()?;
    }
    if let Some(Err(e)) = replies.next().map(Reply::into_result) {
      tracing::warn!(
        session_id,
        error = %e,
        "message appended but session TTL refresh failed"
      );
    }
    Ok(())
  }

  async fn read_all(&self, session_id: &str) -> Result<Vec<Message>> {
    let key = session_key(session_id);
    let value = self.command(&["LRANGE", key.as_str(), "0", "-1"]).await?;

    let items = match value {
      Value::Array(items) => items,
      Value::Null => Vec::new(),
      other => {
        return Err(Error::Upstash(format!(
          "LRANGE returned a non-list value: {other}"
        )));
      }
    };

    items
      .iter()
      .map(|item| match item {
        Value::String(raw) => Ok(Message::decode(raw)?),
        other => Err(Error::Upstash(format!(
          "LRANGE returned a non-string element: {other}"
        ))),
      })
      .collect()
  }

  async fn reset(&self, session_id: &str) -> Result<()> {
    let key = session_key(session_id);
    self.command(&["DEL", key.as_str()]).await?;
    Ok(())
  }

  async fn refresh_ttl(&self, session_id: &str, ttl: Duration) -> Result<()> {
    let key = session_key(session_id);
    let secs = ttl.as_secs().to_string();
    self.command(&["EXPIRE", key.as_str(), secs.as_str()]).await?;
    Ok(())
  }

  async fn last_ingest_at(&self) -> Result<Option<String>> {
    match self.command(&["GET", LAST_INGEST_KEY]).await? {
      Value::Null => Ok(None),
      Value::String(s) => Ok(Some(s)),
      other => Ok(Some(other.to_string())),
    }
  }
}
