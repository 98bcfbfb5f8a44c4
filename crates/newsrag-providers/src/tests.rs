//! Tests for the provider clients against small in-process fakes of the
//! Jina, Qdrant and Gemini HTTP APIs.

use std::{
  collections::VecDeque,
  sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
  },
  time::Duration,
};

use axum::{
  Json, Router,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, Uri},
  routing::post,
};
use newsrag_core::provider::{Generator, Retriever};
use serde_json::{Value, json};

use crate::{
  GeminiClient, GenerationError, JinaEmbedder, QdrantIndex, RetrievalError,
  RetryPolicy, VectorRetriever,
};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn serve(app: Router) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  format!("http://{addr}")
}

async fn unreachable_url() -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  format!("http://{addr}")
}

// ─── Fake Jina + Qdrant ──────────────────────────────────────────────────────

#[derive(Default)]
struct Search {
  embed_inputs:  Mutex<Vec<Value>>,
  search_bodies: Mutex<Vec<Value>>,
  index_fails:   bool,
}

type SharedSearch = Arc<Search>;

async fn embeddings(
  State(s): State<SharedSearch>,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
  let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
  if auth != Some("Bearer jina-key") {
    return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "bad key" })));
  }
  s.embed_inputs.lock().unwrap().push(body);
  (
    StatusCode::OK,
    Json(json!({ "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }] })),
  )
}

async fn search(
  State(s): State<SharedSearch>,
  Path(collection): Path<String>,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
  if s.index_fails {
    return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "status": "down" })));
  }
  assert_eq!(collection, "news");
  assert_eq!(
    headers.get("api-key").and_then(|v| v.to_str().ok()),
    Some("qdrant-key")
  );
  s.search_bodies.lock().unwrap().push(body);
  let result = json!([
    { "id": 7, "score": 0.91,
      "payload": { "title": "Rates held", "url": "https://n/1", "chunk": "The bank held rates." } },
    { "id": 3, "score": 0.74,
      "payload": { "title": "Markets", "url": "https://n/2", "chunk": "Stocks rallied." } },
    { "id": 9, "score": 0.40, "payload": { "url": "https://n/3" } }
  ]);
  (StatusCode::OK, Json(json!({ "result": result, "status": "ok" })))
}

async fn count(
  State(s): State<SharedSearch>,
  Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
  if s.index_fails {
    return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "status": "down" })));
  }
  assert_eq!(body, json!({ "exact": true }));
  (StatusCode::OK, Json(json!({ "result": { "count": 1234 } })))
}

async fn retriever_with(search_state: Search) -> (VectorRetriever, SharedSearch) {
  let shared = Arc::new(search_state);
  let app = Router::new()
    .route("/v1/embeddings", post(embeddings))
    .route("/collections/{collection}/points/search", post(search))
    .route("/collections/{collection}/points/count", post(count))
    .with_state(shared.clone());
  let url = serve(app).await;

  let embedder = JinaEmbedder::new(Some("jina-key".into()), TIMEOUT)
    .unwrap()
    .with_base_url(url.clone());
  let index =
    QdrantIndex::new(Some(url), Some("qdrant-key".into()), "news", TIMEOUT)
      .unwrap();
  (VectorRetriever::new(embedder, index), shared)
}

// ─── Retrieval ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn retrieve_maps_payloads_in_index_order() {
  let (r, state) = retriever_with(Search::default()).await;

  let passages = r.retrieve("what did the bank do?", 3).await.unwrap();

  let titles: Vec<&str> = passages.iter().map(|p| p.title.as_str()).collect();
  assert_eq!(titles, vec!["Rates held", "Markets", ""]);
  assert_eq!(passages[0].url, "https://n/1");
  assert_eq!(passages[0].chunk, "The bank held rates.");
  assert!((passages[0].score - 0.91).abs() < 1e-6);
  assert_eq!(passages[2].url, "https://n/3");
  assert_eq!(passages[2].chunk, "");

  let inputs = state.embed_inputs.lock().unwrap();
  assert_eq!(inputs.len(), 1);
  assert_eq!(inputs[0]["model"], "jina-embeddings-v3");
  assert_eq!(inputs[0]["input"], json!(["what did the bank do?"]));

  let bodies = state.search_bodies.lock().unwrap();
  assert_eq!(bodies[0]["limit"], 3);
  assert_eq!(bodies[0]["with_payload"], true);
  assert_eq!(bodies[0]["vector"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn retrieve_with_zero_k_makes_no_calls() {
  let (r, state) = retriever_with(Search::default()).await;
  assert!(r.retrieve("anything", 0).await.unwrap().is_empty());
  assert!(state.embed_inputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn document_count_reads_exact_count() {
  let (r, _) = retriever_with(Search::default()).await;
  assert_eq!(r.document_count().await.unwrap(), 1234);
}

#[tokio::test]
async fn index_failure_surfaces_as_retrieval_error() {
  let (r, _) =
    retriever_with(Search { index_fails: true, ..Search::default() }).await;

  assert!(matches!(
    r.retrieve("q", 5).await,
    Err(RetrievalError::Index { status: 500, .. })
  ));
  assert!(matches!(
    r.document_count().await,
    Err(RetrievalError::Index { status: 500, .. })
  ));
}

#[tokio::test]
async fn rejected_embedding_key_surfaces_as_retrieval_error() {
  let app = Router::new()
    .route("/v1/embeddings", post(embeddings))
    .with_state(Arc::new(Search::default()));
  let embedder = JinaEmbedder::new(Some("wrong".into()), TIMEOUT)
    .unwrap()
    .with_base_url(serve(app).await);
  assert!(matches!(
    embedder.embed("q").await,
    Err(RetrievalError::Embedding { status: 401, .. })
  ));
}

#[tokio::test]
async fn missing_retrieval_settings_are_reported() {
  let embedder = JinaEmbedder::new(None, TIMEOUT).unwrap();
  let index =
    QdrantIndex::new(Some(unreachable_url().await), None, "news", TIMEOUT)
      .unwrap();
  let r = VectorRetriever::new(embedder, index);
  assert!(matches!(
    r.retrieve("q", 5).await,
    Err(RetrievalError::NotConfigured("JINA_API_KEY"))
  ));

  let index = QdrantIndex::new(Some("  ".into()), None, "news", TIMEOUT).unwrap();
  assert!(matches!(
    index.count().await,
    Err(RetrievalError::NotConfigured("QDRANT_URL"))
  ));
}

#[tokio::test]
async fn unreachable_index_is_an_http_error() {
  let index =
    QdrantIndex::new(Some(unreachable_url().await), None, "news", TIMEOUT)
      .unwrap();
  assert!(matches!(index.count().await, Err(RetrievalError::Http(_))));
}

// ─── Fake Gemini ─────────────────────────────────────────────────────────────

/// Replays scripted replies in order; the last one repeats once the script
/// runs out.
struct Script {
  replies:  Mutex<VecDeque<(StatusCode, Value)>>,
  calls:    AtomicU32,
  last_uri: Mutex<Option<String>>,
  last_key: Mutex<Option<String>>,
  last_req: Mutex<Option<Value>>,
}

type SharedScript = Arc<Script>;

async fn generate(
  State(s): State<SharedScript>,
  uri: Uri,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
  s.calls.fetch_add(1, Ordering::SeqCst);
  *s.last_uri.lock().unwrap() = Some(uri.to_string());
  *s.last_key.lock().unwrap() = headers
    .get("x-goog-api-key")
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);
  *s.last_req.lock().unwrap() = Some(body);

  let mut replies = s.replies.lock().unwrap();
  let (status, value) = if replies.len() > 1 {
    replies.pop_front().unwrap()
  } else {
    replies.front().cloned().unwrap()
  };
  (status, Json(value))
}

fn ok(text: &str) -> (StatusCode, Value) {
  (
    StatusCode::OK,
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }),
  )
}

fn api_error(status: StatusCode, name: &str) -> (StatusCode, Value) {
  (
    status,
    json!({ "error": {
      "code": status.as_u16(), "message": "try later", "status": name
    } }),
  )
}

fn fast_retry() -> RetryPolicy {
  RetryPolicy {
    max_attempts:   3,
    base_delay:     Duration::from_millis(1),
    backoff_factor: 2,
    jitter:         Duration::ZERO,
  }
}

async fn gemini(
  replies: Vec<(StatusCode, Value)>,
) -> (GeminiClient, SharedScript) {
  let script = Arc::new(Script {
    replies:  Mutex::new(replies.into()),
    calls:    AtomicU32::new(0),
    last_uri: Mutex::new(None),
    last_key: Mutex::new(None),
    last_req: Mutex::new(None),
  });
  let app = Router::new().fallback(generate).with_state(script.clone());
  let url = serve(app).await;
  let client =
    GeminiClient::new(Some("gem-key".into()), "gemini-test", TIMEOUT)
      .unwrap()
      .with_base_url(url)
      .with_retry(fast_retry());
  (client, script)
}

// ─── Generation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn completes_and_sends_prompt_with_key_header() {
  let (g, script) = gemini(vec![ok("Rates held [S1].")]).await;

  assert_eq!(g.complete("PROMPT").await.unwrap(), "Rates held [S1].");
  assert_eq!(script.calls.load(Ordering::SeqCst), 1);
  assert_eq!(
    script.last_uri.lock().unwrap().as_deref(),
    Some("/v1beta/models/gemini-test:generateContent")
  );
  assert_eq!(script.last_key.lock().unwrap().as_deref(), Some("gem-key"));
  assert_eq!(
    script.last_req.lock().unwrap().clone().unwrap(),
    json!({ "contents": [{ "parts": [{ "text": "PROMPT" }] }] })
  );
}

#[tokio::test]
async fn persistent_rate_limit_exhausts_after_three_attempts() {
  let (g, script) =
    gemini(vec![api_error(StatusCode::TOO_MANY_REQUESTS, "RESOURCE_EXHAUSTED")])
      .await;

  let err = g.complete("p").await.unwrap_err();
  assert!(matches!(err, GenerationError::Unavailable { attempts: 3, .. }));
  assert_eq!(script.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn transient_unavailability_recovers() {
  let (g, script) = gemini(vec![
    api_error(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
    api_error(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
    ok("third time"),
  ])
  .await;

  assert_eq!(g.complete("p").await.unwrap(), "third time");
  assert_eq!(script.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn bad_request_is_not_retried() {
  let (g, script) =
    gemini(vec![api_error(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT")]).await;

  let err = g.complete("p").await.unwrap_err();
  assert!(matches!(err, GenerationError::Upstream { status: 400, .. }));
  assert!(!err.is_retryable());
  assert_eq!(script.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_payload_code_is_retried_even_with_200() {
  let (g, script) = gemini(vec![
    (
      StatusCode::OK,
      json!({ "error": { "code": 429, "message": "quota" } }),
    ),
    ok("after quota"),
  ])
  .await;

  assert_eq!(g.complete("p").await.unwrap(), "after quota");
  assert_eq!(script.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_json_error_body_is_upstream() {
  let (g, script) = gemini(vec![(StatusCode::BAD_GATEWAY, json!("gateway"))]).await;
  let err = g.complete("p").await.unwrap_err();
  assert!(matches!(err, GenerationError::Upstream { status: 502, .. }));
  assert_eq!(script.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concatenates_text_parts() {
  let (g, _) = gemini(vec![(
    StatusCode::OK,
    json!({ "candidates": [{ "content": { "parts": [
      { "text": "Part one. " }, { "text": "Part two." }
    ] } }] }),
  )])
  .await;
  assert_eq!(g.complete("p").await.unwrap(), "Part one. Part two.");
}

#[tokio::test]
async fn blank_candidate_is_empty_text_not_error() {
  let (g, _) = gemini(vec![(StatusCode::OK, json!({ "candidates": [] }))]).await;
  assert_eq!(g.complete("p").await.unwrap(), "");
}

#[tokio::test]
async fn missing_key_makes_no_calls() {
  let (_, script) = gemini(vec![ok("unused")]).await;
  let g = GeminiClient::new(None, "gemini-test", TIMEOUT)
    .unwrap()
    .with_base_url(unreachable_url().await);

  assert!(matches!(
    g.complete("p").await,
    Err(GenerationError::NotConfigured("GEMINI_API_KEY"))
  ));
  assert_eq!(script.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn retryable_class() {
  let upstream = |status, code, api_status: Option<&str>| {
    GenerationError::Upstream {
      status,
      code,
      api_status: api_status.map(str::to_owned),
      message: String::new(),
    }
  };
  assert!(upstream(429, None, None).is_retryable());
  assert!(upstream(503, None, None).is_retryable());
  assert!(upstream(200, Some(503), None).is_retryable());
  assert!(upstream(500, None, Some("RESOURCE_EXHAUSTED")).is_retryable());
  assert!(!upstream(401, Some(401), Some("UNAUTHENTICATED")).is_retryable());
  assert!(!upstream(500, None, None).is_retryable());
  assert!(!GenerationError::NotConfigured("GEMINI_API_KEY").is_retryable());
}
