use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use ai_llm_service::{GenerationParams, LlmModelConfig, LlmProvider};
use api::{AppState, router};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use contextor::{AnswerPipeline, ChatModel, ContextorConfig, ContextorError, NO_MATCH_ANSWER};
use futures::future::BoxFuture;
use rag_store::{
    ChunkStrategy, ChunkingConfig, DistanceKind, DocumentExtractor, EmbeddingConfig,
    EmbeddingsProvider, ExtractConfig, IndexBackend, IndexConfig, RagConfig, RagError, RagStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const DIM: usize = 8;

struct HashEmbedder;

impl EmbeddingsProvider for HashEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
        Box::pin(async move {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut h = DefaultHasher::new();
                    t.hash(&mut h);
                    let bits = h.finish();
                    (0..DIM)
                        .map(|i| ((bits >> (i * 8)) & 0xff) as f32 / 255.0 + 0.01)
                        .collect()
                })
                .collect())
        })
    }
}

#[derive(Default)]
struct CannedChat {
    calls: AtomicUsize,
}

impl ChatModel for CannedChat {
    fn generate<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
        _params: GenerationParams,
    ) -> BoxFuture<'a, Result<String, ContextorError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok("Mid term 30 marks, end term 70 marks.".to_string()) })
    }
}

fn unreachable_llm() -> LlmModelConfig {
    LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: "unused".into(),
        endpoint: "http://127.0.0.1:9".into(),
        api_key: None,
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(1),
    }
}

async fn app() -> (Router, Arc<CannedChat>) {
    let cfg = RagConfig {
        chunking: ChunkingConfig {
            size: 200,
            overlap: 40,
            strategy: ChunkStrategy::Fixed,
        },
        embedding: EmbeddingConfig {
            dim: DIM,
            max_batch: 4,
            concurrency: 2,
            timeout: Duration::from_secs(5),
        },
        index: IndexConfig::new_default(IndexBackend::Memory, DIM),
        extract: ExtractConfig::default(),
    };
    let extractor = Arc::new(DocumentExtractor::new(&cfg.extract).unwrap());
    let store = RagStore::connect_with(cfg, Arc::new(HashEmbedder), extractor)
        .await
        .unwrap();

    let chat = Arc::new(CannedChat::default());
    let answers = AnswerPipeline::new(
        ContextorConfig::new(DistanceKind::Cosine),
        store.embedder().clone(),
        store.index().clone(),
        chat.clone(),
    )
    .unwrap();
    let llm = Arc::new(LlmServiceProfiles::new(unreachable_llm(), unreachable_llm(), Some(1)).unwrap());

    (router(Arc::new(AppState::new(llm, store, answers))), chat)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn syllabus() -> String {
    (1..=6)
        .map(|i| {
            format!(
                "{i}. Unit {i}\nGraphs, trees and hashing. Internal assessment carries 30 marks \
                 and the end term exam 70 marks.\n"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn chat_on_unknown_scope_answers_without_llm() {
    let (app, chat) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({ "question": "What is the marking scheme?", "dept": "Physics", "year": "2099" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["answer"], NO_MATCH_ANSWER);
    assert_eq!(body["data"]["confidence"], "low");
    assert_eq!(body["data"]["sources"], json!([]));
    assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ingest_chat_delete_round() {
    let (app, chat) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/ingest",
        Some(json!({ "text": syllabus(), "source": "cs-syllabus", "dept": "CS", "year": "2024" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let stored = body["data"]["vectors_stored"].as_u64().unwrap();
    assert!(stored > 0);
    assert_eq!(body["data"]["chunks_processed"].as_u64(), Some(stored));

    let ask = json!({ "question": "How are marks split?", "dept": "cs", "year": "2024" });
    let (status, body) = send(&app, Method::POST, "/chat", Some(ask.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["answer"], "Mid term 30 marks, end term 70 marks.");
    assert_eq!(body["data"]["sources"][0]["source"], "cs-syllabus");
    assert_eq!(chat.calls.load(Ordering::SeqCst), 1);

    let (status, body) = send(&app, Method::DELETE, "/ingest?dept=CS&year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"].as_u64(), Some(stored));

    let (_, body) = send(&app, Method::POST, "/chat", Some(ask)).await;
    assert_eq!(body["data"]["answer"], NO_MATCH_ANSWER);
}

#[tokio::test]
async fn ingest_refuses_local_paths() {
    let (app, _) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/ingest",
        Some(json!({ "path": "/etc/passwd", "dept": "CS", "year": "2024" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["details"][0]["path"], "path");
}

#[tokio::test]
async fn empty_document_reports_failed_stage() {
    let (app, _) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/ingest",
        Some(json!({ "text": " \n 12 \n Page 3 \n", "dept": "CS", "year": "2024" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "EMPTY_DOCUMENT");
    assert_eq!(body["error"]["details"][0]["path"], "stage.extracting");
}

#[tokio::test]
async fn bad_requests_use_the_envelope() {
    let (app, _) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({ "question": "hi", "dept": "CS", "year": "2024" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUESTION");

    let (status, body) = send(&app, Method::DELETE, "/ingest?dept=&year=2024", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({ "question": "What is the marking scheme?" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["details"][0]["path"], "dept");
}
