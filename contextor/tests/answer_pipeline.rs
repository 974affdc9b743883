use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ai_llm_service::GenerationParams;
use contextor::{
    AnswerFilter, AnswerPipeline, ChatModel, Confidence, ContextorConfig, ContextorError,
    NO_MATCH_ANSWER,
};
use futures::future::BoxFuture;
use rag_store::{
    ChunkMetadata, DOC_TYPE_SYLLABUS, DistanceKind, EmbeddingConfig, EmbeddingGateway,
    EmbeddingsProvider, InMemoryIndex, IndexBackend, IndexConfig, IndexGateway, IndexedVector,
    RagError,
};

const DIM: usize = 4;

/// Every question lands on the first axis.
#[derive(Default)]
struct AxisEmbedder {
    calls: AtomicUsize,
}

impl EmbeddingsProvider for AxisEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect()) })
    }
}

enum Reply {
    Text(&'static str),
    Fail,
    Hang,
}

struct FakeChat {
    reply: Reply,
    calls: AtomicUsize,
    last_user: std::sync::Mutex<String>,
}

impl FakeChat {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_user: std::sync::Mutex::new(String::new()),
        }
    }
}

impl ChatModel for FakeChat {
    fn generate<'a>(
        &'a self,
        _system: &'a str,
        user: &'a str,
        _params: GenerationParams,
    ) -> BoxFuture<'a, Result<String, ContextorError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_user.lock() {
            *last = user.to_string();
        }
        Box::pin(async move {
            match self.reply {
                Reply::Text(t) => Ok(t.to_string()),
                Reply::Fail => Err(ContextorError::AnswerGeneration("401 invalid api key".into())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".into())
                }
            }
        })
    }
}

fn record(id: &str, dept: &str, idx: usize, vector: Vec<f32>, text: &str) -> IndexedVector {
    IndexedVector {
        id: id.into(),
        vector,
        metadata: ChunkMetadata {
            dept: dept.into(),
            year: "2024".into(),
            semester: Some("iii".into()),
            course_code: None,
            doc_type: DOC_TYPE_SYLLABUS.into(),
            source: format!("{dept}.pdf"),
            chunk_text: text.into(),
            chunk_index: idx,
            char_start: 0,
            char_end: text.chars().count(),
            section: "4. Evaluation".into(),
            section_type: "evaluation".into(),
            course_info: BTreeMap::new(),
        },
    }
}

struct Harness {
    pipeline: AnswerPipeline,
    embedder: Arc<AxisEmbedder>,
    chat: Arc<FakeChat>,
}

async fn harness(reply: Reply, records: Vec<IndexedVector>) -> Harness {
    let embedder = Arc::new(AxisEmbedder::default());
    let chat = Arc::new(FakeChat::new(reply));

    let index = IndexGateway::new(
        Arc::new(InMemoryIndex::new(DistanceKind::Cosine)),
        &IndexConfig::new_default(IndexBackend::Memory, DIM),
    );
    index
        .ensure_index_exists(DIM, DistanceKind::Cosine)
        .await
        .unwrap();
    if !records.is_empty() {
        index.upsert(&records).await.unwrap();
    }

    let gateway = EmbeddingGateway::new(
        embedder.clone(),
        &EmbeddingConfig {
            dim: DIM,
            ..EmbeddingConfig::default()
        },
    );
    let mut cfg = ContextorConfig::new(DistanceKind::Cosine);
    cfg.chat_timeout = Duration::from_millis(200);

    let pipeline = AnswerPipeline::new(cfg, gateway, index, chat.clone()).unwrap();
    Harness {
        pipeline,
        embedder,
        chat,
    }
}

fn filter(dept: &str, year: &str) -> AnswerFilter {
    AnswerFilter {
        dept: dept.into(),
        year: year.into(),
        semester: None,
    }
}

fn cs_records() -> Vec<IndexedVector> {
    vec![
        record("a", "cs", 0, vec![1.0, 0.0, 0.0, 0.0], "Mid term 30 marks, end term 70 marks."),
        record("b", "cs", 1, vec![0.7, 0.714, 0.0, 0.0], "Attendance below 75% bars the exam."),
        record("c", "cs", 2, vec![0.0, 1.0, 0.0, 0.0], "Textbook: CLRS."),
    ]
}

#[tokio::test]
async fn unknown_scope_gets_no_match_answer_without_llm() {
    let h = harness(Reply::Text("unused"), cs_records()).await;

    let res = h
        .pipeline
        .answer("What is the marking scheme?", &filter("Physics", "2099"))
        .await
        .unwrap();

    assert_eq!(res.answer, NO_MATCH_ANSWER);
    assert_eq!(res.confidence, Confidence::Low);
    assert!(res.sources.is_empty());
    assert_eq!(h.chat.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_question_makes_no_external_call() {
    let h = harness(Reply::Text("unused"), cs_records()).await;

    let long = "x".repeat(501);
    for q in ["  hi  ", "", long.as_str()] {
        let err = h.pipeline.answer(q, &filter("CS", "2024")).await.unwrap_err();
        assert!(matches!(err, ContextorError::InvalidQuestion { .. }), "{q:?}");
        assert_eq!(err.code(), "INVALID_QUESTION");
    }
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.chat.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn strong_match_answers_with_high_confidence() {
    let h = harness(Reply::Text("  Mid term 30, end term 70.  "), cs_records()).await;

    let res = h
        .pipeline
        .answer(" What is the marking scheme? ", &filter(" CS ", "2024"))
        .await
        .unwrap();

    assert_eq!(res.answer, "Mid term 30, end term 70.");
    assert_eq!(res.confidence, Confidence::High);
    assert_eq!(res.sources.len(), 3);
    assert_eq!(res.sources[0].chunk_index, 0);
    assert_eq!(res.sources[0].score, 1.0);
    assert_eq!(res.sources[0].section, "4. Evaluation");
    assert!(res.sources.windows(2).all(|w| w[0].score >= w[1].score));

    let user = h.chat.last_user.lock().unwrap().clone();
    assert!(user.starts_with("Context from syllabus (from 3 relevant sections):"));
    assert!(user.ends_with("Student question:\nWhat is the marking scheme?\n\nAnswer:"));
}

#[tokio::test]
async fn medium_top_score_gives_medium_confidence() {
    let records = vec![record("b", "cs", 1, vec![0.7, 0.714, 0.0, 0.0], "Attendance rules.")];
    let h = harness(Reply::Text("Attend 75%."), records).await;

    let res = h
        .pipeline
        .answer("What about attendance?", &filter("cs", "2024"))
        .await
        .unwrap();
    assert_eq!(res.confidence, Confidence::Medium);
}

#[tokio::test]
async fn semester_filter_narrows_scope() {
    let h = harness(Reply::Text("ok"), cs_records()).await;
    let mut f = filter("cs", "2024");
    f.semester = Some("V".into());

    let res = h.pipeline.answer("What is the marking scheme?", &f).await.unwrap();
    assert_eq!(res.answer, NO_MATCH_ANSWER);

    f.semester = Some("III".into());
    let res = h.pipeline.answer("What is the marking scheme?", &f).await.unwrap();
    assert_eq!(res.answer, "ok");
}

#[tokio::test]
async fn model_failure_is_not_downgraded() {
    let h = harness(Reply::Fail, cs_records()).await;
    let err = h
        .pipeline
        .answer("What is the marking scheme?", &filter("cs", "2024"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ANSWER_GENERATION_ERROR");
}

#[tokio::test]
async fn empty_or_slow_model_is_answer_generation_error() {
    let h = harness(Reply::Text("   "), cs_records()).await;
    let err = h
        .pipeline
        .answer("What is the marking scheme?", &filter("cs", "2024"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContextorError::AnswerGeneration(_)));

    let h = harness(Reply::Hang, cs_records()).await;
    let err = h
        .pipeline
        .answer("What is the marking scheme?", &filter("cs", "2024"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContextorError::AnswerGeneration(_)));
}

#[tokio::test]
async fn mismatched_confidence_metric_fails_construction() {
    let index = IndexGateway::new(
        Arc::new(InMemoryIndex::new(DistanceKind::Euclid)),
        &IndexConfig {
            metric: DistanceKind::Euclid,
            ..IndexConfig::new_default(IndexBackend::Memory, DIM)
        },
    );
    let gateway = EmbeddingGateway::new(
        Arc::new(AxisEmbedder::default()),
        &EmbeddingConfig {
            dim: DIM,
            ..EmbeddingConfig::default()
        },
    );
    let res = AnswerPipeline::new(
        ContextorConfig::new(DistanceKind::Cosine),
        gateway,
        index,
        Arc::new(FakeChat::new(Reply::Text("x"))),
    );
    assert!(matches!(res, Err(ContextorError::InvalidConfiguration(_))));
}
