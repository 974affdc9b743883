//! Retrieval & answer pipeline for student questions.
//!
//! [`AnswerPipeline::answer`] validates the question, embeds it once,
//! retrieves scoped matches, builds a budgeted context, asks the chat model
//! and grades the answer's confidence from the best match.

mod api_types;
mod cfg;
mod confidence;
mod error;
mod llm;
mod prompt;
mod retrieve;

pub use api_types::{AnswerFilter, AnswerResult, SourceRef};
pub use cfg::ContextorConfig;
pub use confidence::{Confidence, ConfidencePolicy};
pub use error::ContextorError;
pub use llm::{ChatModel, LlmChat};
pub use prompt::{NO_MATCH_ANSWER, SYSTEM_PROMPT, build_context, build_user_prompt};
pub use retrieve::{retrieve, scope_filter};

use std::sync::Arc;
use std::time::Instant;

use rag_store::{EmbeddingGateway, IndexGateway};
use tracing::{Instrument, info, info_span, warn};

/// Answers questions against one embedding gateway and index.
pub struct AnswerPipeline {
    cfg: ContextorConfig,
    embedder: EmbeddingGateway,
    index: IndexGateway,
    chat: Arc<dyn ChatModel>,
}

impl AnswerPipeline {
    /// # Errors
    /// `InvalidConfiguration` if the config is invalid for the index's metric.
    pub fn new(
        cfg: ContextorConfig,
        embedder: EmbeddingGateway,
        index: IndexGateway,
        chat: Arc<dyn ChatModel>,
    ) -> Result<Self, ContextorError> {
        cfg.validate(index.metric())?;
        Ok(Self {
            cfg,
            embedder,
            index,
            chat,
        })
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    /// Answers `question` using only syllabus content under `filter`.
    ///
    /// Zero matches yield [`NO_MATCH_ANSWER`] with low confidence and no model
    /// call; that is a success, not an error.
    ///
    /// # Example
    /// ```no_run
    /// # use contextor::{AnswerFilter, AnswerPipeline};
    /// # async fn demo(p: &AnswerPipeline) -> Result<(), contextor::ContextorError> {
    /// let filter = AnswerFilter { dept: "CS".into(), year: "2024".into(), semester: None };
    /// let res = p.answer("What is the marking scheme?", &filter).await?;
    /// println!("{} ({:?})", res.answer, res.confidence);
    /// # Ok(()) }
    /// ```
    pub async fn answer(
        &self,
        question: &str,
        filter: &AnswerFilter,
    ) -> Result<AnswerResult, ContextorError> {
        let question = self.check_question(question)?;
        let span = info_span!("answer", dept = %filter.dept, year = %filter.year);

        async {
            let started = Instant::now();
            let matches = retrieve(
                &self.embedder,
                &self.index,
                question,
                filter,
                self.cfg.top_k,
            )
            .await?;

            let Some(top) = matches.first() else {
                info!(latency_ms = started.elapsed().as_millis(), "no matches in scope");
                return Ok(AnswerResult {
                    answer: NO_MATCH_ANSWER.to_string(),
                    sources: Vec::new(),
                    confidence: Confidence::Low,
                });
            };
            let confidence = self.cfg.confidence.classify(top.score);

            let (context, used) = build_context(&matches, self.cfg.max_ctx_chars);
            let user = build_user_prompt(question, &context, used);
            let answer = self.generate(&user).await?;

            info!(
                hits = matches.len(),
                used,
                top_score = top.score,
                confidence = confidence.as_str(),
                latency_ms = started.elapsed().as_millis(),
                "answered"
            );
            Ok(AnswerResult {
                answer,
                sources: matches[..used].iter().map(SourceRef::from).collect(),
                confidence,
            })
        }
        .instrument(span)
        .await
    }

    fn check_question<'q>(&self, question: &'q str) -> Result<&'q str, ContextorError> {
        let q = question.trim();
        let len = q.chars().count();
        let (min, max) = (self.cfg.question_min_chars, self.cfg.question_max_chars);
        if len < min || len > max {
            return Err(ContextorError::InvalidQuestion { len, min, max });
        }
        Ok(q)
    }

    async fn generate(&self, user: &str) -> Result<String, ContextorError> {
        let started = Instant::now();
        let call = self.chat.generate(SYSTEM_PROMPT, user, self.cfg.generation);
        let text = match tokio::time::timeout(self.cfg.chat_timeout, call).await {
            Ok(res) => res.map_err(|e| match e {
                ContextorError::AnswerGeneration(_) => e,
                other => ContextorError::AnswerGeneration(other.to_string()),
            })?,
            Err(_) => {
                warn!(timeout_s = self.cfg.chat_timeout.as_secs(), "chat timed out");
                return Err(ContextorError::AnswerGeneration(format!(
                    "no answer within {}s",
                    self.cfg.chat_timeout.as_secs()
                )));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ContextorError::AnswerGeneration(
                "model returned an empty answer".into(),
            ));
        }
        info!(latency_ms = started.elapsed().as_millis(), chars = text.len(), "chat done");
        Ok(text.to_string())
    }
}
