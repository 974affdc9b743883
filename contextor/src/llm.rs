//! Chat-model seam used by the answer pipeline.

use std::sync::Arc;

use ai_llm_service::GenerationParams;
use ai_llm_service::service_profiles::LlmServiceProfiles;
use futures::future::BoxFuture;

use crate::error::ContextorError;

/// Anything that turns a `(system, user)` prompt pair into text.
pub trait ChatModel: Send + Sync {
    fn generate<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        params: GenerationParams,
    ) -> BoxFuture<'a, Result<String, ContextorError>>;
}

/// [`ChatModel`] backed by the chat profile of [`LlmServiceProfiles`].
pub struct LlmChat {
    svc: Arc<LlmServiceProfiles>,
}

impl LlmChat {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl ChatModel for LlmChat {
    fn generate<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        params: GenerationParams,
    ) -> BoxFuture<'a, Result<String, ContextorError>> {
        Box::pin(async move {
            self.svc
                .generate(user, Some(system), params)
                .await
                .map_err(|e| ContextorError::AnswerGeneration(e.to_string()))
        })
    }
}
