//! Shared state for all HTTP handlers, plus the bootstrap used by both binaries.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, PoisonError};

use ai_llm_service::config::default_config::{chat_config_from_env, embedding_config_from_env};
use ai_llm_service::service_profiles::LlmServiceProfiles;
use contextor::{AnswerPipeline, ContextorConfig, LlmChat};
use rag_store::{LlmEmbedder, RagConfig, RagStore, normalize_value};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::error_handler::AppError;

/// One async mutex per `{dept, year}`; ingestions of the same scope queue up.
///
/// An entry lives only while someone holds or waits for it.
#[derive(Default)]
pub struct ScopeLocks {
    inner: std::sync::Mutex<HashMap<ScopeKey, Arc<Mutex<()>>>>,
}

type ScopeKey = (String, String);

impl ScopeLocks {
    pub async fn acquire(&self, dept: &str, year: &str) -> ScopeGuard<'_> {
        let key = (normalize_value(dept), normalize_value(year));
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(key.clone()).or_default())
        };
        ScopeGuard {
            locks: self,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    fn release(&self, key: &ScopeKey) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = map.get(key).is_some_and(|l| Arc::strong_count(l) == 1);
        if idle {
            map.remove(key);
        }
    }
}

/// Held for the duration of one ingest or delete.
pub struct ScopeGuard<'a> {
    locks: &'a ScopeLocks,
    key: ScopeKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.key);
    }
}

pub struct AppState {
    pub llm: Arc<LlmServiceProfiles>,
    pub store: RagStore,
    pub answers: AnswerPipeline,
    pub ingest_locks: ScopeLocks,
}

impl AppState {
    pub fn new(llm: Arc<LlmServiceProfiles>, store: RagStore, answers: AnswerPipeline) -> Self {
        Self {
            llm,
            store,
            answers,
            ingest_locks: ScopeLocks::default(),
        }
    }

    /// Builds every service from environment variables and connects the index.
    ///
    /// # Errors
    /// [`AppError::Config`] for any invalid setting or an unreachable index.
    pub async fn from_env() -> Result<Self, AppError> {
        let llm = Arc::new(
            LlmServiceProfiles::new(
                chat_config_from_env().map_err(startup)?,
                embedding_config_from_env().map_err(startup)?,
                Some(10),
            )
            .map_err(startup)?,
        );

        let rag_cfg = RagConfig::from_env().map_err(startup)?;
        let embedder = Arc::new(LlmEmbedder::new(Arc::clone(&llm)));
        let store = RagStore::connect(rag_cfg, embedder).await.map_err(startup)?;

        let answer_cfg = ContextorConfig::from_env(store.index().metric()).map_err(startup)?;
        let answers = AnswerPipeline::new(
            answer_cfg,
            store.embedder().clone(),
            store.index().clone(),
            Arc::new(LlmChat::new(Arc::clone(&llm))),
        )
        .map_err(startup)?;

        let (chat, embedding) = llm.profiles();
        info!(
            chat_model = %chat.model,
            embedding_model = %embedding.model,
            index = store.index().backend_name(),
            "services ready"
        );
        Ok(Self::new(llm, store, answers))
    }
}

fn startup(e: impl Display) -> AppError {
    AppError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_scope_is_serialized() {
        let locks = ScopeLocks::default();
        let held = locks.acquire("CS", "2024").await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(" cs ", "2024")).await;
        assert!(blocked.is_err());

        let other =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire("Physics", "2024")).await;
        assert!(other.is_ok());

        drop(held);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), locks.acquire("cs", "2024"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn released_scopes_are_forgotten() {
        let locks = Arc::new(ScopeLocks::default());
        let held = locks.acquire("CS", "2024").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.acquire("cs", "2024").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(locks.inner.lock().unwrap().len(), 1, "waiter keeps the entry");

        waiter.await.unwrap();
        assert!(locks.inner.lock().unwrap().is_empty());
    }
}
