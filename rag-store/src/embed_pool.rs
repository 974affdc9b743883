//! Batched embedding executor with bounded concurrency.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;

/// Splits `texts` into batches of at most `max_batch`, embeds them with up to
/// `concurrency` calls in flight and concatenates the results in input order.
///
/// Each call is bounded by `timeout`; a timed-out call is an
/// [`RagError::EmbeddingService`]. The first failing batch aborts the rest.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingsProvider,
    texts: &[String],
    max_batch: usize,
    concurrency: usize,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, RagError> {
    let batches: Vec<Vec<String>> = texts.chunks(max_batch.max(1)).map(<[String]>::to_vec).collect();
    debug!(
        total = texts.len(),
        batches = batches.len(),
        concurrency,
        "embed_pool: dispatching"
    );

    let mut results: Vec<(usize, Vec<Vec<f32>>)> = stream::iter(batches.into_iter().enumerate())
        .map(|(idx, batch)| async move {
            let started = Instant::now();
            let vectors = tokio::time::timeout(timeout, provider.embed_batch(&batch))
                .await
                .map_err(|_| {
                    warn!(batch = idx, timeout_ms = timeout.as_millis(), "embedding call timed out");
                    RagError::EmbeddingService(format!(
                        "embedding call timed out after {}ms",
                        timeout.as_millis()
                    ))
                })??;
            if vectors.len() != batch.len() {
                return Err(RagError::EmbeddingService(format!(
                    "batch {idx}: expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            debug!(
                batch = idx,
                size = batch.len(),
                latency_ms = started.elapsed().as_millis(),
                "embed_pool: batch done"
            );
            Ok::<_, RagError>((idx, vectors))
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await?;

    results.sort_by_key(|(idx, _)| *idx);
    Ok(results.into_iter().flat_map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `[len, first byte]` per text and counts calls.
    struct Echo {
        calls: AtomicUsize,
    }

    impl EmbeddingsProvider for Echo {
        fn embed_batch<'a>(
            &'a self,
            texts: &'a [String],
        ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(texts
                    .iter()
                    .map(|t| vec![t.len() as f32, t.bytes().next().unwrap_or(0) as f32])
                    .collect())
            })
        }
    }

    #[tokio::test]
    async fn splits_and_preserves_order() {
        let texts: Vec<String> = (0..10).map(|i| "x".repeat(i + 1)).collect();
        let echo = Echo {
            calls: AtomicUsize::new(0),
        };
        let out = embed_in_batches(&echo, &texts, 3, 2, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(echo.calls.load(Ordering::SeqCst), 4);
        let lens: Vec<f32> = out.iter().map(|v| v[0]).collect();
        assert_eq!(lens, (1..=10).map(|i| i as f32).collect::<Vec<_>>());
    }

    struct Stalled;

    impl EmbeddingsProvider for Stalled {
        fn embed_batch<'a>(
            &'a self,
            _texts: &'a [String],
        ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
            Box::pin(futures::future::pending())
        }
    }

    #[tokio::test]
    async fn timeout_becomes_service_error() {
        let texts = vec!["a".to_string()];
        let err = embed_in_batches(&Stalled, &texts, 8, 1, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmbeddingService(_)));
    }
}
