//! Chunk dispatcher: pure fan-out with per-chunk retry and ordered output.
//!
//! For `N` chunks, `N` workers run concurrently, each owning one chunk and
//! one failover chain. Results come back over a typed channel carrying the
//! chunk index; after collection, failed chunks are retried sequentially
//! (up to 3 additional attempts, 2 s apart) and exhausted chunks fall back
//! to a neutral verdict. The output sequence always has one verdict per
//! chunk, ordered by chunk index regardless of completion order. A failing
//! chunk never cancels its siblings.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::Error;
use crate::review::chunk::Chunk;
use crate::review::verdict::Verdict;

/// Additional sequential attempts after the concurrent pass failed.
const CHUNK_RETRIES: usize = 3;

/// Pause between retry attempts.
const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Reviews every chunk through `review_one`, which owns prompt assembly,
/// the provider chain and verdict parsing for a single chunk.
pub async fn review_chunks<F, Fut>(chunks: &[Chunk], review_one: F) -> Vec<Verdict>
where
    F: Fn(Chunk) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Verdict, Error>> + Send + 'static,
{
    let total = chunks.len();
    if total == 0 {
        return Vec::new();
    }

    let (tx, mut rx) = mpsc::channel::<(usize, Result<Verdict, Error>)>(total);
    for chunk in chunks.iter().cloned() {
        let tx = tx.clone();
        let review = review_one.clone();
        tokio::spawn(async move {
            let index = chunk.index;
            let result = review(chunk).await;
            let _ = tx.send((index, result)).await;
        });
    }
    drop(tx);

    let mut slots: Vec<Option<Result<Verdict, Error>>> = (0..total).map(|_| None).collect();
    while let Some((index, result)) = rx.recv().await {
        if let Some(slot) = slots.get_mut(index - 1) {
            *slot = Some(result);
        }
    }

    let mut verdicts = Vec::with_capacity(total);
    for (i, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(verdict)) => {
                debug!("chunk {}/{total} reviewed", i + 1);
                verdicts.push(verdict);
            }
            outcome => {
                if let Some(Err(e)) = outcome {
                    warn!("chunk {}/{total} failed: {e}; retrying", i + 1);
                } else {
                    warn!("chunk {}/{total} produced no result; retrying", i + 1);
                }
                verdicts.push(retry_chunk(&chunks[i], &review_one, total).await);
            }
        }
    }
    verdicts
}

/// Sequential retries for one failed chunk; the first success wins and an
/// exhausted chunk contributes a neutral verdict.
async fn retry_chunk<F, Fut>(chunk: &Chunk, review_one: &F, total: usize) -> Verdict
where
    F: Fn(Chunk) -> Fut,
    Fut: Future<Output = Result<Verdict, Error>>,
{
    for attempt in 1..=CHUNK_RETRIES {
        match review_one(chunk.clone()).await {
            Ok(verdict) => {
                debug!(
                    "retry {attempt}/{CHUNK_RETRIES} succeeded for chunk {}/{total}",
                    chunk.index
                );
                return verdict;
            }
            Err(e) => {
                warn!(
                    "retry {attempt}/{CHUNK_RETRIES} failed for chunk {}/{total}: {e}",
                    chunk.index
                );
                if attempt < CHUNK_RETRIES {
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
    }
    warn!(
        "all retries exhausted for chunk {}/{total}; recording a neutral verdict",
        chunk.index
    );
    Verdict::neutral()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn chunks_of(n: usize) -> Vec<Chunk> {
        (1..=n)
            .map(|index| Chunk {
                index,
                total: n,
                body: format!("chunk body {index}"),
                approx_tokens: 4,
            })
            .collect()
    }

    fn verdict_for(index: usize) -> Verdict {
        Verdict {
            lgtm: true,
            summary: format!("summary {index}"),
            ..Verdict::neutral()
        }
    }

    #[tokio::test]
    async fn output_is_ordered_by_index_regardless_of_completion() {
        let chunks = chunks_of(4);
        // Earlier chunks finish later.
        let verdicts = review_chunks(&chunks, |chunk: Chunk| async move {
            let delay = 40 - chunk.index as u64 * 10;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(verdict_for(chunk.index))
        })
        .await;

        assert_eq!(verdicts.len(), 4);
        for (i, verdict) in verdicts.iter().enumerate() {
            assert_eq!(verdict.summary, format!("summary {}", i + 1));
        }
    }

    #[tokio::test]
    async fn failed_chunks_are_retried_and_first_success_wins() {
        tokio::time::pause();
        let attempts = Arc::new(AtomicUsize::new(0));
        let chunks = chunks_of(1);

        let counter = attempts.clone();
        let handle = tokio::spawn(async move {
            review_chunks(&chunks, move |chunk: Chunk| {
                let counter = counter.clone();
                async move {
                    // Fail the concurrent pass and the first retry.
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::Provider(ProviderError::Server(500)))
                    } else {
                        Ok(verdict_for(chunk.index))
                    }
                }
            })
            .await
        });
        let verdicts = handle.await.expect("join");

        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].summary, "summary 1");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_chunks_fall_back_to_neutral_without_cancelling_siblings() {
        tokio::time::pause();
        let chunks = chunks_of(3);

        let handle = tokio::spawn(async move {
            review_chunks(&chunks, |chunk: Chunk| async move {
                if chunk.index == 2 {
                    Err(Error::Provider(ProviderError::Timeout))
                } else {
                    Ok(verdict_for(chunk.index))
                }
            })
            .await
        });
        let verdicts = handle.await.expect("join");

        assert_eq!(verdicts.len(), 3);
        assert_eq!(verdicts[0].summary, "summary 1");
        assert_eq!(verdicts[1], Verdict::neutral());
        assert_eq!(verdicts[2].summary, "summary 3");
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let verdicts = review_chunks(&[], |chunk: Chunk| async move {
            Ok(verdict_for(chunk.index))
        })
        .await;
        assert!(verdicts.is_empty());
    }
}
