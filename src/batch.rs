//! Chunked application of asynchronous operations over a collection.
//!
//! Broker management links reject overly large batches, so incremental
//! apply/remove sets are split into fixed-size chunks. Chunks run in
//! order and their results are assembled positionally; the first failing
//! chunk aborts the batch with its original error.

use std::future::Future;

/// Applies `f` over `items` in consecutive chunks of at most
/// `chunk_size` elements.
///
/// The last chunk may be smaller; an empty input yields an empty result
/// without invoking `f`. A chunk size of zero is treated as one. Results
/// arrive in chunk order.
///
/// # Errors
///
/// Fails with the exact error of the first failing chunk; later chunks
/// are not scheduled after a failure.
pub async fn apply_chunked<T, R, E, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    mut f: F,
) -> Result<Vec<R>, E>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let chunk_size = chunk_size.max(1);
    let mut results = Vec::with_capacity(items.len().div_ceil(chunk_size));

    let mut remaining = items.into_iter();
    loop {
        let chunk: Vec<T> = remaining.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        results.push(f(chunk).await?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sum_members(chunk: Vec<i64>) -> Result<i64, &'static str> {
        Ok(chunk.iter().sum())
    }

    #[tokio::test]
    async fn test_chunk_size_one() {
        let result = apply_chunked(vec![1, 2, 3, 4], 1, sum_members).await;
        assert_eq!(result, Ok(vec![1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn test_chunk_size_two() {
        let result = apply_chunked(vec![1, 2, 3, 4], 2, sum_members).await;
        assert_eq!(result, Ok(vec![3, 7]));
    }

    #[tokio::test]
    async fn test_incomplete_final_chunk() {
        let result = apply_chunked(vec![1, 2, 3, 4], 3, sum_members).await;
        assert_eq!(result, Ok(vec![6, 4]));
    }

    #[tokio::test]
    async fn test_chunk_size_larger_than_input() {
        let result = apply_chunked(vec![1, 2, 3, 4], 5, sum_members).await;
        assert_eq!(result, Ok(vec![10]));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = apply_chunked(Vec::<i64>::new(), 5, sum_members).await;
        assert_eq!(result, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_treated_as_one() {
        let result = apply_chunked(vec![1, 2], 0, sum_members).await;
        assert_eq!(result, Ok(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_failure_propagates_exact_error() {
        let result =
            apply_chunked(vec![1, 2, 3, 4], 5, |_chunk| async { Err::<i64, _>("urgh") }).await;
        assert_eq!(result, Err("urgh"));
    }

    #[tokio::test]
    async fn test_no_chunks_scheduled_after_failure() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = AtomicUsize::new(0);

        let result = apply_chunked(vec![1, 2, 3, 4, 5, 6], 2, |chunk| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if chunk[0] == 3 {
                    Err("boom")
                } else {
                    Ok(chunk.len())
                }
            }
        })
        .await;

        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
