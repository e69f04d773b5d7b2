// src/scrape/pool.rs

//! Bounded, order-preserving worker pool used for intra-task fan-out.

use std::future::Future;

use futures::stream::{Stream, StreamExt};
use tokio::task::JoinError;
use tokio_util::task::AbortOnDropHandle;

/// Map `items` through `work` with at most `workers` calls in flight.
///
/// Each call is spawned onto the tokio runtime, so calls run in parallel
/// across worker threads. Results come out in input order. The pool pulls
/// the next input only when fewer than `workers` results are outstanding, so
/// a slow consumer holds back the input side instead of buffering without
/// bound.
///
/// Input errors are passed through in place and do not start a call.
///
/// Dropping the stream aborts every call still in flight.
pub fn map_ordered<T, E, O, F, Fut>(
    items: impl Stream<Item = Result<T, E>>,
    workers: usize,
    mut work: F,
) -> impl Stream<Item = Result<Result<O, JoinError>, E>>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = O> + Send + 'static,
    O: Send + 'static,
{
    items
        .map(move |item| {
            let handle = item.map(|item| AbortOnDropHandle::new(tokio::spawn(work(item))));
            async move {
                match handle {
                    Ok(handle) => Ok(handle.await),
                    Err(err) => Err(err),
                }
            }
        })
        .buffered(workers.max(1))
}
