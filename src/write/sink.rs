// src/write/sink.rs

use std::future::Future;

use super::WriteError;

/// Storage backend behind a [`ConcurrentWriter`](super::ConcurrentWriter).
///
/// The writer moves the sink into its commit loop on open, so every call
/// happens from that one loop, one at a time: `open`, then any number of
/// `commit`s, then `close`. Implementations need not be thread-safe.
pub trait RecordSink: Send + 'static {
    type Record: Send + 'static;

    /// Acquire the backing resource (open a file, connect, ...).
    fn open(&mut self) -> impl Future<Output = Result<(), WriteError>> + Send;

    /// Persist a single record.
    fn commit(&mut self, record: Self::Record)
    -> impl Future<Output = Result<(), WriteError>> + Send;

    /// Flush and release the backing resource.
    fn close(&mut self) -> impl Future<Output = Result<(), WriteError>> + Send;
}
