// src/read/mod.rs

//! Input readers.
//!
//! A [`Reader`] hands a task a lazy sequence of input items. Every call to
//! [`Reader::read`] starts again from the beginning. Readers are consumed by
//! a single task; when the task fans items out to a worker pool it does so
//! from its own loop, so readers need not be thread-safe beyond `Send`.

use futures::stream::{self, Stream};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod csv;
pub mod lines;

pub use self::csv::CsvReader;
pub use self::lines::LineReader;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Lazy sequence of items produced by a reader.
pub type RecordIter<T> = Box<dyn Iterator<Item = Result<T, ReadError>> + Send>;

/// Drive a blocking item iterator on tokio's blocking pool and expose it as
/// a stream.
///
/// At most `buffer` items are read ahead of the consumer. Dropping the stream
/// stops the reading thread at its next item.
pub fn stream_blocking<T: Send + 'static>(
    items: RecordIter<T>,
    buffer: usize,
) -> impl Stream<Item = Result<T, ReadError>> + Send + 'static {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    tokio::task::spawn_blocking(move || {
        for item in items {
            if tx.blocking_send(item).is_err() {
                break;
            }
        }
    });
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
}

pub trait Reader: Send + 'static {
    type Item: Send + 'static;

    /// Start a fresh pass over the input.
    fn read(&self) -> Result<RecordIter<Self::Item>, ReadError>;
}

/// Reader over an in-memory list of items; each pass yields clones.
#[derive(Debug, Clone, Default)]
pub struct VecReader<T> {
    items: Vec<T>,
}

impl<T> VecReader<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> FromIterator<T> for VecReader<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: Clone + Send + Sync + 'static> Reader for VecReader<T> {
    type Item = T;

    fn read(&self) -> Result<RecordIter<T>, ReadError> {
        Ok(Box::new(self.items.clone().into_iter().map(Ok)))
    }
}
