// src/write/concurrent.rs

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::WriteError;
use super::sink::RecordSink;

/// Default interval at which an idle commit loop re-checks for shutdown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Scoped writer lifecycle as seen by a task: open before producing, write
/// any number of items, close on every exit path.
pub trait TaskWriter<T>: Send + 'static {
    fn open(&mut self) -> impl Future<Output = Result<(), WriteError>> + Send;

    /// Hand one item to the writer without waiting for storage.
    fn write(&self, item: T) -> Result<(), WriteError>;

    fn close(&mut self) -> impl Future<Output = Result<WriteStats, WriteError>> + Send;
}

/// What a writer session committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub committed: u64,
}

/// How the commit loop ended. The sink comes back so the writer can be
/// reopened.
struct CommitLoopExit<S> {
    sink: S,
    committed: u64,
    error: Option<WriteError>,
}

/// Producer/consumer writer: any number of callers enqueue records, one
/// background commit loop drains them into the sink.
///
/// - [`open`](Self::open) opens the sink, then spawns the commit loop, which
///   takes ownership of it.
/// - [`write`](Self::write) is a non-blocking enqueue.
/// - [`close`](Self::close) signals the loop, waits for it to commit every
///   record enqueued so far and only then lets it close the sink.
///
/// Records from a single producer are committed in the order written;
/// across producers, in the order they reached the queue.
pub struct ConcurrentWriter<S: RecordSink> {
    sink: Option<S>,
    poll_interval: Duration,
    tx: Option<mpsc::UnboundedSender<S::Record>>,
    stop: CancellationToken,
    commit_loop: Option<JoinHandle<CommitLoopExit<S>>>,
    closed: bool,
}

impl<S: RecordSink> fmt::Debug for ConcurrentWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentWriter")
            .field("open", &self.is_open())
            .field("closed", &self.closed)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<S: RecordSink> ConcurrentWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Some(sink),
            poll_interval: DEFAULT_POLL_INTERVAL,
            tx: None,
            stop: CancellationToken::new(),
            commit_loop: None,
            closed: false,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_open(&self) -> bool {
        self.commit_loop.is_some()
    }

    /// The sink, while the writer is not open.
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Open the sink and start the commit loop.
    pub async fn open(&mut self) -> Result<(), WriteError> {
        if self.is_open() {
            return Err(WriteError::AlreadyOpen);
        }
        let mut sink = self.sink.take().ok_or_else(|| {
            WriteError::CommitLoop("sink was lost by a previous commit loop".to_string())
        })?;

        if let Err(err) = sink.open().await {
            self.sink = Some(sink);
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let handle = tokio::spawn(commit_loop(sink, rx, stop.clone(), self.poll_interval));

        self.tx = Some(tx);
        self.stop = stop;
        self.commit_loop = Some(handle);
        self.closed = false;
        debug!("concurrent writer opened");
        Ok(())
    }

    /// Enqueue one record. Never waits on the sink.
    pub fn write(&self, record: S::Record) -> Result<(), WriteError> {
        match &self.tx {
            Some(tx) => tx.send(record).map_err(|_| WriteError::Closed),
            None if self.closed => Err(WriteError::Closed),
            None => Err(WriteError::NotOpen),
        }
    }

    /// Enqueue every record of `records`, one by one.
    pub fn write_many(
        &self,
        records: impl IntoIterator<Item = S::Record>,
    ) -> Result<(), WriteError> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    /// Stop accepting records, wait until everything already queued is
    /// committed, then close the sink.
    ///
    /// Returns the first backend error the commit loop hit, if any.
    pub async fn close(&mut self) -> Result<WriteStats, WriteError> {
        let handle = self.commit_loop.take().ok_or(WriteError::NotOpen)?;

        self.tx = None;
        self.stop.cancel();
        self.closed = true;

        let exit = handle
            .await
            .map_err(|err| WriteError::CommitLoop(err.to_string()))?;
        self.sink = Some(exit.sink);

        debug!(committed = exit.committed, "concurrent writer closed");
        match exit.error {
            Some(err) => Err(err),
            None => Ok(WriteStats {
                committed: exit.committed,
            }),
        }
    }
}

impl<S: RecordSink> Drop for ConcurrentWriter<S> {
    fn drop(&mut self) {
        if self.commit_loop.is_some() {
            // The detached loop drains what is queued and closes the sink.
            debug!("concurrent writer dropped while open; stopping commit loop");
            self.stop.cancel();
        }
    }
}

impl<S: RecordSink> TaskWriter<S::Record> for ConcurrentWriter<S> {
    async fn open(&mut self) -> Result<(), WriteError> {
        ConcurrentWriter::open(self).await
    }

    fn write(&self, item: S::Record) -> Result<(), WriteError> {
        ConcurrentWriter::write(self, item)
    }

    async fn close(&mut self) -> Result<WriteStats, WriteError> {
        ConcurrentWriter::close(self).await
    }
}

/// Variant of [`ConcurrentWriter`] taking a collection per write; every
/// element is enqueued as its own record.
#[derive(Debug)]
pub struct MultiRecordWriter<S: RecordSink> {
    inner: ConcurrentWriter<S>,
}

impl<S: RecordSink> MultiRecordWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: ConcurrentWriter::new(sink),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.inner = self.inner.with_poll_interval(poll_interval);
        self
    }

    pub fn inner(&self) -> &ConcurrentWriter<S> {
        &self.inner
    }
}

impl<S: RecordSink> TaskWriter<Vec<S::Record>> for MultiRecordWriter<S> {
    async fn open(&mut self) -> Result<(), WriteError> {
        self.inner.open().await
    }

    fn write(&self, items: Vec<S::Record>) -> Result<(), WriteError> {
        self.inner.write_many(items)
    }

    async fn close(&mut self) -> Result<WriteStats, WriteError> {
        self.inner.close().await
    }
}

/// Drain `rx` into `sink` until stopped, then close the sink.
///
/// Each iteration waits at most `poll_interval` for a record, then checks the
/// stop token. Once stopped, the queue is closed to new records but anything
/// already in it is still committed before the loop exits.
async fn commit_loop<S: RecordSink>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<S::Record>,
    stop: CancellationToken,
    poll_interval: Duration,
) -> CommitLoopExit<S> {
    let mut committed: u64 = 0;
    let mut error = None;
    debug!("commit loop started");

    loop {
        match tokio::time::timeout(poll_interval, rx.recv()).await {
            Ok(Some(record)) => {
                if let Err(err) = sink.commit(record).await {
                    error!(error = %err, committed, "commit failed; stopping commit loop");
                    error = Some(err);
                    break;
                }
                committed += 1;
            }
            Ok(None) => break,
            Err(_elapsed) => trace!("commit loop idle"),
        }

        if stop.is_cancelled() {
            rx.close();
        }
    }

    drop(rx);
    if let Err(err) = sink.close().await {
        error!(error = %err, "closing sink failed");
        error.get_or_insert(err);
    }

    debug!(committed, "commit loop finished");
    CommitLoopExit {
        sink,
        committed,
        error,
    }
}
