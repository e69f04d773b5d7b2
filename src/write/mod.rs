// src/write/mod.rs

//! Persisting scrape results.
//!
//! Many producers hand records to a [`ConcurrentWriter`], which queues them
//! and lets a single background commit loop perform the actual storage
//! write. The storage backend is a [`RecordSink`] and is only ever touched by
//! that loop, so it needs no synchronisation of its own.
//!
//! - [`sink`] defines the backend trait.
//! - [`concurrent`] holds the writer, its multi-record variant and the
//!   [`TaskWriter`] lifecycle trait used by scrape tasks.
//! - [`file`], [`memory`] and [`log`] are the bundled backends.

use thiserror::Error;

pub mod concurrent;
pub mod file;
pub mod log;
pub mod memory;
pub mod sink;

pub use concurrent::{ConcurrentWriter, MultiRecordWriter, TaskWriter, WriteStats};
pub use file::{FileSink, JsonLinesSink};
pub use log::TracingSink;
pub use memory::MemorySink;
pub use sink::RecordSink;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("writer is not open")]
    NotOpen,

    #[error("writer is already open")]
    AlreadyOpen,

    #[error("writer is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialisation error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("commit loop failed: {0}")]
    CommitLoop(String),
}
