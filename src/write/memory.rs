// src/write/memory.rs

use std::sync::{Arc, Mutex, PoisonError};

use super::WriteError;
use super::sink::RecordSink;

/// Keeps committed records in memory so they can be inspected after a run.
///
/// Clones share the same storage, so keep one clone around before handing
/// the sink to a writer.
#[derive(Debug)]
pub struct MemorySink<R> {
    records: Arc<Mutex<Vec<R>>>,
}

impl<R> Clone for MemorySink<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R> Default for MemorySink<R> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<R> MemorySink<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Clone> MemorySink<R> {
    /// Snapshot of everything committed so far, in commit order.
    pub fn records(&self) -> Vec<R> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<R: Send + 'static> RecordSink for MemorySink<R> {
    type Record = R;

    async fn open(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    async fn commit(&mut self, record: R) -> Result<(), WriteError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        Ok(())
    }
}
