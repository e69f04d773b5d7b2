// src/write/log.rs

use std::fmt::Display;
use std::marker::PhantomData;

use tracing::warn;

use super::WriteError;
use super::sink::RecordSink;

/// Sends each record to the log at WARN. Used as the error sink of tasks that
/// have no error file configured.
#[derive(Debug, Clone)]
pub struct TracingSink<R> {
    name: String,
    _record: PhantomData<fn(R)>,
}

impl<R> TracingSink<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _record: PhantomData,
        }
    }
}

impl<R: Display + Send + 'static> RecordSink for TracingSink<R> {
    type Record = R;

    async fn open(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    async fn commit(&mut self, record: R) -> Result<(), WriteError> {
        warn!(sink = %self.name, "{record}");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        Ok(())
    }
}
