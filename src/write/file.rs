// src/write/file.rs

//! File-backed sinks. Both truncate the target on open and write one record
//! per line.

use std::fmt::Display;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::WriteError;
use super::sink::RecordSink;

/// Writes each record's `Display` form as a line of text.
#[derive(Debug)]
pub struct FileSink<R> {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    _record: PhantomData<fn(R)>,
}

impl<R> FileSink<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Display + Send + 'static> RecordSink for FileSink<R> {
    type Record = R;

    async fn open(&mut self) -> Result<(), WriteError> {
        self.file = Some(create_truncated(&self.path).await?);
        Ok(())
    }

    async fn commit(&mut self, record: R) -> Result<(), WriteError> {
        let file = self.file.as_mut().ok_or(WriteError::NotOpen)?;
        let line = format!("{record}\n");
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }
}

/// Writes each record as a single line of JSON.
#[derive(Debug)]
pub struct JsonLinesSink<R> {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    _record: PhantomData<fn(R)>,
}

impl<R> JsonLinesSink<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Serialize + Send + 'static> RecordSink for JsonLinesSink<R> {
    type Record = R;

    async fn open(&mut self) -> Result<(), WriteError> {
        self.file = Some(create_truncated(&self.path).await?);
        Ok(())
    }

    async fn commit(&mut self, record: R) -> Result<(), WriteError> {
        let file = self.file.as_mut().ok_or(WriteError::NotOpen)?;
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        file.write_all(&line).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }
}

async fn create_truncated(path: &Path) -> Result<BufWriter<File>, WriteError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let file = File::create(path).await?;
    Ok(BufWriter::new(file))
}
