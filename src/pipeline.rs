// src/pipeline.rs

//! Turning a validated [`ConfigFile`] into a ready-to-run [`Runner`].
//!
//! Every `[task.<name>]` becomes a [`CommandTask`]: its input file is read
//! line by line or as CSV, each item is handed to a [`CommandScraper`], and
//! the results and failures go through their own concurrent writers.

use tracing::debug;

use crate::config::{ConfigFile, TaskConfig};
use crate::engine::{Runner, RunnerOptions};
use crate::errors::Result;
use crate::read::{CsvReader, LineReader, ReadError, Reader, RecordIter};
use crate::scrape::{CommandScraper, ScrapeTask};
use crate::types::InputFormat;
use crate::write::{
    ConcurrentWriter, FileSink, MultiRecordWriter, RecordSink, TracingSink, WriteError,
};

/// The task type built for every configured task.
pub type CommandTask = ScrapeTask<
    InputReader,
    CommandScraper,
    MultiRecordWriter<FileSink<String>>,
    ConcurrentWriter<ErrorSink>,
>;

/// Input of a configured task. Line input is lifted to single-field rows so
/// both formats feed the same scraper.
#[derive(Debug, Clone)]
pub enum InputReader {
    Lines(LineReader),
    Csv(CsvReader),
}

impl Reader for InputReader {
    type Item = Vec<String>;

    fn read(&self) -> std::result::Result<RecordIter<Vec<String>>, ReadError> {
        match self {
            InputReader::Lines(reader) => {
                let rows = reader.read()?.map(|line| line.map(|line| vec![line]));
                Ok(Box::new(rows))
            }
            InputReader::Csv(reader) => reader.read(),
        }
    }
}

/// Where a configured task's failures end up.
#[derive(Debug)]
pub enum ErrorSink {
    File(FileSink<String>),
    Log(TracingSink<String>),
}

impl RecordSink for ErrorSink {
    type Record = String;

    async fn open(&mut self) -> std::result::Result<(), WriteError> {
        match self {
            ErrorSink::File(sink) => sink.open().await,
            ErrorSink::Log(sink) => sink.open().await,
        }
    }

    async fn commit(&mut self, record: String) -> std::result::Result<(), WriteError> {
        match self {
            ErrorSink::File(sink) => sink.commit(record).await,
            ErrorSink::Log(sink) => sink.commit(record).await,
        }
    }

    async fn close(&mut self) -> std::result::Result<(), WriteError> {
        match self {
            ErrorSink::File(sink) => sink.close().await,
            ErrorSink::Log(sink) => sink.close().await,
        }
    }
}

/// Build the task for `[task.<name>]`, resolving its paths against the
/// config's base directory.
pub fn build_task(cfg: &ConfigFile, name: &str, task: &TaskConfig) -> CommandTask {
    let input = cfg.resolve(&task.input);
    let reader = match task.format {
        InputFormat::Lines => InputReader::Lines(LineReader::new(input)),
        InputFormat::Csv => InputReader::Csv(
            CsvReader::new(input)
                .delimiter(task.delimiter_byte())
                .quote(task.quote_byte()),
        ),
    };

    let scraper = CommandScraper::new(task.cmd.clone()).multiline(task.multiline);

    let poll_interval = cfg.writer.poll_interval();
    let writer = MultiRecordWriter::new(FileSink::new(cfg.resolve(&task.output)))
        .with_poll_interval(poll_interval);

    let error_sink = match &task.errors {
        Some(path) => ErrorSink::File(FileSink::new(cfg.resolve(path))),
        None => ErrorSink::Log(TracingSink::new(format!("{name}.errors"))),
    };
    let errors = ConcurrentWriter::new(error_sink).with_poll_interval(poll_interval);

    let mut built = ScrapeTask::new(name, reader, scraper, writer, errors)
        .with_workers(cfg.workers_for(task));
    for dep in task.after.iter() {
        built = built.after(dep.as_str());
    }

    debug!(
        task = %name,
        workers = built.workers(),
        after = ?task.after,
        "built task from config"
    );
    built
}

/// Build a runner holding one task per `[task.<name>]`.
pub fn build_runner(cfg: &ConfigFile, options: RunnerOptions) -> Result<Runner> {
    let mut builder = Runner::builder().options(options);
    for (name, task) in cfg.task.iter() {
        builder = builder.task(build_task(cfg, name, task));
    }
    builder.build()
}
