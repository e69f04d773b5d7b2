// src/scrape/task.rs

use std::pin::pin;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::dag::task::{Task, TaskFuture, TaskKind};
use crate::read::{self, Reader, RecordIter};
use crate::write::TaskWriter;

use super::Scraper;
use super::pool;

/// Counts from one pass over a task's input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    /// Items whose result went to the writer.
    pub scraped: u64,
    /// Items whose failure went to the error writer.
    pub failed: u64,
}

/// A task that reads every input item, scrapes it and persists the result.
///
/// Both writers are opened before the first item is read and closed after
/// the last result is handed over, on success and on error alike.
///
/// With `workers > 1` items are scraped through a bounded worker pool;
/// results still reach the writers in input order.
pub struct ScrapeTask<R, S, W, E> {
    kind: TaskKind,
    requires: Vec<TaskKind>,
    workers: usize,
    reader: R,
    scraper: Arc<S>,
    writer: W,
    errors: E,
}

impl<R, S, W, E> ScrapeTask<R, S, W, E>
where
    R: Reader,
    S: Scraper<Item = R::Item>,
    W: TaskWriter<S::Output>,
    E: TaskWriter<S::Failure>,
{
    pub fn new(kind: impl Into<TaskKind>, reader: R, scraper: S, writer: W, errors: E) -> Self {
        Self {
            kind: kind.into(),
            requires: Vec::new(),
            workers: 1,
            reader,
            scraper: Arc::new(scraper),
            writer,
            errors,
        }
    }

    /// Declare a prerequisite kind.
    pub fn after(mut self, kind: impl Into<TaskKind>) -> Self {
        self.requires.push(kind.into());
        self
    }

    /// Scrape up to `workers` items concurrently.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    async fn execute(&mut self) -> Result<ScrapeStats> {
        self.writer.open().await.context("opening result writer")?;
        if let Err(err) = self.errors.open().await {
            if let Err(close_err) = self.writer.close().await {
                warn!(kind = %self.kind, error = %close_err, "closing result writer failed");
            }
            return Err(err).context("opening error writer");
        }

        let scraped = match self.reader.read() {
            Ok(items) => {
                scrape_all(
                    items,
                    &self.scraper,
                    self.workers,
                    &mut self.writer,
                    &mut self.errors,
                )
                .await
            }
            Err(err) => Err(err).context("opening input"),
        };

        let writer_closed = self.writer.close().await;
        let errors_closed = self.errors.close().await;

        let stats = scraped?;
        let written = writer_closed.context("closing result writer")?;
        errors_closed.context("closing error writer")?;

        debug!(kind = %self.kind, committed = written.committed, "results committed");
        Ok(stats)
    }
}

async fn scrape_all<T, S, W, E>(
    items: RecordIter<T>,
    scraper: &Arc<S>,
    workers: usize,
    writer: &mut W,
    errors: &mut E,
) -> Result<ScrapeStats>
where
    T: Send + 'static,
    S: Scraper<Item = T>,
    W: TaskWriter<S::Output>,
    E: TaskWriter<S::Failure>,
{
    let mut stats = ScrapeStats::default();
    let items = read::stream_blocking(items, workers.max(1) * 2);

    if workers <= 1 {
        let mut items = pin!(items);
        while let Some(item) = items.next().await {
            let item = item.context("reading input")?;
            let result = scraper.scrape(item).await;
            route(result, writer, errors, &mut stats)?;
        }
        return Ok(stats);
    }

    let shared = Arc::clone(scraper);
    let mut results = pin!(pool::map_ordered(items, workers, move |item| {
        let scraper = Arc::clone(&shared);
        async move { scraper.scrape(item).await }
    }));

    while let Some(result) = results.next().await {
        let result = result
            .context("reading input")?
            .map_err(|err| anyhow!("scrape worker panicked: {err}"))?;
        route(result, writer, errors, &mut stats)?;
    }

    Ok(stats)
}

fn route<O, F, W, E>(
    result: std::result::Result<O, F>,
    writer: &mut W,
    errors: &mut E,
    stats: &mut ScrapeStats,
) -> Result<()>
where
    W: TaskWriter<O>,
    E: TaskWriter<F>,
{
    match result {
        Ok(output) => {
            writer.write(output).context("queueing result")?;
            stats.scraped += 1;
        }
        Err(failure) => {
            errors.write(failure).context("queueing failure")?;
            stats.failed += 1;
        }
    }
    Ok(())
}

impl<R, S, W, E> Task for ScrapeTask<R, S, W, E>
where
    R: Reader,
    S: Scraper<Item = R::Item>,
    W: TaskWriter<S::Output>,
    E: TaskWriter<S::Failure>,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn requires(&self) -> &[TaskKind] {
        &self.requires
    }

    fn run(&mut self) -> TaskFuture<'_> {
        Box::pin(async move {
            let stats = self.execute().await?;
            info!(
                kind = %self.kind,
                scraped = stats.scraped,
                failed = stats.failed,
                workers = self.workers,
                "scrape finished"
            );
            anyhow::Ok(())
        })
    }
}
