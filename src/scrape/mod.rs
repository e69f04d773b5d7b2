// src/scrape/mod.rs

//! Scraping: turning input items into result records.
//!
//! - [`Scraper`] is the per-item operation supplied by the user.
//! - [`task`] glues a reader, a scraper and two writers into a schedulable
//!   [`ScrapeTask`](task::ScrapeTask).
//! - [`pool`] is the bounded worker pool a task can fan items out to.
//! - [`command`] is a scraper that runs a shell command per item.

use std::future::Future;

pub mod command;
pub mod pool;
pub mod task;

pub use command::CommandScraper;
pub use task::{ScrapeStats, ScrapeTask};

/// Per-item scrape operation.
///
/// `Ok` results go to the task's writer, `Err` results to its error writer.
/// A failed item is data, not a task failure: the task carries on with the
/// next item.
pub trait Scraper: Send + Sync + 'static {
    type Item: Send + 'static;
    type Output: Send + 'static;
    type Failure: Send + 'static;

    fn scrape(
        &self,
        item: Self::Item,
    ) -> impl Future<Output = Result<Self::Output, Self::Failure>> + Send;
}
