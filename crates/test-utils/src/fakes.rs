#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scrapedag::dag::{Task, TaskFuture, TaskKind};
use scrapedag::scrape::Scraper;
use scrapedag::write::{RecordSink, WriteError};

/// Shared, ordered log of task kinds in completion order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: &str) {
        self.entries.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Position of `entry` in the log. Panics if it never ran.
    pub fn position(&self, entry: &str) -> usize {
        self.entries()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} never completed: {:?}", self.entries()))
    }
}

/// Tracks how many units are inside a section at once.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeed,
    Fail,
    Panic,
}

/// Fake task that appends its kind to an [`ExecutionLog`] when it finishes.
pub struct RecordingTask {
    kind: TaskKind,
    requires: Vec<TaskKind>,
    log: ExecutionLog,
    delay: Duration,
    outcome: Outcome,
    probe: Option<Arc<ConcurrencyProbe>>,
}

impl RecordingTask {
    pub fn new(kind: &str, log: &ExecutionLog) -> Self {
        Self {
            kind: kind.to_string(),
            requires: Vec::new(),
            log: log.clone(),
            delay: Duration::ZERO,
            outcome: Outcome::Succeed,
            probe: None,
        }
    }

    pub fn after(mut self, kind: &str) -> Self {
        self.requires.push(kind.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Log completion, then return an error.
    pub fn failing(mut self) -> Self {
        self.outcome = Outcome::Fail;
        self
    }

    /// Panic without logging.
    pub fn panicking(mut self) -> Self {
        self.outcome = Outcome::Panic;
        self
    }

    pub fn with_probe(mut self, probe: &Arc<ConcurrencyProbe>) -> Self {
        self.probe = Some(Arc::clone(probe));
        self
    }

    pub fn boxed(self) -> Box<dyn Task> {
        Box::new(self)
    }
}

impl Task for RecordingTask {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn requires(&self) -> &[TaskKind] {
        &self.requires
    }

    fn run(&mut self) -> TaskFuture<'_> {
        Box::pin(async move {
            if let Some(probe) = &self.probe {
                probe.enter();
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(probe) = &self.probe {
                probe.exit();
            }

            match self.outcome {
                Outcome::Succeed => {
                    self.log.push(&self.kind);
                    Ok(())
                }
                Outcome::Fail => {
                    self.log.push(&self.kind);
                    anyhow::bail!("{} failed on purpose", self.kind)
                }
                Outcome::Panic => panic!("{} panicked on purpose", self.kind),
            }
        })
    }
}

/// Scraper over strings: uppercases the item, fails items starting with
/// `"bad"`. The very first call sleeps for `first_delay`, so with a worker
/// pool the first result is produced last.
#[derive(Debug, Default)]
pub struct FakeScraper {
    first_delay: Duration,
    calls: AtomicUsize,
    probe: Option<Arc<ConcurrencyProbe>>,
}

impl FakeScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow_first(mut self, delay: Duration) -> Self {
        self.first_delay = delay;
        self
    }

    pub fn with_probe(mut self, probe: &Arc<ConcurrencyProbe>) -> Self {
        self.probe = Some(Arc::clone(probe));
        self
    }
}

impl Scraper for FakeScraper {
    type Item = String;
    type Output = String;
    type Failure = String;

    async fn scrape(&self, item: String) -> Result<String, String> {
        if let Some(probe) = &self.probe {
            probe.enter();
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 && !self.first_delay.is_zero() {
            tokio::time::sleep(self.first_delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        if let Some(probe) = &self.probe {
            probe.exit();
        }

        if item.starts_with("bad") {
            Err(format!("{item}\tbad item"))
        } else {
            Ok(item.to_uppercase())
        }
    }
}

/// Sink that rejects one poisoned record and remembers whether it was
/// closed.
#[derive(Debug, Clone)]
pub struct FailingSink {
    poison: String,
    committed: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl FailingSink {
    pub fn new(poison: &str) -> Self {
        Self {
            poison: poison.to_string(),
            committed: Arc::default(),
            closed: Arc::default(),
        }
    }

    pub fn committed(&self) -> Vec<String> {
        self.committed.lock().unwrap().clone()
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RecordSink for FailingSink {
    type Record = String;

    async fn open(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    async fn commit(&mut self, record: String) -> Result<(), WriteError> {
        if record == self.poison {
            return Err(WriteError::Io(std::io::Error::other(format!(
                "cannot store {record}"
            ))));
        }
        self.committed.lock().unwrap().push(record);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
