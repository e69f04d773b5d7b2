// tests/concurrent_writer.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use scrapedag::write::{
    ConcurrentWriter, FileSink, JsonLinesSink, MemorySink, MultiRecordWriter, TaskWriter,
    WriteError,
};
use scrapedag_test_utils::fakes::FailingSink;
use scrapedag_test_utils::{init_tracing, with_timeout};
use serde::Serialize;

type TestResult = Result<(), Box<dyn Error>>;

const POLL: Duration = Duration::from_millis(5);

#[tokio::test]
async fn every_record_is_committed_once_before_close_returns() -> TestResult {
    init_tracing();
    let sink = MemorySink::<u32>::new();
    let mut writer = ConcurrentWriter::new(sink.clone()).with_poll_interval(POLL);

    writer.open().await?;
    for n in 0..500 {
        writer.write(n)?;
    }
    let stats = with_timeout(writer.close()).await?;

    assert_eq!(stats.committed, 500);
    assert_eq!(sink.records(), (0..500).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_keep_per_producer_order() -> TestResult {
    init_tracing();
    let sink = MemorySink::<(usize, usize)>::new();
    let mut writer = ConcurrentWriter::new(sink.clone()).with_poll_interval(POLL);
    writer.open().await?;

    let writer = Arc::new(writer);
    let mut producers = Vec::new();
    for producer in 0..4 {
        let writer = Arc::clone(&writer);
        producers.push(tokio::spawn(async move {
            for seq in 0..100 {
                writer.write((producer, seq)).unwrap();
                if seq % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for producer in producers {
        producer.await?;
    }

    let mut writer = Arc::try_unwrap(writer).map_err(|_| "writer still shared")?;
    let stats = with_timeout(writer.close()).await?;

    let records = sink.records();
    assert_eq!(stats.committed, 400);
    assert_eq!(records.len(), 400);
    for producer in 0..4 {
        let seqs: Vec<usize> = records
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, s)| *s)
            .collect();
        assert_eq!(seqs, (0..100).collect::<Vec<_>>());
    }
    Ok(())
}

#[tokio::test]
async fn write_before_open_and_after_close_is_rejected() -> TestResult {
    init_tracing();
    let mut writer = ConcurrentWriter::new(MemorySink::<u32>::new()).with_poll_interval(POLL);

    assert!(matches!(writer.write(1), Err(WriteError::NotOpen)));
    assert!(matches!(writer.close().await, Err(WriteError::NotOpen)));

    writer.open().await?;
    assert!(matches!(writer.open().await, Err(WriteError::AlreadyOpen)));
    writer.close().await?;

    assert!(matches!(writer.write(2), Err(WriteError::Closed)));
    Ok(())
}

#[tokio::test]
async fn writer_can_be_reopened_after_close() -> TestResult {
    init_tracing();
    let sink = MemorySink::<&'static str>::new();
    let mut writer = ConcurrentWriter::new(sink.clone()).with_poll_interval(POLL);

    writer.open().await?;
    writer.write("first")?;
    writer.close().await?;

    writer.open().await?;
    writer.write("second")?;
    let stats = writer.close().await?;

    assert_eq!(stats.committed, 1);
    assert_eq!(sink.records(), vec!["first", "second"]);
    Ok(())
}

#[tokio::test]
async fn backend_failure_surfaces_from_close_and_sink_is_closed() -> TestResult {
    init_tracing();
    let sink = FailingSink::new("boom");
    let mut writer = ConcurrentWriter::new(sink.clone()).with_poll_interval(POLL);

    writer.open().await?;
    writer.write("a".to_string())?;
    writer.write("boom".to_string())?;
    writer.write("never".to_string())?;

    let result = with_timeout(writer.close()).await;

    assert!(matches!(result, Err(WriteError::Io(_))), "{result:?}");
    assert_eq!(sink.committed(), vec!["a"]);
    assert!(sink.was_closed());
    Ok(())
}

#[tokio::test]
async fn dropping_an_open_writer_still_drains_and_closes() -> TestResult {
    init_tracing();
    let sink = FailingSink::new("<none>");
    let mut writer = ConcurrentWriter::new(sink.clone()).with_poll_interval(POLL);

    writer.open().await?;
    writer.write("x".to_string())?;
    writer.write("y".to_string())?;
    drop(writer);

    with_timeout(async {
        while !sink.was_closed() {
            tokio::time::sleep(POLL).await;
        }
    })
    .await;
    assert_eq!(sink.committed(), vec!["x", "y"]);
    Ok(())
}

#[tokio::test]
async fn multi_record_writer_enqueues_each_element() -> TestResult {
    init_tracing();
    let sink = MemorySink::<String>::new();
    let mut writer = MultiRecordWriter::new(sink.clone()).with_poll_interval(POLL);

    TaskWriter::open(&mut writer).await?;
    writer.write(vec!["a".to_string(), "b".to_string()])?;
    writer.write(vec![])?;
    writer.write(vec!["c".to_string()])?;
    let stats = TaskWriter::close(&mut writer).await?;

    assert_eq!(stats.committed, 3);
    assert_eq!(sink.records(), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn file_sink_writes_one_line_per_record() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("out.txt");
    std::fs::create_dir_all(path.parent().unwrap_or(dir.path()))?;
    std::fs::write(&path, "stale contents\n")?;

    let mut writer = ConcurrentWriter::new(FileSink::<String>::new(&path)).with_poll_interval(POLL);
    writer.open().await?;
    writer.write("first".to_string())?;
    writer.write("second".to_string())?;
    writer.close().await?;

    assert_eq!(std::fs::read_to_string(&path)?, "first\nsecond\n");
    Ok(())
}

#[derive(Debug, Serialize)]
struct Page {
    url: String,
    status: u16,
}

#[tokio::test]
async fn json_lines_sink_serialises_each_record() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pages.jsonl");

    let mut writer = ConcurrentWriter::new(JsonLinesSink::<Page>::new(&path)).with_poll_interval(POLL);
    writer.open().await?;
    writer.write(Page {
        url: "https://example.com/".to_string(),
        status: 200,
    })?;
    writer.close().await?;

    assert_eq!(
        std::fs::read_to_string(&path)?,
        "{\"url\":\"https://example.com/\",\"status\":200}\n"
    );
    Ok(())
}
