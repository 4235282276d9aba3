//! Dispatcher and worker behavior with scripted renderers: admission bound,
//! per-URL deadlines and one record per input URL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use footerscan::{
    Dispatcher, ExtractionResult, PageScript, PageSession, PageWorker, RenderError, Renderer, ResultSink,
};

const FOOTER: &str = "Copyright © 2023 某某公司 京ICP备12345678号";

/// How long a `/hang` page blocks, well past the 300ms deadlines used below.
const OVERRUN: Duration = Duration::from_millis(800);

/// Renderer whose latency depends on the URL and that records how many
/// sessions are alive at once.
#[derive(Default)]
struct ScriptedRenderer {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

struct ScriptedSession {
    url: String,
    active: Arc<AtomicUsize>,
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Renderer for ScriptedRenderer {
    type Session = ScriptedSession;

    fn new_session(&self, _timeout: Duration) -> Result<ScriptedSession, RenderError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(ScriptedSession {
            url: String::new(),
            active: Arc::clone(&self.active),
        })
    }
}

/// URLs look like `http://site-<n>.example/<behavior>`.
fn site_index(url: &str) -> u64 {
    url.trim_start_matches("http://site-")
        .split('.')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

impl PageSession for ScriptedSession {
    fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        if url.ends_with("/hang") {
            std::thread::sleep(OVERRUN);
        } else {
            std::thread::sleep(Duration::from_millis(5 + (site_index(url) % 7) * 5));
        }
        if url.ends_with("/dns-failure") {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        self.url = url.to_string();
        Ok(())
    }

    fn wait_visible(&mut self, _selector: &str) -> Result<(), RenderError> {
        Ok(())
    }

    fn evaluate(&mut self, _script: PageScript) -> Result<String, RenderError> {
        if self.url.ends_with("/blank") {
            return Ok(String::new());
        }
        Ok(FOOTER.to_string())
    }
}

#[derive(Default, Clone)]
struct CollectingSink {
    records: Arc<Mutex<Vec<ExtractionResult>>>,
}

impl ResultSink for CollectingSink {
    fn write_result(&mut self, result: &ExtractionResult) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(result.clone());
        Ok(())
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

fn dispatcher(renderer: ScriptedRenderer, concurrency: usize, timeout: Duration) -> Dispatcher<ScriptedRenderer> {
    Dispatcher::new(PageWorker::new(Arc::new(renderer), timeout, "body"), concurrency)
}

fn urls(n: usize, behavior: &str) -> Vec<String> {
    (0..n).map(|i| format!("http://site-{}.example/{}", i, behavior)).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_limit() {
    let renderer = ScriptedRenderer::default();
    let peak = Arc::clone(&renderer.peak);
    let active = Arc::clone(&renderer.active);

    let outcome = dispatcher(renderer, 5, Duration::from_secs(10))
        .run(urls(50, "ok"), CollectingSink::default())
        .await
        .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 5, "peak was {}", peak.load(Ordering::SeqCst));
    assert_eq!(active.load(Ordering::SeqCst), 0, "all sessions released");
    assert_eq!(outcome.sink.count(), 50);
    assert_eq!(outcome.summary.with_icp, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_slot_serializes_work() {
    let renderer = ScriptedRenderer::default();
    let peak = Arc::clone(&renderer.peak);

    dispatcher(renderer, 1, Duration::from_secs(10))
        .run(urls(8, "ok"), CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_record_per_url_including_failures() {
    let mut input = urls(4, "ok");
    input.extend(urls(3, "dns-failure"));
    input.extend(urls(2, "blank"));
    input.push(input[0].clone());

    let outcome = dispatcher(ScriptedRenderer::default(), 3, Duration::from_secs(10))
        .run(input.clone(), CollectingSink::default())
        .await
        .unwrap();

    let records = outcome.sink.records.lock().unwrap().clone();
    assert_eq!(records.len(), input.len());

    let mut expected: HashMap<&str, usize> = HashMap::new();
    for url in &input {
        *expected.entry(url.as_str()).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for record in &records {
        *seen.entry(record.url.as_str()).or_default() += 1;
    }
    assert_eq!(seen, expected);

    for record in &records {
        if record.url.ends_with("/ok") {
            assert_eq!(record.icp, "京ICP备12345678号");
            assert_eq!(record.copyright, "Copyright © 2023 某某公司");
        } else {
            assert!(record.is_empty(), "{} should be empty: {:?}", record.url, record);
        }
    }
    assert_eq!(outcome.summary.empty_records, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hung_page_does_not_hold_up_the_batch() {
    let mut input = urls(1, "hang");
    input.extend(urls(6, "ok"));

    let start = Instant::now();
    let outcome = dispatcher(ScriptedRenderer::default(), 2, Duration::from_millis(300))
        .run(input, CollectingSink::default())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);

    let records = outcome.sink.records.lock().unwrap().clone();
    assert_eq!(records.len(), 7);
    let hung = records.iter().find(|r| r.url.ends_with("/hang")).unwrap();
    assert!(hung.is_empty());
    assert_eq!(records.iter().filter(|r| !r.icp.is_empty()).count(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overrunning_renders_keep_their_slot() {
    let renderer = ScriptedRenderer::default();
    let peak = Arc::clone(&renderer.peak);
    let active = Arc::clone(&renderer.active);

    let mut input = urls(2, "hang");
    input.extend(urls(6, "ok"));

    let start = Instant::now();
    let outcome = dispatcher(renderer, 2, Duration::from_millis(300))
        .run(input, CollectingSink::default())
        .await
        .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 2, "peak was {}", peak.load(Ordering::SeqCst));
    assert_eq!(active.load(Ordering::SeqCst), 0, "sessions still alive after run returned");
    assert!(start.elapsed() >= OVERRUN);

    let records = outcome.sink.records.lock().unwrap().clone();
    assert_eq!(records.len(), 8);
    assert!(records.iter().filter(|r| r.url.ends_with("/hang")).all(|r| r.is_empty()));
    assert_eq!(outcome.summary.with_icp, 6);
}
