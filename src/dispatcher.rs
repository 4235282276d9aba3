//! Bounded-parallel fan-out of URLs to page workers.
//!
//! Every URL gets its own task; a semaphore admits at most `concurrency` of
//! them into the worker at once. A slot is held by the render thread until its
//! session is torn down, so a page that overruns its deadline still counts
//! against the limit after its empty record has been emitted. Finished records
//! go through a channel to a single consumer task that owns the sink, so sink
//! writes are serialized without the workers ever touching it. `run` returns
//! after every record has reached the sink and every session is gone.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::batch::BatchSummary;
use crate::logger::ExtractionProgress;
use crate::record::ExtractionResult;
use crate::render::Renderer;
use crate::result_sink::ResultSink;
use crate::worker::PageWorker;

pub const DEFAULT_CONCURRENCY: usize = 5;

// Slots are counted in u32 by `acquire_many`.
const MAX_CONCURRENCY: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// What `run` hands back: the sink (ready to finalize) and the run summary.
pub struct DispatchOutcome<S> {
    pub sink: S,
    pub summary: BatchSummary,
}

pub struct Dispatcher<R: Renderer> {
    worker: Arc<PageWorker<R>>,
    concurrency: usize,
    progress: ExtractionProgress,
}

impl<R: Renderer> Dispatcher<R> {
    pub fn new(worker: PageWorker<R>, concurrency: usize) -> Self {
        Self {
            worker: Arc::new(worker),
            concurrency: concurrency.clamp(1, MAX_CONCURRENCY),
            progress: ExtractionProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ExtractionProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Extract every URL and forward each record to `sink` as it completes.
    ///
    /// Records arrive in completion order. One URL's failure only empties its
    /// own record; nothing is retried and nothing short-circuits the batch.
    pub async fn run<S: ResultSink + 'static>(&self, urls: Vec<String>, sink: S) -> Result<DispatchOutcome<S>> {
        let started = Instant::now();
        info!("Processing {} URLs with up to {} in parallel", urls.len(), self.concurrency);
        self.progress.start(urls.len() as u64);

        let gate = Arc::new(Semaphore::new(self.concurrency));
        let (tx, rx) = mpsc::channel::<ExtractionResult>(self.concurrency * 2);
        let consumer = tokio::spawn(consume_results(rx, sink, self.progress.clone()));

        let mut tasks = JoinSet::new();
        for url in urls {
            let gate = Arc::clone(&gate);
            let worker = Arc::clone(&self.worker);
            let tx = tx.clone();

            tasks.spawn(async move {
                let result = match gate.acquire_owned().await {
                    Ok(slot) => worker.process_holding(&url, slot).await,
                    Err(e) => {
                        warn!("Admission gate closed before {} could start: {}", url, e);
                        ExtractionResult::empty(&url)
                    }
                };
                if tx.send(result).await.is_err() {
                    error!("Result consumer stopped, record for {} was lost", url);
                }
            });
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Extraction task failed: {}", e);
            }
        }

        let (sink, mut summary) = consumer.await.context("Result consumer task failed")?;

        // Renders that overran their deadline still hold a slot
        if gate.available_permits() < self.concurrency {
            debug!(
                "Waiting for {} overrunning render(s) to release their sessions",
                self.concurrency - gate.available_permits()
            );
        }
        if let Err(e) = gate.acquire_many(self.concurrency as u32).await {
            warn!("Could not wait for outstanding sessions: {}", e);
        }

        summary.finalize(started.elapsed().as_secs_f64());
        self.progress
            .finish(&format!("Processed {} URLs in {:.1}s", summary.total_urls, summary.total_duration_secs));

        Ok(DispatchOutcome { sink, summary })
    }
}

/// Single writer: drains the channel into the sink until every sender is gone.
async fn consume_results<S: ResultSink>(
    mut rx: mpsc::Receiver<ExtractionResult>,
    mut sink: S,
    progress: ExtractionProgress,
) -> (S, BatchSummary) {
    let mut summary = BatchSummary::new();

    while let Some(result) = rx.recv().await {
        if let Err(e) = sink.write_result(&result) {
            error!("Error writing record for {}: {:#}", result.url, e);
            summary.record_sink_failure();
        }
        summary.record(&result);

        if result.is_empty() {
            debug!("No footer data for {}", result.url);
        } else {
            info!(
                "Extracted {} | ICP: {} | TechSupport: {} | Copyright: {}",
                result.url, result.icp, result.tech_support, result.copyright
            );
        }
        progress.advance(&result.url);
    }

    (sink, summary)
}
