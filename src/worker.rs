//! Single-URL extraction pipeline.
//!
//! open session → navigate → wait for the document root → locate footer →
//! drop session → extract fields. Every failure collapses into an empty
//! record for the URL; nothing propagates to the caller.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::extractor::extract_fields;
use crate::locator;
use crate::record::ExtractionResult;
use crate::render::{PageSession, RenderError, Renderer};

pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WAIT_SELECTOR: &str = "body";

pub struct PageWorker<R: Renderer> {
    renderer: Arc<R>,
    page_timeout: Duration,
    wait_selector: Arc<str>,
}

impl<R: Renderer> PageWorker<R> {
    pub fn new(renderer: Arc<R>, page_timeout: Duration, wait_selector: impl Into<Arc<str>>) -> Self {
        Self {
            renderer,
            page_timeout,
            wait_selector: wait_selector.into(),
        }
    }

    pub fn page_timeout(&self) -> Duration {
        self.page_timeout
    }

    /// Produce the record for `url`. Always returns within the page timeout
    /// (plus scheduling slack), whatever the renderer does.
    pub async fn process(&self, url: &str) -> ExtractionResult {
        self.process_holding(url, ()).await
    }

    /// Same as [`process`](Self::process), but `slot` lives on the render
    /// thread and is dropped only after the session has been torn down. A
    /// render that overruns the deadline keeps its slot until it really ends,
    /// even though the empty record has already been returned.
    pub async fn process_holding<G: Send + 'static>(&self, url: &str, slot: G) -> ExtractionResult {
        let renderer = Arc::clone(&self.renderer);
        let selector = Arc::clone(&self.wait_selector);
        let timeout = self.page_timeout;
        let target = url.to_string();

        // headless_chrome operations are blocking, run them off the async workers
        let handle = tokio::task::spawn_blocking(move || {
            let rendered = render_footer_text(renderer.as_ref(), &target, &selector, timeout);
            drop(slot);
            rendered
        });

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(Some(text)))) => {
                let fields = extract_fields(&text);
                debug!("Extracted fields for {}: {:?}", url, fields);
                ExtractionResult::from_fields(url, fields)
            }
            Ok(Ok(Ok(None))) => {
                debug!("No footer candidate on {}", url);
                ExtractionResult::empty(url)
            }
            Ok(Ok(Err(e))) => {
                warn!("Render failed for {}: {}", url, e);
                ExtractionResult::empty(url)
            }
            Ok(Err(e)) => {
                warn!("Render task for {} panicked: {}", url, e);
                ExtractionResult::empty(url)
            }
            Err(_) => {
                warn!("Render of {} exceeded {:?}, giving up", url, timeout);
                ExtractionResult::empty(url)
            }
        }
    }
}

/// Blocking part of the pipeline. The session is dropped (and its page torn
/// down) on every return path.
pub fn render_footer_text<R: Renderer + ?Sized>(
    renderer: &R,
    url: &str,
    wait_selector: &str,
    timeout: Duration,
) -> Result<Option<String>, RenderError> {
    let mut session = renderer.new_session(timeout)?;
    session.navigate(url)?;
    session.wait_visible(wait_selector)?;
    locator::locate(&mut session)
}
