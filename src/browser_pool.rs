//! Concurrency gate and launch settings for headless Chrome instances.
//!
//! Each Chrome process consumes ~100-300 MB RAM. A session that outlives its
//! page deadline keeps its browser until the blocking call returns, so the
//! number of live browsers is capped here, independently of how many URLs
//! the dispatcher has in flight.
//!
//! Uses std::sync primitives because browsers are launched from
//! spawn_blocking threads.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::render::RenderError;

/// Environment variable that forces container mode (sandbox off).
pub const CONTAINER_ENV: &str = "FOOTERSCAN_CONTAINER";

/// Environment variable naming a Chrome binary, used when the config has none.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

const FIRST_DEBUG_PORT: u16 = 9222;
const LAST_DEBUG_PORT: u16 = 9322;

/// A simple counting semaphore using std::sync primitives.
/// Unlike tokio::sync::Semaphore, this works in synchronous contexts
/// (e.g., inside spawn_blocking closures).
#[derive(Debug)]
struct BrowserSemaphore {
    state: Mutex<usize>,
    condvar: Condvar,
    max: usize,
}

impl BrowserSemaphore {
    fn new(max: usize) -> Self {
        Self {
            state: Mutex::new(0),
            condvar: Condvar::new(),
            max,
        }
    }

    /// Block until a permit is free or `timeout` elapses.
    fn acquire(self: &Arc<Self>, timeout: Duration) -> Option<BrowserPermit> {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut count, wait) = self
            .condvar
            .wait_timeout_while(guard, timeout, |count| *count >= self.max)
            .unwrap_or_else(PoisonError::into_inner);
        if wait.timed_out() && *count >= self.max {
            return None;
        }
        *count += 1;
        Some(BrowserPermit {
            semaphore: Arc::clone(self),
        })
    }

    fn release(&self) {
        let mut count = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        self.condvar.notify_one();
    }

    fn in_use(&self) -> usize {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII guard that releases a browser permit on drop.
#[derive(Debug)]
struct BrowserPermit {
    semaphore: Arc<BrowserSemaphore>,
}

impl Drop for BrowserPermit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// Launch settings shared by every browser of one pool.
#[derive(Debug, Clone, Default)]
pub struct LaunchSettings {
    pub chrome_path: Option<PathBuf>,
    /// `None` picks automatically: sandbox off inside containers.
    pub sandbox: Option<bool>,
}

/// A Chrome browser instance with an attached permit.
/// Dropping the guard kills the Chrome process and frees the permit.
pub struct BrowserGuard {
    pub browser: headless_chrome::Browser,
    _permit: BrowserPermit,
}

/// Bounded factory for headless Chrome processes.
#[derive(Debug, Clone)]
pub struct BrowserPool {
    semaphore: Arc<BrowserSemaphore>,
    settings: LaunchSettings,
    next_port: Arc<AtomicU16>,
}

impl BrowserPool {
    pub fn new(max_instances: usize, settings: LaunchSettings) -> Self {
        Self {
            semaphore: Arc::new(BrowserSemaphore::new(max_instances.max(1))),
            settings,
            next_port: Arc::new(AtomicU16::new(FIRST_DEBUG_PORT)),
        }
    }

    /// Number of browsers currently alive.
    pub fn in_use(&self) -> usize {
        self.semaphore.in_use()
    }

    /// Launch a browser, waiting at most `timeout` for a free slot.
    pub fn launch(&self, timeout: Duration) -> Result<BrowserGuard, RenderError> {
        let permit = self.semaphore.acquire(timeout).ok_or_else(|| {
            RenderError::Launch(format!("no free browser slot within {:?}", timeout))
        })?;

        let sandbox = self.settings.sandbox.unwrap_or_else(|| !is_container());
        let chrome_path = self.settings.chrome_path.clone().or_else(chrome_path_from_env);
        let port = self.next_debug_port();

        debug!("Launching Chrome (sandbox: {}, port: {}, path: {:?})", sandbox, port, chrome_path);

        let options = headless_chrome::LaunchOptions::default_builder()
            .headless(true)
            .sandbox(sandbox)
            .path(chrome_path)
            .port(Some(port))
            .idle_browser_timeout(timeout.max(Duration::from_secs(1)))
            .build()
            .map_err(|e| RenderError::Launch(format!("invalid Chrome launch options: {}", e)))?;

        let browser = headless_chrome::Browser::new(options)
            .map_err(|e| RenderError::Launch(format!("failed to launch headless Chrome: {}", e)))?;

        Ok(BrowserGuard {
            browser,
            _permit: permit,
        })
    }

    /// Unique debug port per launch, wrapping inside a fixed range.
    fn next_debug_port(&self) -> u16 {
        let port = self.next_port.fetch_add(1, Ordering::Relaxed);
        if port >= LAST_DEBUG_PORT {
            self.next_port.store(FIRST_DEBUG_PORT, Ordering::Relaxed);
        }
        port
    }
}

/// Running inside a container (detected via /.dockerenv or FOOTERSCAN_CONTAINER).
pub fn is_container() -> bool {
    std::env::var(CONTAINER_ENV).is_ok() || Path::new("/.dockerenv").exists()
}

fn chrome_path_from_env() -> Option<PathBuf> {
    std::env::var(CHROME_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}
