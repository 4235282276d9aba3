//! Headless Chrome backend.
//!
//! One browser process per session: sessions never share state, so a page
//! that wedges its renderer cannot affect another URL.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::Tab;
use tracing::debug;

use super::{Deadline, PageScript, PageSession, RenderError, Renderer};
use crate::browser_pool::{BrowserGuard, BrowserPool, LaunchSettings};

pub struct ChromeRenderer {
    pool: BrowserPool,
    user_agent: Option<String>,
}

impl ChromeRenderer {
    pub fn new(max_instances: usize, settings: LaunchSettings) -> Self {
        Self {
            pool: BrowserPool::new(max_instances, settings),
            user_agent: None,
        }
    }

    /// Override the browser's own user agent on every tab. Blank keeps Chrome's default.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        self.user_agent = Some(user_agent).filter(|ua| !ua.trim().is_empty());
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

impl Renderer for ChromeRenderer {
    type Session = ChromeSession;

    fn new_session(&self, timeout: Duration) -> Result<ChromeSession, RenderError> {
        let deadline = Deadline::after(timeout);
        let guard = self.pool.launch(deadline.check()?)?;

        let tab = guard
            .browser
            .new_tab()
            .map_err(|e| RenderError::Launch(format!("failed to create browser tab: {}", e)))?;
        tab.set_default_timeout(deadline.check()?);
        if let Some(user_agent) = &self.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| RenderError::Launch(format!("failed to set user agent: {}", e)))?;
        }

        Ok(ChromeSession {
            tab,
            deadline,
            _guard: guard,
        })
    }
}

pub struct ChromeSession {
    tab: Arc<Tab>,
    deadline: Deadline,
    // Declared last: the browser must outlive the tab.
    _guard: BrowserGuard,
}

impl PageSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.tab.set_default_timeout(self.deadline.check()?);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn wait_visible(&mut self, selector: &str) -> Result<(), RenderError> {
        self.tab.set_default_timeout(self.deadline.check()?);
        self.tab
            .wait_for_element(selector)
            .map_err(|e| RenderError::NotReady {
                selector: selector.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn evaluate(&mut self, script: PageScript) -> Result<String, RenderError> {
        self.tab.set_default_timeout(self.deadline.check()?);
        let result = self
            .tab
            .evaluate(script.source(), false)
            .map_err(|e| RenderError::Script {
                script: script.name(),
                reason: e.to_string(),
            })?;

        match result.value {
            Some(serde_json::Value::String(text)) => Ok(text),
            Some(serde_json::Value::Null) | None => Ok(String::new()),
            Some(other) => Err(RenderError::Script {
                script: script.name(),
                reason: format!("expected a string result, got {}", other),
            }),
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            debug!("Failed to close browser tab: {}", e);
        }
    }
}
