//! Rendering backends.
//!
//! A [`Renderer`] hands out one [`PageSession`] per URL. The session owns
//! whatever the backend needs to load the page (a Chrome process and tab, or a
//! fetched HTML document) and releases it when dropped. Sessions are driven
//! from blocking threads, so every operation here is synchronous.

pub mod chrome;
pub mod static_html;

use std::time::{Duration, Instant};
use thiserror::Error;

use crate::locator::FOOTER_LOCATOR_SCRIPT;

pub use chrome::ChromeRenderer;
pub use static_html::StaticHtmlRenderer;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to start rendering session: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Element '{selector}' never became ready: {reason}")]
    NotReady { selector: String, reason: String },

    #[error("Script '{script}' failed: {reason}")]
    Script { script: &'static str, reason: String },

    #[error("Page deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Queries the core runs inside a loaded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScript {
    /// Text of the block element most likely to be the page footer, or `""`.
    LocateFooter,
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            PageScript::LocateFooter => "locate_footer",
        }
    }

    /// JavaScript source evaluated by script-capable backends.
    pub fn source(&self) -> &'static str {
        match self {
            PageScript::LocateFooter => FOOTER_LOCATOR_SCRIPT,
        }
    }
}

/// One page, loaded for exactly one URL. Dropping it tears the page down.
pub trait PageSession {
    fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Block until `selector` is present in the document.
    fn wait_visible(&mut self, selector: &str) -> Result<(), RenderError>;

    fn evaluate(&mut self, script: PageScript) -> Result<String, RenderError>;
}

pub trait Renderer: Send + Sync + 'static {
    type Session: PageSession;

    /// Start a fresh session whose operations must all finish within `timeout`.
    fn new_session(&self, timeout: Duration) -> Result<Self::Session, RenderError>;
}

/// Wall-clock budget shared by every operation of one session.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            budget,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Fails once the budget is used up.
    pub fn check(&self) -> Result<Duration, RenderError> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(RenderError::DeadlineExceeded(self.budget));
        }
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_expires() {
        let deadline = Deadline::after(Duration::from_millis(20));
        assert!(deadline.check().is_ok());
        std::thread::sleep(Duration::from_millis(40));
        assert!(matches!(deadline.check(), Err(RenderError::DeadlineExceeded(_))));
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_locate_footer_script_source() {
        let source = PageScript::LocateFooter.source();
        assert!(source.contains("querySelectorAll('div')"));
        assert!(source.contains("foot"));
        assert_eq!(PageScript::LocateFooter.name(), "locate_footer");
    }
}
