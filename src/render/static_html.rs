//! Script-free backend: fetches the raw document over HTTP and answers page
//! queries natively.
//!
//! Works for server-rendered sites and needs no browser. Content injected by
//! JavaScript is invisible to it, and visibility is approximated from the
//! `hidden` attribute and inline `display`/`visibility` styles.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{Deadline, PageScript, PageSession, RenderError, Renderer};
use crate::locator::{select_footer, FooterCandidate};

const MAX_REDIRECTS: usize = 5;

pub struct StaticHtmlRenderer {
    user_agent: String,
}

impl StaticHtmlRenderer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Renderer for StaticHtmlRenderer {
    type Session = StaticHtmlSession;

    fn new_session(&self, timeout: Duration) -> Result<StaticHtmlSession, RenderError> {
        let deadline = Deadline::after(timeout);
        let client = reqwest::blocking::Client::builder()
            .timeout(deadline.check()?)
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| RenderError::Launch(format!("failed to build HTTP client: {}", e)))?;

        Ok(StaticHtmlSession {
            client,
            deadline,
            document: None,
        })
    }
}

pub struct StaticHtmlSession {
    client: reqwest::blocking::Client,
    deadline: Deadline,
    document: Option<String>,
}

impl StaticHtmlSession {
    fn parsed(&self, context: &'static str) -> Result<Html, RenderError> {
        let body = self.document.as_deref().ok_or_else(|| RenderError::Script {
            script: context,
            reason: "no document loaded".to_string(),
        })?;
        Ok(Html::parse_document(body))
    }
}

impl PageSession for StaticHtmlSession {
    fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let remaining = self.deadline.check()?;
        let navigation_error = |reason: String| RenderError::Navigation {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .timeout(remaining)
            .send()
            .map_err(|e| navigation_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(navigation_error(format!("HTTP status {}", response.status())));
        }

        let body = response
            .text()
            .map_err(|e| navigation_error(format!("failed to read body: {}", e)))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        self.document = Some(body);
        Ok(())
    }

    fn wait_visible(&mut self, selector: &str) -> Result<(), RenderError> {
        self.deadline.check()?;
        let not_ready = |reason: String| RenderError::NotReady {
            selector: selector.to_string(),
            reason,
        };
        let parsed = Selector::parse(selector).map_err(|e| not_ready(format!("invalid selector: {}", e)))?;
        let document = self.parsed("wait_visible").map_err(|e| not_ready(e.to_string()))?;

        if document.select(&parsed).next().is_none() {
            return Err(not_ready("element not present in document".to_string()));
        }
        Ok(())
    }

    fn evaluate(&mut self, script: PageScript) -> Result<String, RenderError> {
        self.deadline.check()?;
        let document = self.parsed(script.name())?;
        match script {
            PageScript::LocateFooter => {
                let candidates = footer_candidates(&document);
                Ok(select_footer(&candidates)
                    .map(|c| c.text.clone())
                    .unwrap_or_default())
            }
        }
    }
}

/// All `div` elements of `document` in document order.
pub fn footer_candidates(document: &Html) -> Vec<FooterCandidate> {
    let Ok(divs) = Selector::parse("div") else {
        return Vec::new();
    };
    document
        .select(&divs)
        .map(|el| FooterCandidate {
            text: el.text().collect(),
            id: el.value().attr("id").unwrap_or_default().to_string(),
            class: el.value().attr("class").unwrap_or_default().to_string(),
            visible: is_visible(el),
        })
        .collect()
}

/// `display` is not inherited, so only the element's own declaration counts;
/// `visibility` is inherited, so the nearest declaration up the tree wins.
fn is_visible(element: ElementRef<'_>) -> bool {
    if element.value().attr("hidden").is_some()
        || inline_style(element, "display").as_deref() == Some("none")
    {
        return false;
    }

    let mut current = Some(element);
    while let Some(el) = current {
        if let Some(visibility) = inline_style(el, "visibility") {
            return visibility != "hidden";
        }
        current = el.parent().and_then(ElementRef::wrap);
    }
    true
}

/// Value of `property` in the element's inline `style` attribute, lowercased.
fn inline_style(element: ElementRef<'_>, property: &str) -> Option<String> {
    let style = element.value().attr("style")?;
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .map(|(_, value)| {
            value
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_ascii_lowercase()
        })
        .last()
}
