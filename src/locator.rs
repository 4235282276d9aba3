//! Footer location.
//!
//! Footers are rarely marked up semantically, so the locator looks for block
//! elements whose text carries one of three cheap lexical signatures (ICP
//! number, tech-support credit, copyright line) and picks one in two tiers:
//!
//! 1. the first visible `div` that matches AND is short (≤ 300 code points)
//!    or has "foot" in its id/class;
//! 2. failing that, the first visible `div` that matches at all.
//!
//! Script-capable backends run [`FOOTER_LOCATOR_SCRIPT`] inside the page.
//! Backends without a script engine collect [`FooterCandidate`]s themselves
//! and call [`select_footer`], which applies the same rules.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::render::{PageScript, PageSession, RenderError};

/// Candidates longer than this need a "foot" id/class to win tier 1.
pub const MAX_UNMARKED_FOOTER_CHARS: usize = 300;

/// Marker looked for in `id` and `class` attributes.
pub const FOOTER_ATTRIBUTE_MARKER: &str = "foot";

/// In-page footer query. Evaluates to the chosen element's `textContent`, or `''`.
pub const FOOTER_LOCATOR_SCRIPT: &str = r#"(() => {
    const signatures = [
        /(?:\w|[\u4e00-\u9fa5])*ICP(备)?\d{1,10}(号)(-\d{1,})?/,
        /(技术支持|技术提供|网站建设|技术服务)[:：\s]*([A-Za-z0-9\u4e00-\u9fa5\(\)-]+)/,
        /(?:.*?)(?:copyright|©|版权).+?([\u4e00-\u9fa5]+(?:（[^）]+）)?)/i,
    ];
    const matchesSignature = text => signatures.some(re => re.test(text));
    const visible = Array.from(document.querySelectorAll('div')).filter(el => {
        const style = getComputedStyle(el);
        return style.display !== 'none' && style.visibility !== 'hidden';
    });
    const attr = value => (typeof value === 'string' ? value : '');
    let footer = visible.find(el => {
        const text = el.textContent || '';
        const marked = attr(el.id).includes('foot') || attr(el.className).includes('foot');
        return matchesSignature(text) && ([...text].length <= 300 || marked);
    });
    if (!footer) {
        footer = visible.find(el => matchesSignature(el.textContent || ''));
    }
    return footer ? footer.textContent : '';
})()"#;

static ICP_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[0-9A-Za-z_]|[\x{4e00}-\x{9fa5}])*ICP(备)?[0-9]{1,10}(号)(-[0-9]+)?")
        .expect("ICP signature must compile")
});

// Separator class is JavaScript's `\s`, as in the in-page script.
static TECH_SUPPORT_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(技术支持|技术提供|网站建设|技术服务)[:：\t\n\x0B\x0C\r \x{a0}\x{1680}\x{2000}-\x{200a}\x{2028}\x{2029}\x{202f}\x{205f}\x{3000}\x{feff}]*([A-Za-z0-9\x{4e00}-\x{9fa5}()\-]+)")
        .expect("tech-support signature must compile")
});

static COPYRIGHT_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:.*?)(?:copyright|©|版权).+?([\x{4e00}-\x{9fa5}]+(?:（[^）]+）)?)")
        .expect("copyright signature must compile")
});

/// True when `text` carries at least one footer signature.
pub fn matches_footer_signature(text: &str) -> bool {
    ICP_SIGNATURE.is_match(text)
        || TECH_SUPPORT_SIGNATURE.is_match(text)
        || COPYRIGHT_SIGNATURE.is_match(text)
}

/// A block element as seen by the locator, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FooterCandidate {
    pub text: String,
    pub id: String,
    pub class: String,
    pub visible: bool,
}

impl FooterCandidate {
    fn has_footer_marker(&self) -> bool {
        self.id.contains(FOOTER_ATTRIBUTE_MARKER) || self.class.contains(FOOTER_ATTRIBUTE_MARKER)
    }
}

/// Pick the footer among `candidates` (document order). `None` when nothing matches.
pub fn select_footer(candidates: &[FooterCandidate]) -> Option<&FooterCandidate> {
    let matching = || {
        candidates
            .iter()
            .filter(|c| c.visible && matches_footer_signature(&c.text))
    };

    matching()
        .find(|c| c.text.chars().count() <= MAX_UNMARKED_FOOTER_CHARS || c.has_footer_marker())
        .or_else(|| matching().next())
}

/// Locate the footer text of a loaded page. `Ok(None)` means no candidate matched.
pub fn locate<S: PageSession + ?Sized>(page: &mut S) -> Result<Option<String>, RenderError> {
    let text = page.evaluate(PageScript::LocateFooter)?;
    if text.is_empty() {
        debug!("Footer locator found no candidate");
        return Ok(None);
    }
    debug!("Footer locator returned {} chars", text.chars().count());
    Ok(Some(text))
}
