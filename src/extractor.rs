//! Footer field extraction.
//!
//! Turns the raw text of a footer block into three validated fields:
//! - ICP registration number (e.g. `京ICP备12345678号-1`)
//! - Technical-support attribution (e.g. `技术支持：某某科技`)
//! - Copyright line
//!
//! Fields are extracted in that order. Every accepted field is stripped from
//! the working text before the next pattern runs, so a later pattern cannot
//! re-capture text that already belongs to an earlier field.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

/// Shortest accepted field, in code points after whitespace merging.
pub const MIN_FIELD_CHARS: usize = 10;
/// Longest accepted field, in code points after whitespace merging.
pub const MAX_FIELD_CHARS: usize = 40;

/// Fragment that sits next to copyright lines on many sites and confuses the copyright pattern.
const COPYRIGHT_NOTICE_MARKER: &str = "版权声明";

/// A compiled field pattern plus the length window a match must fall into.
#[derive(Debug)]
pub struct FieldPattern {
    pub name: &'static str,
    regex: Regex,
    min_chars: usize,
    max_chars: usize,
}

impl FieldPattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("built-in field pattern must compile"),
            min_chars: MIN_FIELD_CHARS,
            max_chars: MAX_FIELD_CHARS,
        }
    }

    /// First (leftmost) raw match in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }

    /// Normalize a raw match and apply the length window.
    /// Returns an empty string when the normalized value is out of bounds.
    pub fn accept(&self, raw: &str) -> String {
        let normalized = merge_spaces(raw);
        let len = normalized.chars().count();
        if len < self.min_chars || len > self.max_chars {
            if !raw.is_empty() {
                debug!("Rejected {} candidate ({} chars): {:?}", self.name, len, normalized);
            }
            return String::new();
        }
        normalized
    }

    /// Find, normalize and validate in one step. Empty when nothing acceptable matched.
    pub fn extract(&self, text: &str) -> String {
        self.find(text).map(|raw| self.accept(raw)).unwrap_or_default()
    }
}

/// `<region>ICP备<digits>号[-<n>]`, with an optional word/Han prefix.
pub static ICP_PATTERN: Lazy<FieldPattern> = Lazy::new(|| {
    FieldPattern::new(
        "icp",
        r"(?:[0-9A-Za-z_]|\p{Han})*ICP(备)?[0-9]{1,10}(号)(-[0-9]+)?",
    )
});

/// One of the attribution labels, an optional separator, then the credited name.
pub static TECH_SUPPORT_PATTERN: Lazy<FieldPattern> = Lazy::new(|| {
    FieldPattern::new(
        "tech_support",
        r"(?m)(技术支持|技术提供|网站建设|技术服务)[:：\t\n\x0C\r ]*([A-Za-z0-9\x{4e00}-\x{9fa5}()\-]+)",
    )
});

/// Anything up to a copyright marker, then text running to a Han-character run.
/// A second `©` clause on the same line is folded into the match.
pub static COPYRIGHT_PATTERN: Lazy<FieldPattern> = Lazy::new(|| {
    FieldPattern::new(
        "copyright",
        r"(?i)(?:.*?)(?:copyright|©|版权).+?([\x{4e00}-\x{9fa5}]+)(?:.+?©.+?[\x{4e00}-\x{9fa5}]+)?",
    )
});

static REPEATED_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{2,}|\t{2,}| {2,}").expect("whitespace pattern must compile"));

/// Collapse runs of two or more identical newlines, tabs or spaces into one.
///
/// Mixed runs (`" \t"`) are left alone and nothing is trimmed.
pub fn merge_spaces(text: &str) -> String {
    REPEATED_WHITESPACE
        .replace_all(text, |caps: &Captures| caps[0][..1].to_string())
        .into_owned()
}

/// The three validated footer fields. Empty strings mean "nothing acceptable found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FooterFields {
    pub icp: String,
    pub tech_support: String,
    pub copyright: String,
}

/// Run one extraction stage over the working text.
///
/// Returns the accepted field and the text handed to the next stage. The raw
/// match is removed from the text only when the field was accepted.
fn take_field(pattern: &FieldPattern, text: String) -> (String, String) {
    let Some(raw) = pattern.find(&text).map(str::to_string) else {
        return (String::new(), text);
    };
    let value = pattern.accept(&raw);
    if value.is_empty() {
        return (value, text);
    }
    let rest = text.replace(&raw, "");
    (value, rest)
}

/// Extract ICP, tech-support and copyright fields from raw footer text.
pub fn extract_fields(raw_text: &str) -> FooterFields {
    let (icp, text) = take_field(&ICP_PATTERN, raw_text.to_string());
    let text = text.replace(COPYRIGHT_NOTICE_MARKER, "");

    let (tech_support, text) = take_field(&TECH_SUPPORT_PATTERN, text);

    let copyright = COPYRIGHT_PATTERN.extract(&text);

    FooterFields {
        icp,
        tech_support,
        copyright,
    }
}
