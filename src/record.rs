use serde::{Deserialize, Serialize};

use crate::extractor::FooterFields;

/// One output row: the input URL and the three footer fields found on its page.
///
/// Any field may be empty. An empty field means the pattern did not match or
/// the match fell outside the validity window; the two cases are not told apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub icp: String,
    pub tech_support: String,
    pub copyright: String,
}

impl ExtractionResult {
    /// Record for a URL whose page produced nothing (render failure, timeout, no footer).
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn from_fields(url: impl Into<String>, fields: FooterFields) -> Self {
        Self {
            url: url.into(),
            icp: fields.icp,
            tech_support: fields.tech_support,
            copyright: fields.copyright,
        }
    }

    /// True when none of the three fields were extracted.
    pub fn is_empty(&self) -> bool {
        self.icp.is_empty() && self.tech_support.is_empty() && self.copyright.is_empty()
    }

    /// Column order used by the CSV sink.
    pub fn as_row(&self) -> [&str; 4] {
        [&self.url, &self.icp, &self.tech_support, &self.copyright]
    }
}
