use serde::Serialize;

use crate::sources::SourceId;

/// A scraped entry before relevance filtering. Links are already resolved
/// against the page they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCandidate {
    pub title: String,
    pub company: String,
    pub link: String,
    pub source: SourceId,
}

/// An accepted, normalized job. `title` is never empty and `link` is either
/// empty or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub link: String,
}

impl JobRecord {
    /// Case-insensitive `(title, company)` identity used for deduplication.
    pub fn identity_key(&self) -> (String, String) {
        (self.title.to_lowercase(), self.company.to_lowercase())
    }
}
