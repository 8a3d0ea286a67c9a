use std::io;

use thiserror::Error;

use crate::sources::SourceId;

/// Navigation failures. Always recovered by the page fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("blocked at {url} (status {status})")]
    Blocked { url: String, status: u16 },
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
    #[error("no page loaded in the session")]
    NoPage,
}

/// Why a source contributed nothing to the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_id} unreachable after {attempts} page load(s)")]
    Unreachable { source_id: SourceId, attempts: usize },
    #[error("extractor for {source_id} is broken: {reason}")]
    Extractor { source_id: SourceId, reason: String },
    #[error("collector for {source_id} panicked: {message}")]
    Panicked { source_id: SourceId, message: String },
}

impl SourceError {
    /// Unreachable sources are expected; the other variants point at a defect in our code.
    pub fn is_defect(&self) -> bool {
        !matches!(self, SourceError::Unreachable { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("policy file {path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("policy pattern '{name}' does not compile: {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("policy has no include terms")]
    EmptyIncludeTerms,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
