use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Page could not be retrieved. Fatal for the current run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("SPIDER_API_KEY must be set for rendered fetch mode")]
    MissingApiKey,

    #[error("spider request failed: {0}")]
    Spider(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("page body was empty for {0}")]
    EmptyBody(String),
}

/// Why the embedded state could not be recovered from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailure {
    MarkerNotFound,
    UnbalancedBraces,
    ParseFailed,
}

impl ExtractionFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionFailure::MarkerNotFound => "marker-not-found",
            ExtractionFailure::UnbalancedBraces => "unbalanced-braces",
            ExtractionFailure::ParseFailed => "parse-failed",
        }
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("could not extract embedded state ({reason}){}", detail_suffix(.detail))]
pub struct ExtractionError {
    pub reason: ExtractionFailure,
    pub detail: Option<String>,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

impl ExtractionError {
    pub fn new(reason: ExtractionFailure) -> Self {
        Self { reason, detail: None }
    }

    pub fn parse_failed(offset: usize, message: impl Into<String>) -> Self {
        Self {
            reason: ExtractionFailure::ParseFailed,
            detail: Some(format!("at byte {}: {}", offset, message.into())),
        }
    }
}

/// Snapshot file unreadable, corrupt, or unwritable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {} is corrupt: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write snapshot {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Notification delivery failure. Logged and swallowed by the coordinator.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Fatal outcome of a single pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
