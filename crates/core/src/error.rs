//! Error types for the sampling pipeline.
//!
//! Every runtime error is contained within a single tick or flush. Only
//! [`CollectorError::FatalConfiguration`] stops a collector from starting.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Side of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "bid"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// Errors raised by a snapshot adapter while fetching from an exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection-level failure (DNS, TLS, reset, proxy).
    #[error("network error: {0}")]
    Network(String),

    /// Exchange asked us to slow down.
    #[error("rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited {
        /// Seconds to wait, when the exchange says so.
        retry_after_secs: Option<u64>,
    },

    /// Non-success HTTP status other than 429.
    #[error("HTTP {status_code}: {message}")]
    Http {
        /// HTTP status code.
        status_code: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// Body could not be decoded into a snapshot.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Fetch did not complete in time.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

impl FetchError {
    /// Creates an HTTP status error.
    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status_code,
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}

/// Errors raised by a sink while exporting a batch.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Batch could not be rendered (CSV/JSON).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Remote delivery target rejected or never received the batch.
    #[error("delivery to {sink} failed: {message}")]
    Delivery {
        /// Sink name.
        sink: String,
        /// Failure description.
        message: String,
    },
}

impl ExportError {
    /// Creates a delivery error for the named sink.
    pub fn delivery(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            sink: sink.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by the collection pipeline.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Adapter fetch failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Raw payload could not be normalized.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// A side has no priced levels.
    #[error("empty book: no {0} levels with a price")]
    EmptyBook(BookSide),

    /// Sink rejected the batch.
    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    /// Invalid configuration; the collector never starts.
    #[error("configuration error: {0}")]
    FatalConfiguration(String),
}

impl CollectorError {
    /// Creates a malformed snapshot error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSnapshot(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::FatalConfiguration(message.into())
    }

    /// Returns true for errors that must prevent startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalConfiguration(_))
    }
}
