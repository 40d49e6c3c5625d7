//! Failure taxonomy for calls to the inventory API.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`Inventory::lookup`](super::Inventory::lookup).
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Company or barcode was empty; no request was sent.
    #[error("missing company or barcode")]
    InvalidQuery,

    /// 4xx from upstream. Never retried.
    #[error("upstream rejected the request with status {status}: {message}")]
    Client { status: u16, message: String },

    /// 5xx from upstream.
    #[error("upstream failed with status {status}: {message}")]
    Server { status: u16, message: String },

    /// No response within the per-attempt timeout.
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or body-read failure.
    #[error("upstream transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Every attempt failed with a retryable error.
    #[error("upstream failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<UpstreamError>,
    },
}

impl UpstreamError {
    /// Whether another attempt could succeed.
    ///
    /// Only timeouts, transport failures and 5xx qualify; a 4xx means the
    /// request itself is wrong and repeating it cannot help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Timeout(_) | Self::Transport(_)
        )
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Classifies a non-success HTTP status.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        if (400..500).contains(&status) {
            Self::Client { status, message }
        } else {
            Self::Server { status, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_hundreds_are_final() {
        let err = UpstreamError::from_status(404, "no such item".into());
        assert!(matches!(err, UpstreamError::Client { status: 404, .. }));
        assert!(!err.is_retryable());
        assert!(!UpstreamError::InvalidQuery.is_retryable());
    }

    #[test]
    fn five_hundreds_and_timeouts_retry() {
        assert!(UpstreamError::from_status(503, String::new()).is_retryable());
        assert!(UpstreamError::Timeout(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn exhausted_reports_last_status() {
        let err = UpstreamError::Exhausted {
            attempts: 3,
            last: Box::new(UpstreamError::from_status(502, "bad gateway".into())),
        };
        assert_eq!(err.status(), Some(502));
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "upstream failed after 3 attempts: upstream failed with status 502: bad gateway"
        );
    }
}
