use thiserror::Error;

/// Request-level failures surfaced to the caller. Row-level anomalies
/// never appear here: a bad cell degrades its own record and the feed
/// survives.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("failed to fetch flight information: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("flight information source returned HTTP {status}")]
    SourceStatus { status: u16 },

    #[error("invalid reference time '{input}', expected {expected}")]
    InvalidReferenceTime {
        input: String,
        expected: &'static str,
    },
}
