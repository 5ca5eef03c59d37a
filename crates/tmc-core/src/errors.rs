use crate::domain::ChannelId;
use crate::pipeline::PipelineState;

/// Core error type for the crawler.
///
/// Adapter crates map their transport-specific errors into this type so the pipeline can tell
/// a recoverable discovery hiccup from a run-aborting stream failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("message stream for {term:?} in channel {channel} failed: {reason}")]
    Stream {
        term: String,
        channel: ChannelId,
        reason: String,
    },

    #[error("invalid pipeline transition: {from:?} -> {to:?}")]
    InvalidState {
        from: PipelineState,
        to: PipelineState,
    },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
