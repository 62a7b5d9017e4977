use thiserror::Error;
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("stimulus frequency list is empty")]
    EmptyFrequencyList,
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("chunk has {samples} samples but {timestamps} timestamps")]
    ChunkShape { samples: usize, timestamps: usize },
    #[error("timestamp {actual} precedes buffered timestamp {previous}")]
    NonMonotonicTimestamp { previous: f64, actual: f64 },
    #[error("no stream channel matches the configured names {0:?}")]
    NoChannelsSelected(Vec<String>),
    #[error("window has {samples} samples for {variables} variables")]
    InsufficientSamples { samples: usize, variables: usize },
    #[error("degenerate window: {0}")]
    DegenerateWindow(String),
    #[error("marker protocol violation: {0}")]
    Protocol(String),
    #[error("transport error: {0}")]
    Transport(String),
}
impl DecoderError {
    /// Errors the main loop contains instead of unwinding.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecoderError::InsufficientSamples { .. }
                | DecoderError::DegenerateWindow(_)
                | DecoderError::Protocol(_)
                | DecoderError::Transport(_)
                | DecoderError::NonMonotonicTimestamp { .. }
                | DecoderError::ChunkShape { .. }
        )
    }
}
