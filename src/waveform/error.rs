use thiserror::Error;
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("connection closed: {0}")]
    Connection(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream ended with a dangling byte 0x{byte:02x} (odd byte count)")]
    TruncatedFrame { byte: u8 },
    #[error("window duration {0}s is not supported (minimum 0.05s, at least one sample per point)")]
    InvalidWindowDuration(f64),
    #[error("page buffer overflow: append past capacity {capacity} without rotation")]
    BufferOverflow { capacity: usize },
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("display width must be at least one point")]
    InvalidDisplayWidth,
    #[error("amplitude range is empty: min {min} must be below max {max}")]
    InvalidAmplitudeRange { min: i32, max: i32 },
    #[error("chunk size and playback queue must be greater than zero")]
    InvalidChunkSize,
    #[error("failed to load config: {0}")]
    Config(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl From<serde_json::Error> for ScopeError {
    fn from(value: serde_json::Error) -> Self {
        ScopeError::Config(value.to_string())
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScopeError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScopeError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for ScopeError {
    fn from(value: image::ImageError) -> Self {
        ScopeError::Plot(value.to_string())
    }
}
