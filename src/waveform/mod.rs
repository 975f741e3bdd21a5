// src/waveform/mod.rs
// PCM byte stream -> samples -> reduced display points -> pages.
pub mod config;
pub mod decoder;
pub mod error;
pub mod header;
pub mod page;
pub mod paginator;
pub mod plot;
pub mod pump;
pub mod reducer;
pub mod sink;
pub mod source;

pub use config::{StreamConfig, StreamSettings};
pub use decoder::encode_samples;
pub use error::ScopeError;
pub use header::WAV_HEADER_LEN;
pub use paginator::{PageReader, PageSnapshot};
pub use plot::{render_page_png, PlotStyle};
pub use pump::{SessionEnd, SessionSummary, StreamPump};
pub use sink::{NullSink, PlaybackSink, ThreadedSink, WriterSink};
pub use source::ReaderSource;
