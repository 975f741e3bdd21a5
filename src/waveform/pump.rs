use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::waveform::config::StreamSettings;
use crate::waveform::decoder::SampleDecoder;
use crate::waveform::header::WavHeaderFilter;
use crate::waveform::paginator::{PageReader, Paginator};
use crate::waveform::reducer::WindowReducer;
use crate::waveform::sink::PlaybackSink;
use crate::waveform::source::ByteSource;
use crate::waveform::ScopeError;

/// Why a session stopped reading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionEnd {
    #[default]
    EndOfStream,
    Shutdown,
    ConnectionLost(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub bytes_in: u64,
    pub samples: u64,
    pub points: u64,
    pub pages_completed: u64,
    pub header_skipped: bool,
    pub dropped_trailing_byte: bool,
    pub end: SessionEnd,
}

/// One session: source bytes go to playback verbatim and, in the same order,
/// through decoder, reducer and paginator.
pub struct StreamPump<S: ByteSource, P: PlaybackSink> {
    source: S,
    sink: P,
    header: WavHeaderFilter,
    decoder: SampleDecoder,
    reducer: WindowReducer,
    paginator: Paginator,
    shutdown: Arc<AtomicBool>,
    summary: SessionSummary,
}

impl<S: ByteSource, P: PlaybackSink> StreamPump<S, P> {
    pub fn new(settings: &StreamSettings, source: S, sink: P) -> Result<Self, ScopeError> {
        Ok(Self {
            source,
            sink,
            header: WavHeaderFilter::new(settings.skip_wav_header),
            decoder: SampleDecoder::new(),
            reducer: WindowReducer::new(settings.policy, settings.samples_per_point)?,
            paginator: Paginator::new(
                settings.page_mode,
                settings.points_per_page,
                settings.time_step(),
            ),
            shutdown: Arc::new(AtomicBool::new(false)),
            summary: SessionSummary::default(),
        })
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn reader(&self) -> PageReader {
        self.paginator.reader()
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Handles one chunk from the source. `Ok(false)` once the source is exhausted.
    pub fn pump_once(&mut self) -> Result<bool, ScopeError> {
        let Some(chunk) = self.source.next_chunk()? else {
            return Ok(false);
        };
        self.summary.bytes_in += chunk.len() as u64;
        let payload = self.header.filter(&chunk);
        self.forward(&payload)?;
        Ok(true)
    }

    fn forward(&mut self, payload: &[u8]) -> Result<(), ScopeError> {
        if payload.is_empty() {
            return Ok(());
        }
        self.sink.play(payload)?;
        for sample in self.decoder.decode(payload) {
            self.summary.samples += 1;
            if let Some(amplitude) = self.reducer.push(sample) {
                self.paginator.append(amplitude)?;
                self.summary.points += 1;
            }
        }
        Ok(())
    }

    /// Pumps until end of stream, a connection failure or shutdown.
    /// Only errors that leave the display inconsistent are returned.
    pub fn run(mut self) -> Result<SessionSummary, ScopeError> {
        let end = loop {
            if self.shutdown.load(Ordering::Acquire) {
                break SessionEnd::Shutdown;
            }
            match self.pump_once() {
                Ok(true) => {}
                Ok(false) => break SessionEnd::EndOfStream,
                Err(ScopeError::Connection(reason)) => break SessionEnd::ConnectionLost(reason),
                Err(ScopeError::Io(err)) => break SessionEnd::ConnectionLost(err.to_string()),
                Err(err) => return Err(err),
            }
        };
        self.close(end)
    }

    fn close(mut self, end: SessionEnd) -> Result<SessionSummary, ScopeError> {
        if end == SessionEnd::EndOfStream {
            let held = self.header.finish();
            match self.forward(&held) {
                Ok(()) => {}
                Err(ScopeError::Connection(reason)) => warn!("playback rejected the last bytes: {reason}"),
                Err(err) => return Err(err),
            }
        }
        if let Err(err) = self.decoder.finish() {
            warn!("{err}; dropping it");
            self.summary.dropped_trailing_byte = true;
        }
        let pending = self.reducer.pending();
        if pending > 0 {
            debug!("discarding {pending} samples of an unfinished display point");
            self.reducer.reset();
        }
        if let Err(err) = self.sink.finish() {
            warn!("playback did not finish cleanly: {err}");
        }

        let mut summary = self.summary;
        summary.pages_completed = self.paginator.stats().pages_completed;
        summary.header_skipped = self.header.header_skipped();
        summary.end = end;
        info!(
            "session ended ({:?}): {} bytes, {} samples, {} points, {} pages",
            summary.end, summary.bytes_in, summary.samples, summary.points, summary.pages_completed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SineWave;
    use crate::waveform::config::StreamConfig;
    use crate::waveform::decoder::encode_samples;
    use crate::waveform::sink::{CaptureSink, NullSink, ThreadedSink};
    use crate::waveform::source::ManualSource;
    use crate::waveform::paginator::PaginatorState;

    struct DroppingSource {
        chunks: Vec<Vec<u8>>,
    }

    impl ByteSource for DroppingSource {
        fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ScopeError> {
            if self.chunks.is_empty() {
                return Err(ScopeError::Connection("reset by peer".to_owned()));
            }
            Ok(Some(self.chunks.remove(0)))
        }
    }

    fn default_settings() -> StreamSettings {
        StreamConfig::default().validate().unwrap()
    }

    fn sine_bytes(count: usize) -> Vec<u8> {
        let samples: Vec<i16> = SineWave::new(440.0, 44_100).take(count).collect();
        encode_samples(&samples)
    }

    #[test]
    fn sine_fills_exactly_one_page() {
        let settings = default_settings();
        let bytes = sine_bytes(3000);
        let capture = CaptureSink::default();
        let mut pump = StreamPump::new(
            &settings,
            ManualSource::chunked(&bytes, settings.chunk_size),
            capture.clone(),
        )
        .unwrap();
        let reader = pump.reader();
        while pump.pump_once().unwrap() {}
        assert_eq!(pump.paginator().state(), PaginatorState::FillingSecond);

        let page = reader.renderable_page();
        assert_eq!(page.len(), 150);
        assert!(page.is_full());
        let step = 0.07 / 150.0;
        for (k, point) in page.points.iter().enumerate() {
            assert!((point.time - k as f64 * step).abs() < 1e-12);
        }
        let peak = page.points.iter().map(|p| p.amplitude.abs()).max().unwrap();
        assert!(peak > 20_000, "averaged sine should keep most of its peak, got {peak}");

        let summary = pump.run().unwrap();
        assert_eq!(summary.samples, 3000);
        assert_eq!(summary.points, 150);
        assert_eq!(summary.pages_completed, 1);
        assert_eq!(summary.end, SessionEnd::EndOfStream);
        assert_eq!(capture.bytes(), bytes);
    }

    #[test]
    fn odd_byte_split_across_chunks() {
        let settings = default_settings();
        let bytes: Vec<u8> = (0..2001u32).map(|v| (v * 7) as u8).collect();
        let source = ManualSource::new(vec![bytes[..1001].to_vec(), bytes[1001..].to_vec()]);
        let pump = StreamPump::new(&settings, source, NullSink).unwrap();
        let summary = pump.run().unwrap();
        assert_eq!(summary.bytes_in, 2001);
        assert_eq!(summary.samples, 1000);
        assert_eq!(summary.points, 50);
        assert!(summary.dropped_trailing_byte);
    }

    #[test]
    fn wav_header_is_not_played_or_drawn() {
        let settings = default_settings();
        let payload = sine_bytes(400);
        let mut stream = b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec();
        stream.resize(44, 0);
        stream.extend_from_slice(&payload);

        let capture = CaptureSink::default();
        let pump = StreamPump::new(&settings, ManualSource::chunked(&stream, 10), capture.clone()).unwrap();
        let summary = pump.run().unwrap();
        assert!(summary.header_skipped);
        assert_eq!(summary.samples, 400);
        assert_eq!(summary.points, 20);
        assert_eq!(capture.bytes(), payload);
    }

    #[test]
    fn playback_through_worker_matches_input() {
        let settings = default_settings();
        let bytes = sine_bytes(10_000);
        let capture = CaptureSink::default();
        let sink = ThreadedSink::spawn(capture.clone(), settings.playback_queue_chunks).unwrap();
        let pump = StreamPump::new(&settings, ManualSource::chunked(&bytes, 333), sink).unwrap();
        let summary = pump.run().unwrap();
        assert_eq!(summary.samples, 10_000);
        assert_eq!(capture.bytes(), bytes);
    }

    #[test]
    fn shutdown_stops_at_read_boundary() {
        let settings = default_settings();
        let flag = Arc::new(AtomicBool::new(true));
        let pump = StreamPump::new(&settings, ManualSource::chunked(&sine_bytes(100), 64), NullSink)
            .unwrap()
            .with_shutdown(Arc::clone(&flag));
        let summary = pump.run().unwrap();
        assert_eq!(summary.end, SessionEnd::Shutdown);
        assert_eq!(summary.bytes_in, 0);
    }

    #[test]
    fn lost_connection_keeps_what_was_drawn() {
        let settings = default_settings();
        let source = DroppingSource {
            chunks: vec![sine_bytes(45)],
        };
        let pump = StreamPump::new(&settings, source, NullSink).unwrap();
        let reader = pump.reader();
        let summary = pump.run().unwrap();
        assert!(matches!(summary.end, SessionEnd::ConnectionLost(_)));
        assert_eq!(summary.samples, 45);
        assert_eq!(summary.points, 2);
        assert!(reader.renderable_page().is_empty());
    }
}
