use std::borrow::Cow;

use log::info;

pub const WAV_HEADER_LEN: usize = 44;
const PROBE_LEN: usize = 12;

#[derive(Debug)]
enum HeaderState {
    /// Collecting the first bytes to look for `RIFF....WAVE`.
    Probing(Vec<u8>),
    Skipping(usize),
    Passthrough,
}

enum Probe {
    Undecided,
    Wav,
    Raw,
}

fn classify(probe: &[u8]) -> Probe {
    let prefix = probe.len().min(4);
    if probe[..prefix] != b"RIFF"[..prefix] {
        return Probe::Raw;
    }
    if probe.len() < PROBE_LEN {
        return Probe::Undecided;
    }
    if &probe[8..12] == b"WAVE" {
        Probe::Wav
    } else {
        Probe::Raw
    }
}

/// Drops a canonical 44-byte WAV header from the front of an inbound stream.
/// Streams that do not start with `RIFF....WAVE` pass through untouched.
#[derive(Debug)]
pub struct WavHeaderFilter {
    state: HeaderState,
    skipped: bool,
}

impl WavHeaderFilter {
    pub fn new(enabled: bool) -> Self {
        let state = if enabled {
            HeaderState::Probing(Vec::with_capacity(PROBE_LEN))
        } else {
            HeaderState::Passthrough
        };
        Self {
            state,
            skipped: false,
        }
    }

    pub fn header_skipped(&self) -> bool {
        self.skipped
    }

    /// Payload bytes of `chunk`; borrowed unless probe bytes had to be re-emitted.
    pub fn filter<'a>(&mut self, chunk: &'a [u8]) -> Cow<'a, [u8]> {
        match &mut self.state {
            HeaderState::Passthrough => Cow::Borrowed(chunk),
            HeaderState::Skipping(remaining) => {
                let skip = (*remaining).min(chunk.len());
                *remaining -= skip;
                if *remaining == 0 {
                    self.state = HeaderState::Passthrough;
                }
                Cow::Borrowed(&chunk[skip..])
            }
            HeaderState::Probing(probe) => {
                let take = (PROBE_LEN - probe.len()).min(chunk.len());
                probe.extend_from_slice(&chunk[..take]);
                let rest = &chunk[take..];
                match classify(probe) {
                    Probe::Undecided => Cow::Owned(Vec::new()),
                    Probe::Wav => {
                        info!("inbound stream carries a WAV header, skipping {WAV_HEADER_LEN} bytes");
                        self.skipped = true;
                        self.state = HeaderState::Skipping(WAV_HEADER_LEN - PROBE_LEN);
                        self.filter(rest)
                    }
                    Probe::Raw => {
                        let mut payload = std::mem::take(probe);
                        payload.extend_from_slice(rest);
                        self.state = HeaderState::Passthrough;
                        Cow::Owned(payload)
                    }
                }
            }
        }
    }

    /// Bytes still held for probing when the stream ended early.
    pub fn finish(&mut self) -> Vec<u8> {
        match std::mem::replace(&mut self.state, HeaderState::Passthrough) {
            HeaderState::Probing(probe) => probe,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_stream(payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&((36 + payload.len()) as u32).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&44_100u32.to_le_bytes());
        bytes.extend_from_slice(&88_200u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        bytes.extend_from_slice(payload);
        bytes
    }

    fn run(filter: &mut WavHeaderFilter, stream: &[u8], chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for part in stream.chunks(chunk) {
            out.extend_from_slice(&filter.filter(part));
        }
        out.extend(filter.finish());
        out
    }

    #[test]
    fn strips_header_in_one_chunk() {
        let payload: Vec<u8> = (0..200u8).collect();
        let mut filter = WavHeaderFilter::new(true);
        assert_eq!(run(&mut filter, &wav_stream(&payload), 1024), payload);
        assert!(filter.header_skipped());
    }

    #[test]
    fn strips_header_split_across_chunks() {
        let payload: Vec<u8> = (0..97u8).collect();
        for chunk in [1, 5, 12, 13, 43, 45] {
            let mut filter = WavHeaderFilter::new(true);
            assert_eq!(run(&mut filter, &wav_stream(&payload), chunk), payload, "chunk {chunk}");
        }
    }

    #[test]
    fn raw_pcm_passes_through() {
        let stream: Vec<u8> = (0..300u32).map(|v| (v % 251) as u8).collect();
        for chunk in [1, 3, 1024] {
            let mut filter = WavHeaderFilter::new(true);
            assert_eq!(run(&mut filter, &stream, chunk), stream);
            assert!(!filter.header_skipped());
        }
    }

    #[test]
    fn riff_without_wave_is_not_a_header() {
        let mut stream = b"RIFF\x00\x00\x00\x00AVI LIST".to_vec();
        stream.extend_from_slice(&[1, 2, 3]);
        let mut filter = WavHeaderFilter::new(true);
        assert_eq!(run(&mut filter, &stream, 4), stream);
    }

    #[test]
    fn short_stream_is_flushed_on_finish() {
        let mut filter = WavHeaderFilter::new(true);
        assert!(filter.filter(b"RIF").is_empty());
        assert_eq!(filter.finish(), b"RIF".to_vec());
    }

    #[test]
    fn disabled_filter_keeps_header() {
        let stream = wav_stream(&[9, 9]);
        let mut filter = WavHeaderFilter::new(false);
        assert_eq!(run(&mut filter, &stream, 7), stream);
    }
}
