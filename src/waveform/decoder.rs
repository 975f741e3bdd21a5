use crate::waveform::ScopeError;

/// Turns a raw little-endian byte stream into signed 16-bit samples.
///
/// Chunk boundaries may split a sample; the low byte is held back and paired
/// with the first byte of the next chunk.
#[derive(Debug, Default)]
pub struct SampleDecoder {
    pending: Option<u8>,
}

impl SampleDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode<'a>(&mut self, bytes: &'a [u8]) -> impl Iterator<Item = i16> + 'a {
        let mut rest = bytes;
        let mut head = None;
        if let Some(lo) = self.pending {
            if let Some((&hi, tail)) = bytes.split_first() {
                head = Some(i16::from_le_bytes([lo, hi]));
                rest = tail;
                self.pending = None;
            }
        }
        let frames = rest.chunks_exact(2);
        if let [odd] = frames.remainder() {
            self.pending = Some(*odd);
        }
        head.into_iter()
            .chain(frames.map(|pair| i16::from_le_bytes([pair[0], pair[1]])))
    }

    pub fn has_pending_byte(&self) -> bool {
        self.pending.is_some()
    }

    /// End of stream. A byte still waiting for its partner cannot form a sample.
    pub fn finish(&mut self) -> Result<(), ScopeError> {
        match self.pending.take() {
            Some(byte) => Err(ScopeError::TruncatedFrame { byte }),
            None => Ok(()),
        }
    }
}

/// Reference PCM writer: 16-bit little-endian, the exact inverse of [`SampleDecoder::decode`].
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
