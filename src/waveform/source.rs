use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::waveform::ScopeError;

/// Something that yields raw PCM chunks until the stream ends.
pub trait ByteSource {
    /// `Ok(None)` marks a clean end of stream.
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ScopeError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Vec<u8>>,
}

impl ManualSource {
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            queue: chunks.into_iter().collect(),
        }
    }

    /// Splits `bytes` into chunks of `chunk_size`, like a socket read loop would.
    pub fn chunked(bytes: &[u8], chunk_size: usize) -> Self {
        Self::new(bytes.chunks(chunk_size.max(1)).map(<[u8]>::to_vec))
    }
}

impl ByteSource for ManualSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ScopeError> {
        Ok(self.queue.pop_front())
    }
}

/// Blocking reads of at most `chunk_size` bytes from a socket or any other reader.
pub struct ReaderSource<R: Read> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ScopeError> {
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buffer) {
                Ok(0) => return Ok(None),
                Ok(read) => {
                    buffer.truncate(read);
                    return Ok(Some(buffer));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ScopeError::Connection(err.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::ConnectionReset, "peer reset"))
        }
    }

    #[test]
    fn reader_source_yields_bounded_chunks_then_ends() {
        let data: Vec<u8> = (0..2500u32).map(|v| v as u8).collect();
        let mut source = ReaderSource::new(Cursor::new(data.clone()), 1024);
        let mut collected = Vec::new();
        while let Some(chunk) = source.next_chunk().unwrap() {
            assert!(chunk.len() <= 1024 && !chunk.is_empty());
            collected.extend(chunk);
        }
        assert_eq!(collected, data);
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn read_failure_is_a_connection_error() {
        let mut source = ReaderSource::new(BrokenReader, 64);
        assert!(matches!(source.next_chunk(), Err(ScopeError::Connection(_))));
    }

    #[test]
    fn manual_source_replays_chunks_in_order() {
        let mut source = ManualSource::chunked(&[1, 2, 3, 4, 5], 2);
        assert_eq!(source.next_chunk().unwrap(), Some(vec![1, 2]));
        assert_eq!(source.next_chunk().unwrap(), Some(vec![3, 4]));
        assert_eq!(source.next_chunk().unwrap(), Some(vec![5]));
        assert_eq!(source.next_chunk().unwrap(), None);
    }
}
