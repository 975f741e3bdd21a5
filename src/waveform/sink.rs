use std::io::Write;
use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::waveform::ScopeError;

/// Consumer of the raw PCM bytes, e.g. an audio device or a pipe into a player.
pub trait PlaybackSink: Send {
    fn play(&mut self, bytes: &[u8]) -> Result<(), ScopeError>;

    fn finish(&mut self) -> Result<(), ScopeError> {
        Ok(())
    }
}

impl<T: PlaybackSink + ?Sized> PlaybackSink for Box<T> {
    fn play(&mut self, bytes: &[u8]) -> Result<(), ScopeError> {
        (**self).play(bytes)
    }

    fn finish(&mut self) -> Result<(), ScopeError> {
        (**self).finish()
    }
}

/// Discards audio; the waveform is still drawn.
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn play(&mut self, _bytes: &[u8]) -> Result<(), ScopeError> {
        Ok(())
    }
}

/// Forwards bytes verbatim to a writer (stdout piped into `aplay`, a file, ...).
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> PlaybackSink for WriterSink<W> {
    fn play(&mut self, bytes: &[u8]) -> Result<(), ScopeError> {
        self.writer
            .write_all(bytes)
            .map_err(|e| ScopeError::Connection(format!("playback sink: {e}")))
    }

    fn finish(&mut self) -> Result<(), ScopeError> {
        self.writer
            .flush()
            .map_err(|e| ScopeError::Connection(format!("playback sink: {e}")))
    }
}

/// Runs another sink on its own thread behind a bounded queue. The pump only
/// waits when `queue_chunks` chunks are already pending.
pub struct ThreadedSink {
    tx: Option<SyncSender<Vec<u8>>>,
    worker: Option<JoinHandle<Result<u64, ScopeError>>>,
}

impl ThreadedSink {
    pub fn spawn<S: PlaybackSink + 'static>(
        mut sink: S,
        queue_chunks: usize,
    ) -> Result<Self, ScopeError> {
        let (tx, rx) = sync_channel::<Vec<u8>>(queue_chunks.max(1));
        let worker = thread::Builder::new()
            .name("playback".to_owned())
            .spawn(move || {
                let mut played = 0u64;
                for chunk in rx {
                    sink.play(&chunk)?;
                    played += chunk.len() as u64;
                }
                sink.finish()?;
                Ok(played)
            })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Closes the queue and waits for queued audio to drain. Returns bytes played.
    pub fn shutdown(&mut self) -> Result<u64, ScopeError> {
        drop(self.tx.take());
        let Some(worker) = self.worker.take() else {
            return Ok(0);
        };
        let played = worker
            .join()
            .map_err(|_| ScopeError::Connection("playback worker panicked".to_owned()))??;
        debug!("playback worker finished after {played} bytes");
        Ok(played)
    }
}

impl PlaybackSink for ThreadedSink {
    fn play(&mut self, bytes: &[u8]) -> Result<(), ScopeError> {
        let sent = match &self.tx {
            Some(tx) => tx.send(bytes.to_vec()).is_ok(),
            None => false,
        };
        if sent {
            return Ok(());
        }
        // The worker hung up, so its sink failed; surface that failure.
        self.shutdown()?;
        Err(ScopeError::Connection("playback worker stopped".to_owned()))
    }

    fn finish(&mut self) -> Result<(), ScopeError> {
        self.shutdown().map(|_| ())
    }
}

impl Drop for ThreadedSink {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Test sink that keeps everything it was asked to play.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct CaptureSink(pub std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl CaptureSink {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl PlaybackSink for CaptureSink {
    fn play(&mut self, bytes: &[u8]) -> Result<(), ScopeError> {
        self.0.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}
