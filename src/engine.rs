// src/engine.rs
use std::fs::File;
use std::io::BufWriter;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::types::{PlaybackTarget, StreamEvent};
use crate::waveform::{
    render_page_png, NullSink, PageReader, PlaybackSink, PlotStyle, ReaderSource,
    SessionSummary, StreamPump, StreamSettings, ThreadedSink, WriterSink,
};

pub const DEFAULT_PORT: u16 = 12_345;

#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub settings: StreamSettings,
    pub playback: PlaybackTarget,
    /// Stop accepting after this many sessions; `None` serves forever.
    pub max_sessions: Option<usize>,
    /// Headless rendering: the last page of every session is written here.
    pub png_out: Option<PathBuf>,
}

pub fn bind(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port)).with_context(|| format!("could not listen on {host}:{port}"))
}

pub fn spawn_thread(
    listener: TcpListener,
    options: EngineOptions,
    tx: Sender<StreamEvent>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(err) = serve(listener, &options, &tx, &shutdown) {
            error!("engine stopped: {err:#}");
            tx.send(StreamEvent::Log(format!("engine stopped: {err:#}"))).ok();
        }
    })
}

/// Accepts producers one at a time; each connection is a full session.
pub fn serve(
    listener: TcpListener,
    options: &EngineOptions,
    tx: &Sender<StreamEvent>,
    shutdown: &Arc<AtomicBool>,
) -> Result<usize> {
    let local = listener.local_addr().context("listener has no local address")?;
    info!("waiting for a PCM producer on {local}");
    tx.send(StreamEvent::Listening(local)).ok();

    let mut served = 0;
    for stream in listener.incoming() {
        if shutdown.load(Ordering::Acquire) {
            break;
        }
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!("accept failed: {err}");
                continue;
            }
        };
        served += 1;
        match run_session(stream, options, tx, shutdown) {
            Ok(summary) => tx.send(StreamEvent::SessionEnded(summary)).ok(),
            Err(err) => {
                error!("session failed: {err:#}");
                tx.send(StreamEvent::Log(format!("session failed: {err:#}"))).ok()
            }
        };
        if shutdown.load(Ordering::Acquire) || options.max_sessions.is_some_and(|max| served >= max) {
            break;
        }
    }
    Ok(served)
}

fn run_session(
    stream: TcpStream,
    options: &EngineOptions,
    tx: &Sender<StreamEvent>,
    shutdown: &Arc<AtomicBool>,
) -> Result<SessionSummary> {
    let peer = stream.peer_addr().context("producer has no peer address")?;
    info!("producer connected from {peer}");
    tx.send(StreamEvent::Log(format!("connected: {peer}"))).ok();

    let settings = options.settings;
    let playback = open_playback(&options.playback)?;
    let sink = ThreadedSink::spawn(playback, settings.playback_queue_chunks)
        .context("could not start the playback worker")?;
    let source = ReaderSource::new(stream, settings.chunk_size);
    let pump = StreamPump::new(&settings, source, sink)?.with_shutdown(Arc::clone(shutdown));
    let reader = pump.reader();
    tx.send(StreamEvent::SessionStarted {
        peer,
        reader: reader.clone(),
        settings,
    })
    .ok();

    let summary = pump
        .run()
        .with_context(|| format!("session with {peer} aborted"))?;
    if let Some(path) = &options.png_out {
        export_png(&reader, &settings, path);
    }
    Ok(summary)
}

fn open_playback(target: &PlaybackTarget) -> Result<Box<dyn PlaybackSink>> {
    Ok(match target {
        PlaybackTarget::Null => Box::new(NullSink),
        PlaybackTarget::Stdout => Box::new(WriterSink::new(std::io::stdout())),
        PlaybackTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("could not create {}", path.display()))?;
            Box::new(WriterSink::new(BufWriter::new(file)))
        }
    })
}

fn export_png(reader: &PageReader, settings: &StreamSettings, path: &Path) {
    let page = reader.renderable_page();
    let png = match render_page_png(&page, settings, &PlotStyle::default()) {
        Ok(png) => png,
        Err(err) => {
            warn!("no PNG written: {err}");
            return;
        }
    };
    match std::fs::write(path, png) {
        Ok(()) => info!("wrote page {} ({} points) to {}", page.generation, page.len(), path.display()),
        Err(err) => warn!("could not write {}: {err}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SineWave;
    use crate::waveform::{encode_samples, SessionEnd, StreamConfig};
    use std::io::Write;
    use std::sync::mpsc::channel;

    #[test]
    fn serves_one_session_over_loopback() {
        let listener = bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().unwrap();
        let samples: Vec<i16> = SineWave::new(440.0, 44_100).take(3000).collect();
        let bytes = encode_samples(&samples);
        let producer = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&bytes).unwrap();
        });

        let png = std::env::temp_dir().join(format!("pcmscope-engine-{}.png", std::process::id()));
        let options = EngineOptions {
            settings: StreamConfig::default().validate().unwrap(),
            playback: PlaybackTarget::Null,
            max_sessions: Some(1),
            png_out: Some(png.clone()),
        };
        let (tx, rx) = channel();
        let served = serve(listener, &options, &tx, &Arc::new(AtomicBool::new(false))).unwrap();
        producer.join().unwrap();
        assert_eq!(served, 1);

        let events: Vec<StreamEvent> = rx.try_iter().collect();
        assert!(matches!(&events[0], StreamEvent::Listening(local) if *local == addr));
        let reader = events
            .iter()
            .find_map(|event| match event {
                StreamEvent::SessionStarted { reader, .. } => Some(reader.clone()),
                _ => None,
            })
            .unwrap();
        let summary = events
            .iter()
            .find_map(|event| match event {
                StreamEvent::SessionEnded(summary) => Some(summary.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(summary.samples, 3000);
        assert_eq!(summary.points, 150);
        assert_eq!(summary.end, SessionEnd::EndOfStream);
        assert!(reader.renderable_page().is_full());

        let written = std::fs::read(&png).unwrap();
        std::fs::remove_file(&png).ok();
        assert_eq!(&written[..4], b"\x89PNG");
    }

    #[test]
    fn file_playback_receives_the_stream() {
        let listener = bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().unwrap();
        let bytes: Vec<u8> = (0..5000u32).map(|v| (v % 253) as u8).collect();
        let sent = bytes.clone();
        let producer = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&sent).unwrap();
        });

        let out = std::env::temp_dir().join(format!("pcmscope-playback-{}.pcm", std::process::id()));
        let options = EngineOptions {
            settings: StreamConfig::default().validate().unwrap(),
            playback: PlaybackTarget::File(out.clone()),
            max_sessions: Some(1),
            png_out: None,
        };
        let (tx, _rx) = channel();
        serve(listener, &options, &tx, &Arc::new(AtomicBool::new(false))).unwrap();
        producer.join().unwrap();

        let played = std::fs::read(&out).unwrap();
        std::fs::remove_file(&out).ok();
        assert_eq!(played, bytes);
    }
}
