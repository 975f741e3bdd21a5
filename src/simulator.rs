// src/simulator.rs
// Test producer: streams a sine tone or a WAV file to a running server.
use std::f64::consts::TAU;
use std::fs::File;
use std::io::{BufReader, Write};
use std::net::TcpStream;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cli::ClientArgs;
use crate::waveform::{encode_samples, WAV_HEADER_LEN};

// 512 samples = the 1024-byte chunk the server reads
const BLOCK_SAMPLES: usize = 512;

/// Sine tone scaled to the full `i16` range, plus optional uniform noise.
pub struct SineWave {
    step: f64,
    index: u64,
    noise: i32,
    rng: StdRng,
}

impl SineWave {
    pub fn new(frequency: f64, sample_rate: u32) -> Self {
        Self {
            step: TAU * frequency / sample_rate as f64,
            index: 0,
            noise: 0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn with_noise(mut self, amplitude: i32, seed: u64) -> Self {
        self.noise = amplitude.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Iterator for SineWave {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        let clean = (self.step * self.index as f64).sin() * i16::MAX as f64;
        self.index += 1;
        let jitter = if self.noise > 0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0
        };
        Some((clean.round() as i32 + jitter).clamp(i16::MIN as i32, i16::MAX as i32) as i16)
    }
}

/// Sleeps so that sample `n` leaves no earlier than `n / sample_rate` seconds in.
struct Pacer {
    started: Instant,
    sample_rate: u32,
    enabled: bool,
}

impl Pacer {
    fn new(sample_rate: u32, enabled: bool) -> Self {
        Self {
            started: Instant::now(),
            sample_rate,
            enabled,
        }
    }

    fn wait(&self, samples_sent: u64) {
        if !self.enabled || self.sample_rate == 0 {
            return;
        }
        let due = Duration::from_secs_f64(samples_sent as f64 / self.sample_rate as f64);
        let elapsed = self.started.elapsed();
        if due > elapsed {
            thread::sleep(due - elapsed);
        }
    }
}

pub fn run(args: &ClientArgs) -> Result<()> {
    if args.sample_rate == 0 {
        bail!("sample rate must be greater than zero");
    }
    let mut stream = TcpStream::connect((args.host.as_str(), args.port))
        .with_context(|| format!("could not connect to {}:{}", args.host, args.port))?;
    stream.set_nodelay(true).ok();
    let pace = !args.no_pace;

    let sent = match &args.wav {
        Some(path) if args.with_header => {
            info!("streaming {} with its header to {}:{}", path.display(), args.host, args.port);
            send_wav_file(&mut stream, path, args.sample_rate, pace)?
        }
        Some(path) => {
            info!("streaming {} to {}:{}", path.display(), args.host, args.port);
            send_wav_samples(&mut stream, path, args.sample_rate, pace)?
        }
        None => {
            let total = (args.duration * args.sample_rate as f64).round().max(0.0) as usize;
            info!(
                "streaming {} Hz sine for {}s ({total} samples) to {}:{}",
                args.frequency, args.duration, args.host, args.port
            );
            let wave = SineWave::new(args.frequency, args.sample_rate).with_noise(args.noise, args.seed);
            send_samples(&mut stream, wave.take(total), &Pacer::new(args.sample_rate, pace))?
        }
    };
    info!("done, {sent} bytes sent");
    Ok(())
}

fn send_samples<W: Write>(
    out: &mut W,
    samples: impl IntoIterator<Item = i16>,
    pacer: &Pacer,
) -> Result<u64> {
    let mut samples = samples.into_iter();
    let mut sent = 0u64;
    loop {
        let block: Vec<i16> = samples.by_ref().take(BLOCK_SAMPLES).collect();
        if block.is_empty() {
            break;
        }
        pacer.wait(sent);
        out.write_all(&encode_samples(&block))
            .context("server connection finished")?;
        sent += block.len() as u64;
    }
    out.flush().context("server connection finished")?;
    Ok(sent * 2)
}

fn open_wav(path: &Path, expected_rate: u32) -> Result<WavReader<BufReader<File>>> {
    let reader = WavReader::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 || spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
        bail!(
            "{} must be 16-bit integer mono PCM (found {} channel(s), {} bits, {:?})",
            path.display(),
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );
    }
    if spec.sample_rate != expected_rate {
        warn!(
            "{} is recorded at {} Hz, the server is assumed to run at {expected_rate} Hz",
            path.display(),
            spec.sample_rate
        );
    }
    Ok(reader)
}

fn send_wav_samples<W: Write>(out: &mut W, path: &Path, expected_rate: u32, pace: bool) -> Result<u64> {
    let mut reader = open_wav(path, expected_rate)?;
    let pacer = Pacer::new(reader.spec().sample_rate, pace);
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("corrupt PCM data in {}", path.display()))?;
    send_samples(out, samples, &pacer)
}

/// Sends the file byte for byte, header included; the server strips it.
fn send_wav_file<W: Write>(out: &mut W, path: &Path, expected_rate: u32, pace: bool) -> Result<u64> {
    let rate = open_wav(path, expected_rate)?.spec().sample_rate;
    let bytes = std::fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
    let pacer = Pacer::new(rate, pace);
    let mut sent = 0u64;
    for chunk in bytes.chunks(BLOCK_SAMPLES * 2) {
        pacer.wait(sent.saturating_sub(WAV_HEADER_LEN as u64) / 2);
        out.write_all(chunk).context("server connection finished")?;
        sent += chunk.len() as u64;
    }
    out.flush().context("server connection finished")?;
    Ok(sent)
}
