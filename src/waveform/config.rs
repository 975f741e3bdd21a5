use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::waveform::paginator::PageMode;
use crate::waveform::reducer::ReductionPolicy;
use crate::waveform::ScopeError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_WINDOW_SECS: f64 = 0.07;
pub const DEFAULT_DISPLAY_WIDTH: usize = 150;
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_PLAYBACK_QUEUE: usize = 32;

/// Vertical axis of the display, in raw sample units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmplitudeRange {
    pub min: i32,
    pub max: i32,
}

impl Default for AmplitudeRange {
    fn default() -> Self {
        Self {
            min: i16::MIN as i32,
            max: -(i16::MIN as i32),
        }
    }
}

/// User-facing stream configuration. Missing JSON fields fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub window_duration_secs: f64,
    pub display_width_points: usize,
    pub amplitude_range: [i32; 2],
    /// Bytes read from the socket per pump iteration.
    pub chunk_size: usize,
    /// Chunks the playback worker may queue before the pump waits on it.
    pub playback_queue_chunks: usize,
    pub skip_wav_header: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let range = AmplitudeRange::default();
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            window_duration_secs: DEFAULT_WINDOW_SECS,
            display_width_points: DEFAULT_DISPLAY_WIDTH,
            amplitude_range: [range.min, range.max],
            chunk_size: DEFAULT_CHUNK_SIZE,
            playback_queue_chunks: DEFAULT_PLAYBACK_QUEUE,
            skip_wav_header: true,
        }
    }
}

impl StreamConfig {
    pub fn load(path: &Path) -> Result<Self, ScopeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScopeError::Config(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks every field and derives the per-session settings.
    pub fn validate(&self) -> Result<StreamSettings, ScopeError> {
        if self.sample_rate == 0 {
            return Err(ScopeError::InvalidSampleRate);
        }
        if self.display_width_points == 0 {
            return Err(ScopeError::InvalidDisplayWidth);
        }
        let window_secs = self.window_duration_secs;
        let policy = ReductionPolicy::for_window(window_secs)?;
        let samples_per_point = samples_per_point(self.sample_rate, window_secs, self.display_width_points);
        if samples_per_point == 0 {
            return Err(ScopeError::InvalidWindowDuration(window_secs));
        }
        let [min, max] = self.amplitude_range;
        if min >= max {
            return Err(ScopeError::InvalidAmplitudeRange { min, max });
        }
        if self.chunk_size == 0 || self.playback_queue_chunks == 0 {
            return Err(ScopeError::InvalidChunkSize);
        }
        Ok(StreamSettings {
            sample_rate: self.sample_rate,
            window_secs,
            points_per_page: self.display_width_points,
            samples_per_point,
            policy,
            page_mode: PageMode::for_window(window_secs),
            amplitude: AmplitudeRange { min, max },
            chunk_size: self.chunk_size,
            playback_queue_chunks: self.playback_queue_chunks,
            skip_wav_header: self.skip_wav_header,
        })
    }
}

/// Whole samples that fit in one display slot. Fractional samples are truncated,
/// so 44100 Hz over 0.07 s at 150 points gives 20.
fn samples_per_point(sample_rate: u32, window_secs: f64, width: usize) -> usize {
    let exact = sample_rate as f64 * window_secs / width as f64;
    if !exact.is_finite() || exact < 1.0 - 1e-9 {
        return 0;
    }
    (exact + 1e-9).floor() as usize
}

/// Validated settings shared by every component of one session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamSettings {
    pub sample_rate: u32,
    pub window_secs: f64,
    pub points_per_page: usize,
    pub samples_per_point: usize,
    pub policy: ReductionPolicy,
    pub page_mode: PageMode,
    pub amplitude: AmplitudeRange,
    pub chunk_size: usize,
    pub playback_queue_chunks: usize,
    pub skip_wav_header: bool,
}

impl StreamSettings {
    /// Seconds between two consecutive display points.
    pub fn time_step(&self) -> f64 {
        self.window_secs / self.points_per_page as f64
    }
}
