use crate::waveform::ScopeError;

pub const MIN_WINDOW_SECS: f64 = 0.05;
const AVERAGE_BLEND_SECS: f64 = 0.1;
const LATEST_VALUE_SECS: f64 = 0.5;

/// How the samples of one display slot collapse into a single amplitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReductionPolicy {
    /// Integer mean of the slot.
    AverageOnly,
    /// Midpoint between the mean and the newest sample.
    AverageBlend,
    /// Newest sample only.
    LatestValue,
}

impl ReductionPolicy {
    /// Windows shorter than 50 ms have no policy.
    pub fn for_window(window_secs: f64) -> Result<Self, ScopeError> {
        if window_secs >= LATEST_VALUE_SECS {
            Ok(Self::LatestValue)
        } else if window_secs >= AVERAGE_BLEND_SECS {
            Ok(Self::AverageBlend)
        } else if window_secs >= MIN_WINDOW_SECS {
            Ok(Self::AverageOnly)
        } else {
            Err(ScopeError::InvalidWindowDuration(window_secs))
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AverageOnly => "average",
            Self::AverageBlend => "average + latest",
            Self::LatestValue => "latest",
        }
    }
}

#[derive(Debug, Default)]
struct ReductionWindow {
    sum: i64,
    count: usize,
    last: i16,
}

/// Folds the sample stream into one amplitude every `samples_per_point` samples.
#[derive(Debug)]
pub struct WindowReducer {
    policy: ReductionPolicy,
    samples_per_point: usize,
    window: ReductionWindow,
}

impl WindowReducer {
    pub fn new(policy: ReductionPolicy, samples_per_point: usize) -> Result<Self, ScopeError> {
        if samples_per_point == 0 {
            return Err(ScopeError::InvalidWindowDuration(0.0));
        }
        Ok(Self {
            policy,
            samples_per_point,
            window: ReductionWindow::default(),
        })
    }

    pub fn policy(&self) -> ReductionPolicy {
        self.policy
    }

    pub fn samples_per_point(&self) -> usize {
        self.samples_per_point
    }

    /// Samples accumulated toward the next point.
    pub fn pending(&self) -> usize {
        self.window.count
    }

    pub fn push(&mut self, sample: i16) -> Option<i32> {
        let window = &mut self.window;
        window.sum += sample as i64;
        window.count += 1;
        window.last = sample;
        if window.count < self.samples_per_point {
            return None;
        }
        // i64 division truncates toward zero; the mean always fits in i16.
        let mean = (window.sum / window.count as i64) as i32;
        let latest = window.last as i32;
        let amplitude = match self.policy {
            ReductionPolicy::AverageOnly => mean,
            ReductionPolicy::AverageBlend => (mean + latest) / 2,
            ReductionPolicy::LatestValue => latest,
        };
        self.reset();
        Some(amplitude)
    }

    /// Drops a partially filled slot.
    pub fn reset(&mut self) {
        self.window = ReductionWindow::default();
    }
}
