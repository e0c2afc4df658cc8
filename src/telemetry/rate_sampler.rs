//! Derivation of bounded utilization rates from cumulative counters.

use std::num::NonZeroU32;

/// One reading of a cumulative counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationSample {
    /// Reading time in milliseconds on a monotonic clock.
    pub timestamp_ms: u64,
    /// Raw counter value. Non-decreasing until the source restarts.
    pub cumulative_value: f64,
    /// Multiplier that converts the raw value into seconds (1.0 when already in seconds).
    pub scale_factor: f64,
}

impl UtilizationSample {
    pub fn new(timestamp_ms: u64, cumulative_value: f64) -> Self {
        Self {
            timestamp_ms,
            cumulative_value,
            scale_factor: 1.0,
        }
    }

    pub fn with_scale(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    fn scaled(&self) -> f64 {
        self.cumulative_value * self.scale_factor
    }
}

/// A utilization percentage, always finite and within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct UtilizationRate {
    percent: f64,
}

impl UtilizationRate {
    pub const ZERO: UtilizationRate = UtilizationRate { percent: 0.0 };

    /// Clamps `percent` into range; NaN becomes 0.
    pub fn new(percent: f64) -> Self {
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        Self { percent }
    }

    /// `used / total * 100`, with `total == 0` yielding 0.
    pub fn from_ratio(used: f64, total: f64) -> Self {
        if total <= 0.0 || !total.is_finite() {
            return Self::ZERO;
        }
        Self::new(used / total * 100.0)
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }
}

/// Turns successive cumulative counter samples into an instantaneous rate.
///
/// The sampler keeps only its last baseline, which is replaced on every call.
#[derive(Debug, Clone, Default)]
pub struct RateSampler {
    baseline: Option<UtilizationSample>,
    last_rate: UtilizationRate,
}

impl RateSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `sample` and returns the rate over the interval since the previous one,
    /// normalized by `unit_count` (e.g. the number of vCPUs).
    ///
    /// - first sample, `dt <= 0`, or non-finite values: the previous rate is kept
    /// - counter went backwards (restart): the rate is 0
    pub fn sample(&mut self, sample: UtilizationSample, unit_count: NonZeroU32) -> UtilizationRate {
        let previous = self.baseline.replace(sample);
        let Some(previous) = previous else {
            return self.last_rate;
        };

        if sample.timestamp_ms <= previous.timestamp_ms {
            return self.last_rate;
        }

        let dt = (sample.timestamp_ms - previous.timestamp_ms) as f64 / 1000.0;
        let dc = sample.scaled() - previous.scaled();
        if !dc.is_finite() {
            return self.last_rate;
        }

        let rate = if dc < 0.0 {
            UtilizationRate::ZERO
        } else {
            UtilizationRate::new((dc / dt) * 100.0 / f64::from(unit_count.get()))
        };
        self.last_rate = rate;
        rate
    }

    /// The most recent valid rate.
    pub fn last_rate(&self) -> UtilizationRate {
        self.last_rate
    }

    /// Forgets the baseline, e.g. after the observed VM changed.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.last_rate = UtilizationRate::ZERO;
    }
}

/// Maps a backend-reported unit count onto the non-zero divisor the sampler needs.
pub fn unit_count(count: u32) -> NonZeroU32 {
    NonZeroU32::new(count).unwrap_or(NonZeroU32::MIN)
}
