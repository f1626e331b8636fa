//! EWMA block-rate estimator: sync velocity, acceleration, smoothed time-to-tip.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Trend classification for sync velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTrend {
    /// Not enough timed samples yet.
    #[default]
    Unknown,
    Stable,
    Accelerating,
    Decelerating,
    /// Local height is not advancing (or regressing).
    Stalled,
}

/// Output of the EWMA estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimate {
    pub blocks_per_second: f64,
    pub acceleration: f64,
    pub seconds_to_tip: f64,
    pub confidence: f64,
    pub trend: RateTrend,
    pub alpha_used: f64,
    pub fallback_active: bool,
}

#[derive(Debug, Clone, Copy)]
struct SampleState {
    height: i64,
    at: DateTime<Utc>,
    inst_rate: f64,
}

/// Online EWMA estimator with adaptive alpha and fallback signaling.
///
/// Raw two-point rates jump around between blocks; this keeps a smoothed
/// blocks-per-second figure whose alpha grows with burstiness so genuine speed
/// changes still propagate quickly.
#[derive(Debug, Clone)]
pub struct BlockRateEstimator {
    base_alpha: f64,
    min_alpha: f64,
    max_alpha: f64,
    ewma_rate: f64,
    ewma_accel: f64,
    residual_ewma: f64,
    min_samples: u64,
    samples: u64,
    last: Option<SampleState>,
}

impl BlockRateEstimator {
    #[must_use]
    pub fn new(base_alpha: f64, min_alpha: f64, max_alpha: f64, min_samples: u64) -> Self {
        Self {
            base_alpha,
            min_alpha,
            max_alpha,
            ewma_rate: 0.0,
            ewma_accel: 0.0,
            residual_ewma: 0.0,
            min_samples,
            samples: 0,
            last: None,
        }
    }

    /// Update estimator state with a new internal height sample.
    ///
    /// `remaining_blocks` is the current distance to the network height.
    pub fn update(
        &mut self,
        height: i64,
        observed_at: DateTime<Utc>,
        remaining_blocks: u64,
    ) -> RateEstimate {
        let Some(previous) = self.last else {
            self.last = Some(SampleState {
                height,
                at: observed_at,
                inst_rate: 0.0,
            });
            return self.fallback_estimate(remaining_blocks);
        };

        let dt = (observed_at - previous.at).num_milliseconds() as f64 / 1000.0;
        if dt <= f64::EPSILON {
            return self.fallback_estimate(remaining_blocks);
        }

        let advanced = height.saturating_sub(previous.height) as f64;
        let inst_rate = advanced / dt;
        let burstiness = ((inst_rate - self.ewma_rate).abs()) / (self.ewma_rate.abs() + 1.0);
        let alpha = (self.base_alpha + 0.20 * burstiness).clamp(self.min_alpha, self.max_alpha);

        self.ewma_rate = ewma(alpha, self.ewma_rate, inst_rate);
        let inst_accel = (inst_rate - previous.inst_rate) / dt;
        self.ewma_accel = ewma(alpha, self.ewma_accel, inst_accel);
        self.residual_ewma = ewma(
            alpha,
            self.residual_ewma,
            (inst_rate - self.ewma_rate).abs(),
        );

        self.samples = self.samples.saturating_add(1);
        self.last = Some(SampleState {
            height,
            at: observed_at,
            inst_rate,
        });

        let confidence = self.compute_confidence();
        RateEstimate {
            blocks_per_second: self.ewma_rate,
            acceleration: self.ewma_accel,
            seconds_to_tip: project_time(self.ewma_rate, remaining_blocks as f64),
            confidence,
            trend: classify_trend(self.ewma_rate, self.ewma_accel),
            alpha_used: alpha,
            fallback_active: self.samples < self.min_samples || confidence < 0.2,
        }
    }

    fn compute_confidence(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        let sample_term = (self.samples as f64 / self.min_samples.max(1) as f64).min(1.0);
        let residual_term = 1.0 / (1.0 + self.residual_ewma / (self.ewma_rate.abs() + 1.0));
        (0.7 * sample_term + 0.3 * residual_term).clamp(0.0, 1.0)
    }

    fn fallback_estimate(&self, remaining_blocks: u64) -> RateEstimate {
        RateEstimate {
            blocks_per_second: self.ewma_rate,
            acceleration: self.ewma_accel,
            seconds_to_tip: project_time(self.ewma_rate, remaining_blocks as f64),
            confidence: self.compute_confidence(),
            trend: if self.samples == 0 {
                RateTrend::Unknown
            } else {
                classify_trend(self.ewma_rate, self.ewma_accel)
            },
            alpha_used: self.base_alpha,
            fallback_active: true,
        }
    }
}

#[inline]
fn ewma(alpha: f64, prev: f64, current: f64) -> f64 {
    alpha * current + (1.0 - alpha) * prev
}

fn classify_trend(rate: f64, accel: f64) -> RateTrend {
    if rate <= 1e-9 {
        return RateTrend::Stalled;
    }
    // Acceleration is judged relative to current speed so slow and fast
    // chains classify alike.
    let relative = accel / rate;
    if relative > 0.05 {
        RateTrend::Accelerating
    } else if relative < -0.05 {
        RateTrend::Decelerating
    } else {
        RateTrend::Stable
    }
}

fn project_time(rate: f64, distance_blocks: f64) -> f64 {
    if distance_blocks <= 0.0 {
        return 0.0;
    }
    if rate <= 0.0 {
        return f64::INFINITY;
    }
    distance_blocks / rate
}
