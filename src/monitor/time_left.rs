//! Remaining-time projection and its human-readable rendering.

use std::fmt;

use serde::{Serialize, Serializer};

/// Hours/minutes/seconds left until the node reaches the network height.
///
/// `hours` wraps at 3600, matching the decomposition the wallet has always
/// shown. A value whose components are all zero renders as `"∞"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeLeft {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeLeft {
    /// Decompose a whole number of seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            hours: (secs / 3600) % 3600,
            minutes: (secs / 60) % 60,
            seconds: secs % 60,
        }
    }

    /// Project the time needed to cover `remaining_blocks` when the last
    /// `block_diff` blocks took `time_diff_ms` milliseconds.
    ///
    /// Returns `None` when `block_diff` is not positive: no progress, no estimate.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn project(remaining_blocks: u64, block_diff: i64, time_diff_ms: i64) -> Option<Self> {
        if block_diff <= 0 {
            return None;
        }
        let secs = (remaining_blocks as f64 / block_diff as f64 * time_diff_ms as f64 / 1000.0)
            .floor();
        if !secs.is_finite() || secs <= 0.0 {
            return Some(Self::default());
        }
        Some(Self::from_secs(secs as u64))
    }

    /// Project from a smoothed rate in blocks per second.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_projection(seconds_to_tip: f64) -> Option<Self> {
        if !seconds_to_tip.is_finite() || seconds_to_tip < 0.0 {
            return None;
        }
        Some(Self::from_secs(seconds_to_tip.floor() as u64))
    }

    /// True when every component is zero (rendered as infinity).
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("∞");
        }
        let parts: Vec<String> = [
            (self.hours, "hour", "hours"),
            (self.minutes, "minute", "minutes"),
            (self.seconds, "second", "seconds"),
        ]
        .into_iter()
        .filter(|(value, _, _)| *value > 0)
        .map(|(value, one, many)| format!("{value} {}", if value > 1 { many } else { one }))
        .collect();
        f.write_str(&parts.join(" "))
    }
}

impl Serialize for TimeLeft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
