//! Chain-height tracker: derives sync progress, pace, and ETA from height
//! samples and decides when the syncing dialog should open on its own.
//!
//! Derived metrics are computed against the height that was current *before*
//! the incoming sample is stored, so the reported percentage lags one sample
//! behind the newest internal height. The rate and ETA use the new sample as
//! the "after" point.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::{Config, RateConfig, SyncConfig};
use crate::modal::content::DialogKind;
use crate::modal::orchestrator::{ModalRequest, SessionProbe};
use crate::monitor::broadcast::{Broadcast, Subscription, SubscriptionId};
use crate::monitor::ewma::{BlockRateEstimator, RateTrend};
use crate::monitor::time_left::TimeLeft;

/// Sentinel for a height or remainder that has not been observed yet.
pub const UNKNOWN: i64 = -1;

/// One observation of the local node's chain height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightSample {
    pub height: i64,
    pub observed_at: DateTime<Utc>,
}

impl HeightSample {
    #[must_use]
    pub const fn new(height: i64, observed_at: DateTime<Utc>) -> Self {
        Self {
            height,
            observed_at,
        }
    }

    /// Sample stamped with the current wall clock.
    #[must_use]
    pub fn now(height: i64) -> Self {
        Self::new(height, Utc::now())
    }
}

/// Snapshot published to subscribers after every internal sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    pub internal_height: i64,
    pub network_height: i64,
    pub starting_height: i64,
    pub total_remainder: i64,
    pub percentage: f64,
    pub remaining_blocks: u64,
    pub increase_per_minute: f64,
    pub estimated_time_left: Option<TimeLeft>,
    pub last_sample_at: Option<DateTime<Utc>>,
    pub manually_opened: bool,
    pub blocks_per_second: f64,
    pub rate_trend: RateTrend,
    pub rate_confidence: f64,
    pub smoothed_time_left: Option<TimeLeft>,
    pub samples: u64,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            internal_height: UNKNOWN,
            network_height: UNKNOWN,
            starting_height: UNKNOWN,
            total_remainder: UNKNOWN,
            percentage: 0.0,
            remaining_blocks: 0,
            increase_per_minute: 0.0,
            estimated_time_left: None,
            last_sample_at: None,
            manually_opened: false,
            blocks_per_second: 0.0,
            rate_trend: RateTrend::Unknown,
            rate_confidence: 0.0,
            smoothed_time_left: None,
            samples: 0,
        }
    }
}

impl SyncState {
    /// Both heights have been observed.
    #[must_use]
    pub const fn heights_known(&self) -> bool {
        self.internal_height >= 0 && self.network_height >= 0
    }

    /// Blocks between the node and the network, if both are known.
    #[must_use]
    pub const fn gap(&self) -> Option<i64> {
        if self.heights_known() {
            Some(self.network_height.saturating_sub(self.internal_height))
        } else {
            None
        }
    }
}

/// Subscription handle for state snapshots.
pub type StateSubscription = Subscription<SyncState>;

/// Why an otherwise due auto-open was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// Some dialog already occupies the slot.
    DialogActive,
    /// The user opened the syncing view themselves.
    ManuallyOpened,
    /// The user dismissed the syncing dialog since the last healthy sample.
    Dismissed,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::DialogActive => "dialog_active",
            Self::ManuallyOpened => "manually_opened",
            Self::Dismissed => "dismissed",
        })
    }
}

/// Auto-open verdict for one internal sample.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoOpen {
    /// Node is close enough to the tip.
    NotNeeded,
    Request(ModalRequest),
    Suppressed(SuppressReason),
}

impl AutoOpen {
    #[must_use]
    pub fn into_request(self) -> Option<ModalRequest> {
        match self {
            Self::Request(request) => Some(request),
            Self::NotNeeded | Self::Suppressed(_) => None,
        }
    }
}

/// Owns [`SyncState`] and the auto-open policy. Mutated only from the
/// control thread; other threads observe it through [`Self::subscribe`].
#[derive(Debug)]
pub struct SyncTracker {
    config: SyncConfig,
    state: SyncState,
    estimator: BlockRateEstimator,
    broadcast: Broadcast<SyncState>,
    armed: bool,
    /// `total_remainder` is frozen once set, even if it equals the sentinel.
    remainder_fixed: bool,
}

impl SyncTracker {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_parts(config.sync.clone(), &config.rate)
    }

    #[must_use]
    pub fn with_parts(sync: SyncConfig, rate: &RateConfig) -> Self {
        Self {
            config: sync,
            state: SyncState::default(),
            estimator: BlockRateEstimator::new(
                rate.base_alpha,
                rate.min_alpha,
                rate.max_alpha,
                rate.min_samples,
            ),
            broadcast: Broadcast::new(),
            armed: true,
            remainder_fixed: false,
        }
    }

    /// Ingest the local node height. Returns the auto-open request, if due.
    pub fn on_internal_sample(
        &mut self,
        sample: HeightSample,
        probe: &impl SessionProbe,
    ) -> Option<ModalRequest> {
        self.ingest_internal(sample, probe).into_request()
    }

    /// Like [`Self::on_internal_sample`] but reports why an auto-open was
    /// withheld.
    pub fn ingest_internal(&mut self, sample: HeightSample, probe: &impl SessionProbe) -> AutoOpen {
        if self.state.starting_height == UNKNOWN {
            self.state.starting_height = sample.height;
            self.fix_total_remainder();
        }

        self.recompute(sample);
        let verdict = self.auto_open_verdict(probe);

        self.state.internal_height = sample.height;
        self.state.last_sample_at = Some(sample.observed_at);
        self.state.samples = self.state.samples.saturating_add(1);

        self.broadcast.publish(&self.state);
        verdict
    }

    /// Ingest the network tip height. Does not publish.
    pub fn on_network_sample(&mut self, height: i64) {
        self.state.network_height = height;
        if self.state.starting_height != UNKNOWN {
            self.fix_total_remainder();
        }
    }

    /// Record that the user opened the syncing view explicitly.
    pub fn mark_manually_opened(&mut self) {
        self.state.manually_opened = true;
    }

    /// Record a user dismissal. Only the syncing dialog affects the trigger.
    pub fn note_dialog_dismissed(&mut self, kind: &DialogKind) {
        if *kind == DialogKind::SYNCING && self.config.suppress_after_dismiss {
            self.armed = false;
        }
    }

    /// Whether auto-open is currently armed (not disarmed by a dismissal).
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub fn current_state(&self) -> SyncState {
        self.state.clone()
    }

    #[must_use]
    pub const fn state(&self) -> &SyncState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribe(&self) -> StateSubscription {
        self.broadcast.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.broadcast.unsubscribe(id)
    }

    fn fix_total_remainder(&mut self) {
        if !self.remainder_fixed
            && self.state.network_height != UNKNOWN
            && self.state.starting_height != UNKNOWN
        {
            self.state.total_remainder = self
                .state
                .network_height
                .saturating_sub(self.state.starting_height);
            self.remainder_fixed = true;
        }
    }

    fn recompute(&mut self, sample: HeightSample) {
        let internal_old = self.state.internal_height;
        let network = self.state.network_height;

        let smoothed = self.estimator.update(
            sample.height,
            sample.observed_at,
            if network >= 0 {
                remaining(network, sample.height)
            } else {
                0
            },
        );
        self.state.blocks_per_second = smoothed.blocks_per_second;
        self.state.rate_trend = smoothed.trend;
        self.state.rate_confidence = smoothed.confidence;

        if internal_old < 0 || network < 0 {
            self.state.percentage = 0.0;
            self.state.smoothed_time_left = None;
            return;
        }

        self.state.smoothed_time_left = TimeLeft::from_projection(smoothed.seconds_to_tip);
        self.state.remaining_blocks = remaining(network, internal_old);
        self.state.percentage = if network <= 0 || internal_old <= 0 {
            0.0
        } else {
            (internal_old as f64 / network as f64 * 100.0).min(100.0)
        };

        let Some(last_at) = self.state.last_sample_at else {
            return;
        };
        let time_diff_ms = (sample.observed_at - last_at).num_milliseconds();
        let block_diff = sample.height.saturating_sub(internal_old);

        let total = self.state.total_remainder;
        if time_diff_ms > 0 && total != UNKNOWN && total != 0 {
            let rate = block_diff as f64 / total as f64
                * 100.0
                * (60_000.0 / time_diff_ms as f64);
            self.state.increase_per_minute = round2(rate.clamp(0.0, 100.0));
        }

        if let Some(eta) = TimeLeft::project(self.state.remaining_blocks, block_diff, time_diff_ms) {
            self.state.estimated_time_left = Some(eta);
        }
    }

    fn auto_open_verdict(&mut self, probe: &impl SessionProbe) -> AutoOpen {
        let internal_old = self.state.internal_height;
        let network = self.state.network_height;
        let behind = network <= 0
            || internal_old <= 0
            || network.saturating_sub(internal_old) > self.config.auto_open_gap_blocks;

        if !behind {
            self.armed = true;
            self.state.manually_opened = false;
            return AutoOpen::NotNeeded;
        }
        if probe.is_active() {
            return AutoOpen::Suppressed(SuppressReason::DialogActive);
        }
        if self.state.manually_opened {
            return AutoOpen::Suppressed(SuppressReason::ManuallyOpened);
        }
        if !self.armed {
            return AutoOpen::Suppressed(SuppressReason::Dismissed);
        }
        AutoOpen::Request(ModalRequest::new(DialogKind::SYNCING))
    }
}

#[allow(clippy::cast_sign_loss)]
const fn remaining(network: i64, internal: i64) -> u64 {
    let gap = network.saturating_sub(internal);
    if gap > 0 { gap as u64 } else { 0 }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
