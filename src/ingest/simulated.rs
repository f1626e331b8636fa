//! Simulated chain for demos and soak tests.
//!
//! The network tip grows by at most one block per tick; the local node
//! catches up by a random number of blocks per tick and never passes the tip.
//! Time is virtual: each poll advances a private clock by `tick`, so the rate
//! and ETA math behaves the same whether the poller sleeps or not.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::errors::{Result, StatusError};
use crate::ingest::{HeightEvent, HeightSource};
use crate::monitor::sync_tracker::HeightSample;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedChainConfig {
    pub start_height: i64,
    pub network_height: i64,
    /// Inclusive range of blocks the node imports per tick.
    pub catch_up: (u32, u32),
    /// Chance per tick that the network produces a block.
    pub network_block_probability: f64,
    pub tick: Duration,
    /// Stop after this many ticks (`None` runs forever).
    pub max_ticks: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for SimulatedChainConfig {
    fn default() -> Self {
        Self {
            start_height: 0,
            network_height: 2_000,
            catch_up: (20, 60),
            network_block_probability: 0.1,
            tick: Duration::seconds(1),
            max_ticks: None,
            seed: None,
        }
    }
}

#[derive(Debug)]
pub struct SimulatedChain {
    config: SimulatedChainConfig,
    rng: StdRng,
    internal: i64,
    network: i64,
    clock: DateTime<Utc>,
    ticks: u64,
    announced_network: Option<i64>,
}

impl SimulatedChain {
    pub fn new(config: SimulatedChainConfig, start: DateTime<Utc>) -> Result<Self> {
        let (lo, hi) = config.catch_up;
        if lo > hi {
            return Err(StatusError::InvalidConfig {
                details: format!("simulated catch_up range {lo}..={hi} is empty"),
            });
        }
        if !(0.0..=1.0).contains(&config.network_block_probability) {
            return Err(StatusError::InvalidConfig {
                details: format!(
                    "simulated network_block_probability {} outside [0, 1]",
                    config.network_block_probability
                ),
            });
        }
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(Self {
            internal: config.start_height,
            network: config.network_height.max(config.start_height),
            rng,
            clock: start,
            ticks: 0,
            announced_network: None,
            config,
        })
    }

    #[must_use]
    pub const fn heights(&self) -> (i64, i64) {
        (self.internal, self.network)
    }

    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl HeightSource for SimulatedChain {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn poll(&mut self) -> Result<Vec<HeightEvent>> {
        if self.is_exhausted() {
            return Ok(Vec::new());
        }

        let mut events = Vec::with_capacity(2);
        if self.ticks > 0 {
            if self.rng.random_bool(self.config.network_block_probability) {
                self.network += 1;
            }
            let (lo, hi) = self.config.catch_up;
            let step = i64::from(self.rng.random_range(lo..=hi));
            self.internal = (self.internal + step).min(self.network);
            self.clock += self.config.tick;
        }
        if self.announced_network != Some(self.network) {
            self.announced_network = Some(self.network);
            events.push(HeightEvent::Network(self.network));
        }
        events.push(HeightEvent::Internal(HeightSample::new(self.internal, self.clock)));
        self.ticks += 1;
        Ok(events)
    }

    fn is_exhausted(&self) -> bool {
        self.config.max_ticks.is_some_and(|max| self.ticks >= max)
    }
}
