//! Drive a simulated node through a full catch-up and watch the status layer
//! react: the syncing dialog opens by itself, progress is forwarded into it,
//! and a subscriber on another thread receives every published state.
//!
//! ```text
//! cargo run --example sync_session
//! ```

use std::thread;

use chrono::Utc;
use wallet_sync_status::ingest::simulated::{SimulatedChain, SimulatedChainConfig};
use wallet_sync_status::prelude::*;
use wallet_sync_status::ui::render::render_frame;
use wallet_sync_status::ui::update::update;

fn main() -> Result<()> {
    let config = Config::default();
    let mut model = StatusModel::new(&config);

    let subscription = model.tracker.subscribe();
    let watcher = thread::spawn(move || {
        let mut last = None;
        while let Ok(state) = subscription.receiver().recv() {
            last = Some(state);
        }
        last
    });

    let mut chain = SimulatedChain::new(
        SimulatedChainConfig {
            network_height: 1_200,
            max_ticks: Some(60),
            seed: Some(2026),
            ..SimulatedChainConfig::default()
        },
        Utc::now(),
    )?;

    while !chain.is_exhausted() {
        let events = chain.poll()?;
        update(&mut model, StatusMsg::Heights(events));
        if model.tracker.state().samples % 10 == 0 {
            for line in render_frame(&model) {
                println!("{line}");
            }
        }
    }

    if model.modal.is_active() {
        update(&mut model, StatusMsg::Close);
    }
    let final_state = model.tracker.current_state();
    drop(model);

    let seen = watcher.join().ok().flatten();
    println!(
        "done: {} samples, subscriber last saw height {}",
        final_state.samples,
        seen.map_or(-1, |s| s.internal_height)
    );
    Ok(())
}
