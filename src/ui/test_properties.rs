//! Property-based tests for tracker and orchestrator invariants.
//!
//! Arbitrary interleavings of height samples, opens, closes and policy
//! toggles must keep the derived metrics in range and the dialog slot single.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use super::model::{StatusModel, StatusMsg};
use super::update::update;
use crate::core::config::Config;
use crate::ingest::HeightEvent;
use crate::modal::content::{DialogCapabilities, DialogContent, DialogKind, DialogRegistry};
use crate::modal::orchestrator::{
    CloseOutcome, FixedProbe, ModalOrchestrator, ModalPolicy, ModalRequest, SessionProbe,
    format_progress,
};
use crate::monitor::sync_tracker::{HeightSample, SyncTracker, UNKNOWN};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
}

// ──────────────────── strategies ────────────────────

#[derive(Debug, Clone)]
enum Step {
    Internal { height: i64, after_ms: i64 },
    Network(i64),
    Open(usize, Option<bool>),
    OpenSyncing,
    Cancel,
    Close,
    EnableClose(bool),
}

const KINDS: [DialogKind; 6] = [
    DialogKind::SYNCING,
    DialogKind::CREATE_WALLET,
    DialogKind::ENCRYPT_WALLET,
    DialogKind::UNLOCK_WALLET,
    DialogKind::COLD_STAKE,
    DialogKind::DAEMON,
];

fn arb_height() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0_i64), Just(UNKNOWN), 1_i64..5_000]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (arb_height(), 0_i64..120_000)
            .prop_map(|(height, after_ms)| Step::Internal { height, after_ms }),
        2 => arb_height().prop_map(Step::Network),
        1 => (0..KINDS.len(), proptest::option::of(any::<bool>()))
            .prop_map(|(k, c)| Step::Open(k, c)),
        1 => Just(Step::OpenSyncing),
        1 => Just(Step::Cancel),
        1 => Just(Step::Close),
        1 => any::<bool>().prop_map(Step::EnableClose),
    ]
}

fn to_msg(step: &Step, clock: &mut DateTime<Utc>) -> StatusMsg {
    match *step {
        Step::Internal { height, after_ms } => {
            *clock += Duration::milliseconds(after_ms);
            StatusMsg::Heights(vec![HeightEvent::Internal(HeightSample::new(height, *clock))])
        }
        Step::Network(height) => StatusMsg::Heights(vec![HeightEvent::Network(height)]),
        Step::Open(k, closable) => {
            let mut request = ModalRequest::forced(KINDS[k].clone());
            request.closable = closable;
            StatusMsg::UserOpen(request)
        }
        Step::OpenSyncing => StatusMsg::OpenSyncing,
        Step::Cancel => StatusMsg::Cancel,
        Step::Close => StatusMsg::Close,
        Step::EnableClose(enabled) => StatusMsg::SetEnableClose(enabled),
    }
}

// ──────────────────── slot-counting dialog ────────────────────

struct Counted {
    kind: DialogKind,
    live: Rc<Cell<i64>>,
}

impl DialogContent for Counted {
    fn kind(&self) -> &DialogKind {
        &self.kind
    }

    fn teardown(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

/// Registry whose factories record the peak number of live instances.
fn counting_registry(live: &Rc<Cell<i64>>, peak: &Rc<Cell<i64>>) -> DialogRegistry {
    let mut registry = DialogRegistry::new();
    for kind in KINDS {
        let caps = if kind == DialogKind::DAEMON {
            DialogCapabilities::PLAIN.closable(false)
        } else {
            DialogCapabilities::WITH_DATA
        };
        let (live, peak, k) = (Rc::clone(live), Rc::clone(peak), kind.clone());
        registry.register(kind, caps, move || {
            live.set(live.get() + 1);
            peak.set(peak.get().max(live.get()));
            Box::new(Counted {
                kind: k.clone(),
                live: Rc::clone(&live),
            })
        });
    }
    registry
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn percentage_stays_in_range(steps in prop::collection::vec(arb_step(), 1..60)) {
        let mut model = StatusModel::new(&Config::default());
        let mut clock = t0();
        for step in &steps {
            update(&mut model, to_msg(step, &mut clock));
            let state = model.tracker.state();
            prop_assert!((0.0..=100.0).contains(&state.percentage), "{}", state.percentage);
            prop_assert!((0.0..=100.0).contains(&state.increase_per_minute));
        }
    }

    #[test]
    fn percentage_rises_with_internal_height(
        network in 1_i64..100_000,
        start in 1_i64..1_000,
        steps in prop::collection::vec(0_i64..500, 1..40),
    ) {
        let mut tracker = SyncTracker::new(&Config::default());
        tracker.on_network_sample(network);
        let mut clock = t0();
        let mut height = start;
        tracker.ingest_internal(HeightSample::new(height, clock), &FixedProbe(true));
        let mut last_pct = tracker.state().percentage;
        for step in steps {
            height += step;
            clock += Duration::seconds(30);
            tracker.ingest_internal(HeightSample::new(height, clock), &FixedProbe(true));
            let pct = tracker.state().percentage;
            prop_assert!(pct >= last_pct, "{} fell to {}", last_pct, pct);
            prop_assert!(pct <= 100.0);
            last_pct = pct;
        }
    }

    #[test]
    fn zero_height_means_unsynced(
        other in 1_i64..10_000,
        next in 1_i64..10_000,
        zero_network in any::<bool>(),
    ) {
        let (network, internal) = if zero_network { (0, other) } else { (other, 0) };
        let mut tracker = SyncTracker::new(&Config::default());
        tracker.on_network_sample(network);
        tracker.ingest_internal(HeightSample::new(internal, t0()), &FixedProbe(true));
        let request = tracker.on_internal_sample(
            HeightSample::new(next, t0() + Duration::seconds(10)),
            &FixedProbe(false),
        );
        prop_assert!(tracker.state().percentage.abs() < f64::EPSILON);
        prop_assert_eq!(request, Some(ModalRequest::new(DialogKind::SYNCING)));
    }

    #[test]
    fn remaining_blocks_uses_previous_height(
        network in 1_i64..10_000,
        heights in prop::collection::vec(1_i64..10_000, 2..30),
    ) {
        let mut tracker = SyncTracker::new(&Config::default());
        tracker.on_network_sample(network);
        let mut clock = t0();
        for h in heights {
            let old = tracker.state().internal_height;
            clock += Duration::seconds(10);
            tracker.ingest_internal(HeightSample::new(h, clock), &FixedProbe(true));
            if old >= 0 {
                let expected = u64::try_from((network - old).max(0)).unwrap();
                prop_assert_eq!(tracker.state().remaining_blocks, expected);
            }
        }
    }

    #[test]
    fn total_remainder_is_written_once(steps in prop::collection::vec(arb_step(), 1..60)) {
        let mut model = StatusModel::new(&Config::default());
        let mut clock = t0();
        let mut fixed: Option<i64> = None;
        for step in &steps {
            update(&mut model, to_msg(step, &mut clock));
            let total = model.tracker.state().total_remainder;
            match fixed {
                Some(value) => prop_assert_eq!(total, value),
                None if total != UNKNOWN => fixed = Some(total),
                None => {}
            }
        }
    }

    #[test]
    fn at_most_one_dialog_is_ever_live(steps in prop::collection::vec(arb_step(), 1..80)) {
        let live = Rc::new(Cell::new(0_i64));
        let peak = Rc::new(Cell::new(0_i64));
        let mut model = StatusModel::with_registry(
            &Config::default(),
            counting_registry(&live, &peak),
        );
        let mut clock = t0();
        for step in &steps {
            update(&mut model, to_msg(step, &mut clock));
            prop_assert!(peak.get() <= 1, "two dialogs were live at once");
            prop_assert_eq!(live.get(), i64::from(model.modal.is_active()));
        }
    }

    #[test]
    fn non_closable_sessions_survive_escape(
        kind in 0..KINDS.len(),
        enable_close in any::<bool>(),
    ) {
        let live = Rc::new(Cell::new(0_i64));
        let peak = Rc::new(Cell::new(0_i64));
        let mut modal = ModalOrchestrator::new(
            counting_registry(&live, &peak),
            ModalPolicy::default(),
        );
        modal.set_enable_close(enable_close);
        modal
            .open(ModalRequest::forced(KINDS[kind].clone()).with_closable(false))
            .unwrap();
        let outcome = modal.request_close();
        prop_assert!(!outcome.is_closed());
        prop_assert!(modal.is_active());
        prop_assert!(matches!(outcome, CloseOutcome::NotClosable | CloseOutcome::Disabled));
        prop_assert!(modal.close().is_closed());
        prop_assert_eq!(live.get(), 0);
    }

    #[test]
    fn progress_text_switches_to_completion_at_full(progress in 0.0_f64..200.0) {
        let text = format_progress(progress, "Done");
        if progress >= 100.0 {
            prop_assert_eq!(text, "Done");
        } else {
            prop_assert!(text.ends_with(" %"));
            let value: f64 = text.trim_end_matches(" %").parse().unwrap();
            prop_assert!((value - progress).abs() <= 0.005 + f64::EPSILON);
        }
    }
}
