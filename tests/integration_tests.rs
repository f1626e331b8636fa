//! Integration tests: CLI smoke tests and full-pipeline library scenarios.

mod common;

use std::fs;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use crossbeam_channel::unbounded;
use serde_json::Value;
use wallet_sync_status::control::loop_main::{StopReason, run_replay};
use wallet_sync_status::control::signals::ShutdownFlag;
use wallet_sync_status::core::config::Config;
use wallet_sync_status::ingest::HeightEvent;
use wallet_sync_status::ingest::poller::spawn_poller;
use wallet_sync_status::ingest::script::parse_script;
use wallet_sync_status::ingest::simulated::{SimulatedChain, SimulatedChainConfig};
use wallet_sync_status::logger::activity::{
    ActivityEvent, ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger,
};
use wallet_sync_status::modal::content::DialogKind;
use wallet_sync_status::modal::dialogs::builtin_registry;
use wallet_sync_status::modal::orchestrator::{
    CloseOutcome, ModalOrchestrator, ModalPolicy, ModalRequest, SessionProbe,
};
use wallet_sync_status::monitor::sync_tracker::{HeightSample, SyncTracker};
use wallet_sync_status::ui::model::{StatusModel, StatusMsg};
use wallet_sync_status::ui::update::update;

const CATCH_UP_SCRIPT: &str = r#"# node at 100, network at 300
{"at_ms": 0, "op": "network", "height": 300}
{"at_ms": 0, "op": "internal", "height": 100}
{"at_ms": 60000, "op": "internal", "height": 150}
{"at_ms": 120000, "op": "internal", "height": 200}
"#;

/// Stand-in for the dialog slot when the tracker is driven on its own.
struct Slot(bool);

impl SessionProbe for Slot {
    fn is_active(&self) -> bool {
        self.0
    }
}

const BUSY: Slot = Slot(true);
const IDLE: Slot = Slot(false);

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

fn last_json_line(stdout: &str) -> Value {
    let line = stdout
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .expect("json line on stdout");
    serde_json::from_str(line).expect("valid json")
}

// ──────────────────── CLI smoke tests ────────────────────

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: wss [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(result.status.success());
    assert!(
        result.stdout.contains(env!("CARGO_PKG_VERSION")),
        "log: {}",
        result.log_path.display()
    );
}

#[test]
fn completions_command_generates_shell_script() {
    let result = common::run_cli_case("completions_bash", &["completions", "bash"]);
    assert!(result.status.success());
    assert!(result.stdout.contains("wss"));
}

#[test]
fn replay_reports_scenario_metrics_and_writes_activity_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_isolated_config(dir.path());
    let script = dir.path().join("catch_up.jsonl");
    fs::write(&script, CATCH_UP_SCRIPT).unwrap();

    let result = common::run_cli_case(
        "replay_scenario",
        &[
            "--config",
            config.to_str().unwrap(),
            "replay",
            script.to_str().unwrap(),
            "--start",
            "2026-04-01T12:00:00Z",
        ],
    );
    assert!(
        result.status.success(),
        "log: {}",
        result.log_path.display()
    );

    let payload = last_json_line(&result.stdout);
    assert_eq!(payload["command"], "replay");
    let summary = &payload["summary"];
    assert_eq!(summary["stop_reason"], "script_end");
    assert_eq!(summary["samples"], 3);
    assert_eq!(summary["final_state"]["total_remainder"], 200);
    assert_eq!(summary["final_state"]["increase_per_minute"], 25.0);
    assert_eq!(summary["final_dialog"], "syncing");

    let log = fs::read_to_string(dir.path().join("activity.jsonl")).unwrap();
    let events: Vec<Value> = log
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.first().unwrap()["event"], "config_loaded");
    assert!(events.iter().any(|e| e["event"] == "modal_open"));
    assert_eq!(events.last().unwrap()["event"], "session_stop");
}

#[test]
fn replay_frames_emit_one_snapshot_per_change() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_isolated_config(dir.path());
    let script = dir.path().join("catch_up.jsonl");
    fs::write(&script, CATCH_UP_SCRIPT).unwrap();

    let result = common::run_cli_case(
        "replay_frames",
        &[
            "--config",
            config.to_str().unwrap(),
            "replay",
            script.to_str().unwrap(),
            "--frames",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let snapshots: Vec<Value> = result
        .stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .filter(|v: &Value| v.get("state").is_some())
        .collect();
    // begin + one per step
    assert_eq!(snapshots.len(), 5);
    assert_eq!(snapshots[4]["state"]["internal_height"], 200);
}

#[test]
fn replay_rejects_malformed_script_with_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_isolated_config(dir.path());
    let script = dir.path().join("broken.jsonl");
    fs::write(&script, "{\"op\": \"network\", \"height\": 10}\nnot json\n").unwrap();

    let result = common::run_cli_case(
        "replay_broken",
        &[
            "--config",
            config.to_str().unwrap(),
            "replay",
            script.to_str().unwrap(),
        ],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("WSS-2102"), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("line 2"));
}

#[test]
fn seeded_simulation_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_isolated_config(dir.path());
    let args = [
        "--config",
        config.to_str().unwrap(),
        "simulate",
        "--seed",
        "42",
        "--ticks",
        "40",
        "--network-height",
        "1500",
    ];
    let first = common::run_cli_case("simulate_seed_a", &args);
    let second = common::run_cli_case("simulate_seed_b", &args);
    assert!(first.status.success(), "log: {}", first.log_path.display());
    assert!(second.status.success());

    let a = last_json_line(&first.stdout);
    let b = last_json_line(&second.stdout);
    assert_eq!(a["summary"]["stop_reason"], "sources_exhausted");
    assert_eq!(a["summary"]["samples"], 40);
    assert_eq!(
        a["summary"]["final_state"]["internal_height"],
        b["summary"]["final_state"]["internal_height"]
    );
}

#[test]
fn simulate_without_bound_requires_live() {
    let result = common::run_cli_case("simulate_unbounded", &["simulate", "--ticks", "0"]);
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("--live"));
}

#[test]
fn config_validate_and_show_use_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_isolated_config(dir.path());

    let validate = common::run_cli_case(
        "config_validate",
        &["--config", config.to_str().unwrap(), "config", "validate"],
    );
    assert!(validate.status.success(), "log: {}", validate.log_path.display());
    assert_eq!(last_json_line(&validate.stdout)["valid"], true);

    let show = common::run_cli_case(
        "config_show",
        &["--config", config.to_str().unwrap(), "config", "show"],
    );
    assert!(show.status.success());
    let payload = last_json_line(&show.stdout);
    assert_eq!(payload["config"]["sync"]["auto_open_gap_blocks"], 50);
}

#[test]
fn invalid_config_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[rate]\nmin_alpha = 0.9\nbase_alpha = 0.2\n").unwrap();

    let result = common::run_cli_case(
        "config_invalid",
        &["--config", config.to_str().unwrap(), "config", "validate"],
    );
    assert_eq!(result.status.code(), Some(1));
    let payload = last_json_line(&result.stdout);
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["code"], "WSS-1001");
}

#[test]
fn missing_explicit_config_is_a_user_error() {
    let result = common::run_cli_case(
        "config_missing",
        &["--config", "/nonexistent/wss/config.toml", "config", "show"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("WSS-1002"));
}

// ──────────────────── library scenarios ────────────────────

#[test]
fn catch_up_scenario_metrics() {
    let mut tracker = SyncTracker::new(&Config::default());
    tracker.on_network_sample(300);
    for (i, h) in [100, 150, 200].into_iter().enumerate() {
        tracker.ingest_internal(HeightSample::new(h, t(60 * i64::try_from(i).unwrap())), &BUSY);
    }
    let state = tracker.current_state();
    assert_eq!(state.total_remainder, 200);
    assert!((state.increase_per_minute - 25.0).abs() < f64::EPSILON);
    assert_eq!(state.remaining_blocks, 150);
    assert!((state.percentage - 50.0).abs() < f64::EPSILON);
}

#[test]
fn auto_open_threshold_follows_gap() {
    let mut tracker = SyncTracker::new(&Config::default());
    tracker.on_network_sample(1_000);
    // The first sample is judged before any internal height is known.
    assert!(tracker.on_internal_sample(HeightSample::new(990, t(0)), &BUSY).is_none());
    assert!(tracker.on_internal_sample(HeightSample::new(990, t(10)), &IDLE).is_none());

    let mut tracker = SyncTracker::new(&Config::default());
    tracker.on_network_sample(1_000);
    tracker.on_internal_sample(HeightSample::new(940, t(0)), &BUSY);
    let request = tracker
        .on_internal_sample(HeightSample::new(945, t(10)), &IDLE)
        .expect("gap of 60 opens the syncing dialog");
    assert_eq!(request.kind, DialogKind::SYNCING);
    assert!(!request.force_open);
}

#[test]
fn progress_text_formats() {
    let mut modal = ModalOrchestrator::new(builtin_registry(), ModalPolicy::default());
    assert_eq!(modal.push_progress(42.5), None);
    modal.open(ModalRequest::new(DialogKind::SYNCING)).unwrap();
    assert_eq!(modal.push_progress(42.5).as_deref(), Some("42.50 %"));
    assert_eq!(
        modal.push_progress(100.0).as_deref(),
        Some("blockchain fully synced")
    );
}

#[test]
fn daemon_dialog_cannot_be_escaped() {
    let mut modal = ModalOrchestrator::new(builtin_registry(), ModalPolicy::default());
    modal.open(ModalRequest::forced(DialogKind::DAEMON)).unwrap();
    assert_eq!(modal.request_close(), CloseOutcome::NotClosable);
    assert!(modal.is_active());
    assert!(modal.close().is_closed());
}

#[test]
fn subscribers_see_every_published_state_in_order() {
    let mut model = StatusModel::new(&Config::default());
    let sub = model.tracker.subscribe();
    update(&mut model, StatusMsg::Heights(vec![HeightEvent::Network(500)]));
    for (i, h) in [10, 20, 30].into_iter().enumerate() {
        update(
            &mut model,
            StatusMsg::Heights(vec![HeightEvent::Internal(HeightSample::new(
                h,
                t(i64::try_from(i).unwrap() * 5),
            ))]),
        );
    }
    let heights: Vec<i64> = sub.drain().iter().map(|s| s.internal_height).collect();
    assert_eq!(heights, vec![10, 20, 30]);
    assert!(model.tracker.unsubscribe(sub.id()));
}

#[test]
fn replay_with_user_actions_through_library() {
    let script = parse_script(
        r#"{"at_ms": 0, "op": "network", "height": 5000}
{"at_ms": 0, "op": "internal", "height": 100}
{"at_ms": 1000, "op": "cancel"}
{"at_ms": 2000, "op": "internal", "height": 200}
{"at_ms": 3000, "op": "open", "kind": "unlock_wallet", "payload": {"timeout": 60}}
{"at_ms": 4000, "op": "internal", "height": 300}"#,
    )
    .unwrap();
    let (tx, rx) = unbounded();
    let summary = run_replay(
        &Config::default(),
        &script,
        t(0),
        ActivityLoggerHandle::with_sender(tx),
        |_| {},
    );
    assert_eq!(summary.stop_reason, StopReason::ScriptEnd);
    assert_eq!(summary.final_dialog.as_deref(), Some("unlock_wallet"));

    let events: Vec<ActivityEvent> = rx.try_iter().collect();
    let suppressed = events
        .iter()
        .filter(|e| matches!(e, ActivityEvent::AutoOpenSuppressed { reason, .. } if reason == "dismissed"))
        .count();
    assert_eq!(suppressed, 1);
}

#[test]
fn poller_feeds_simulated_chain_into_model() {
    let chain = SimulatedChain::new(
        SimulatedChainConfig {
            network_height: 500,
            max_ticks: Some(10),
            seed: Some(9),
            ..SimulatedChainConfig::default()
        },
        t(0),
    )
    .unwrap();
    let (tx, rx) = unbounded();
    let shutdown = ShutdownFlag::new();
    let join = spawn_poller(
        chain,
        StdDuration::from_millis(1),
        shutdown.clone(),
        tx,
        StatusMsg::from,
    )
    .unwrap();

    let mut model = StatusModel::new(&Config::default());
    model.live_sources = 1;
    while let Ok(msg) = rx.recv_timeout(StdDuration::from_secs(5)) {
        update(&mut model, msg);
        if model.quit {
            break;
        }
    }
    shutdown.request();
    join.join().unwrap();
    assert!(model.quit);
    assert_eq!(model.tracker.state().samples, 10);
    assert!(model.tracker.state().network_height >= 500);
}

#[test]
fn logger_thread_writes_jsonl_to_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.paths.jsonl_log = dir.path().join("activity.jsonl");
    config.paths.jsonl_fallback = None;

    let (handle, join) = spawn_logger(ActivityLoggerConfig::from_config(&config)).unwrap();
    handle.send(ActivityEvent::NetworkHeight { height: 77 });
    handle.send(ActivityEvent::ModalOpened {
        kind: "syncing".to_string(),
        instance: 1,
        forced: false,
        closable: true,
        replaced: None,
    });
    handle.shutdown();
    join.join().unwrap();

    let log = fs::read_to_string(dir.path().join("activity.jsonl")).unwrap();
    let lines: Vec<Value> = log
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "network_height");
    assert_eq!(lines[0]["network_height"], 77);
    assert_eq!(lines[1]["dialog"], "syncing");
}
