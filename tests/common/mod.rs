#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicU64, Ordering};

/// Captured output of one `wss` invocation, mirrored to a log file so failing
/// assertions can point at the full transcript.
pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

static CASE_SEQ: AtomicU64 = AtomicU64::new(0);

fn case_file_name(case_name: &str) -> String {
    let stem: String = case_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let seq = CASE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{stem}-{}-{seq}.log", std::process::id())
}

/// `CARGO_BIN_EXE_wss` when cargo provides it, else `target/<profile>/wss`.
fn wss_binary() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_wss") {
        return PathBuf::from(path);
    }
    let exe = if cfg!(windows) { "wss.exe" } else { "wss" };
    std::env::current_exe()
        .ok()
        .and_then(|test_exe| test_exe.parent()?.parent().map(|dir| dir.join(exe)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| panic!("wss binary not found; build with --features cli"))
}

/// Write a config that keeps the activity log inside `dir`.
pub fn write_isolated_config(dir: &Path) -> PathBuf {
    let config_path = dir.join("config.toml");
    let body = format!(
        "[paths]\njsonl_log = {:?}\njsonl_fallback = {:?}\n",
        dir.join("activity.jsonl").display().to_string(),
        dir.join("fallback.jsonl").display().to_string(),
    );
    fs::write(&config_path, body).expect("write isolated config");
    config_path
}

/// Run `wss` with JSON output forced and record the transcript.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let log_dir = std::env::temp_dir().join("wss-test-logs");
    fs::create_dir_all(&log_dir).expect("create test log dir");
    let log_path = log_dir.join(case_file_name(case_name));
    let binary = wss_binary();

    let output = Command::new(&binary)
        .args(args)
        .env("WSS_OUTPUT_FORMAT", "json")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("spawn wss");

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    let transcript = format!(
        "case={case_name}\nbin={}\nargs={args:?}\nstatus={}\n== stdout ==\n{stdout}\n== stderr ==\n{stderr}\n",
        binary.display(),
        output.status,
    );
    fs::write(&log_path, transcript).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
