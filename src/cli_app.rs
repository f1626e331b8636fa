//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use crossbeam_channel::unbounded;
use serde_json::{Value, json};
use thiserror::Error;

use wallet_sync_status::control::loop_main::{RunSummary, Runtime, StopReason, run_live, run_replay};
use wallet_sync_status::control::signals::ShutdownFlag;
use wallet_sync_status::core::config::Config;
use wallet_sync_status::core::errors::StatusError;
use wallet_sync_status::ingest::HeightSource;
use wallet_sync_status::ingest::poller::spawn_poller;
use wallet_sync_status::ingest::script::{ScriptSource, load_script};
use wallet_sync_status::ingest::simulated::{SimulatedChain, SimulatedChainConfig};
use wallet_sync_status::logger::activity::{
    ActivityEvent, ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger,
};
use wallet_sync_status::ui::input::spawn_key_reader;
use wallet_sync_status::ui::model::{StatusModel, StatusMsg};
use wallet_sync_status::ui::render::{render_frame, snapshot, status_line};
use wallet_sync_status::ui::screen;
use wallet_sync_status::ui::terminal_guard::TerminalGuard;

/// Wallet sync status: chain-height tracking and sync dialogs.
#[derive(Debug, Parser)]
#[command(
    name = "wss",
    author,
    version,
    about = "Wallet sync status - chain-height tracking and sync dialogs",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Replay a JSONL session script deterministically.
    Replay(ReplayArgs),
    /// Run a simulated chain catching up to the network.
    Simulate(SimulateArgs),
    /// Interactive full-screen status view.
    Watch(WatchArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Script to replay (one JSON step per line).
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
    /// Print a frame after every state change.
    #[arg(long)]
    frames: bool,
    /// Replay start time (RFC 3339); defaults to now.
    #[arg(long, value_name = "TIME")]
    start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Args)]
struct ChainArgs {
    /// RNG seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of ticks to simulate (0 = unbounded, live modes only).
    #[arg(long, default_value_t = 120)]
    ticks: u64,
    /// Local node height at start.
    #[arg(long, default_value_t = 0)]
    start_height: i64,
    /// Network tip height at start.
    #[arg(long, default_value_t = 2_000)]
    network_height: i64,
    /// Fewest blocks imported per tick.
    #[arg(long, default_value_t = 20)]
    catch_up_min: u32,
    /// Most blocks imported per tick.
    #[arg(long, default_value_t = 60)]
    catch_up_max: u32,
    /// Chance per tick that the network produces a block.
    #[arg(long, default_value_t = 0.1)]
    network_block_probability: f64,
    /// Virtual seconds per tick.
    #[arg(long, default_value_t = 1)]
    tick_secs: i64,
}

impl ChainArgs {
    fn to_config(&self) -> SimulatedChainConfig {
        SimulatedChainConfig {
            start_height: self.start_height,
            network_height: self.network_height,
            catch_up: (self.catch_up_min, self.catch_up_max),
            network_block_probability: self.network_block_probability,
            tick: chrono::Duration::seconds(self.tick_secs.max(1)),
            max_ticks: (self.ticks > 0).then_some(self.ticks),
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct SimulateArgs {
    #[command(flatten)]
    chain: ChainArgs,
    /// Print a frame after every state change.
    #[arg(long)]
    frames: bool,
    /// Poll at `ingest.poll_interval_ms` in real time instead of as fast as possible.
    #[arg(long)]
    live: bool,
}

#[derive(Debug, Clone, Args)]
struct WatchArgs {
    /// Drive heights from a script instead of the simulated chain.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,
    #[command(flatten)]
    chain: ChainArgs,
    /// Redraw interval in milliseconds when idle.
    #[arg(long, default_value_t = 250)]
    refresh_ms: u64,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input (bad script, bad config, bad flags).
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<StatusError> for CliError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::InvalidConfig { .. }
            | StatusError::MissingConfig { .. }
            | StatusError::ConfigParse { .. }
            | StatusError::ScriptParse { .. }
            | StatusError::UnknownDialog { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Replay(args) => run_replay_cmd(cli, args),
        Command::Simulate(args) => run_simulate(cli, args),
        Command::Watch(args) => run_watch(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── session plumbing ────────────────────

/// Loaded config plus the activity logger for one command.
struct Session {
    config: Config,
    logger: ActivityLoggerHandle,
    logger_join: Option<JoinHandle<()>>,
}

impl Session {
    fn start(cli: &Cli) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        let (logger, logger_join) = if config.logging.enabled {
            let (handle, join) = spawn_logger(ActivityLoggerConfig::from_config(&config))?;
            (handle, Some(join))
        } else {
            (ActivityLoggerHandle::disabled(), None)
        };
        logger.send(ActivityEvent::ConfigLoaded {
            path: config.paths.config_file.display().to_string(),
            config_hash: config.stable_hash().unwrap_or_default(),
        });
        Ok(Self {
            config,
            logger,
            logger_join,
        })
    }

    fn finish(mut self) {
        let dropped = self.logger.dropped_events();
        self.logger.shutdown();
        if let Some(join) = self.logger_join.take() {
            let _ = join.join();
        }
        if dropped > 0 {
            eprintln!("[WSS-JSONL] {dropped} activity events dropped");
        }
    }
}

/// Renderer for non-interactive commands: frames on stdout when requested.
fn frame_printer(mode: OutputMode, enabled: bool) -> impl FnMut(&StatusModel) {
    move |model: &StatusModel| {
        if !enabled {
            return;
        }
        let mut stdout = io::stdout().lock();
        match mode {
            OutputMode::Human => {
                for (i, line) in render_frame(model).iter().enumerate() {
                    let styled = match i {
                        0 => line.cyan(),
                        _ if line.starts_with('!') => line.yellow(),
                        _ => line.bold(),
                    };
                    let _ = writeln!(stdout, "{styled}");
                }
            }
            OutputMode::Json => {
                if serde_json::to_writer(&mut stdout, &snapshot(model)).is_ok() {
                    let _ = writeln!(stdout);
                }
            }
        }
    }
}

fn emit_summary(cli: &Cli, command: &str, summary: &RunSummary) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            println!("{} {}", "stopped:".bold(), summary.stop_reason);
            println!("  {}", status_line(&summary.final_state));
            println!(
                "  samples {}  dialogs opened {}  ingest errors {}",
                summary.samples, summary.dialogs_opened, summary.ingest_errors
            );
            if let Some(dialog) = &summary.final_dialog {
                println!("  dialog {}", dialog.green());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": command,
                "summary": serde_json::to_value(summary)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── commands ────────────────────

fn run_replay_cmd(cli: &Cli, args: &ReplayArgs) -> Result<(), CliError> {
    let steps = load_script(&args.script)?;
    let session = Session::start(cli)?;
    let start = args.start.unwrap_or_else(Utc::now);

    let summary = run_replay(
        &session.config,
        &steps,
        start,
        session.logger.clone(),
        frame_printer(output_mode(cli), args.frames),
    );
    session.finish();
    emit_summary(cli, "replay", &summary)
}

fn run_simulate(cli: &Cli, args: &SimulateArgs) -> Result<(), CliError> {
    if args.chain.ticks == 0 && !args.live {
        return Err(CliError::User(
            "--ticks 0 runs forever; combine it with --live".to_string(),
        ));
    }
    let session = Session::start(cli)?;
    let chain = SimulatedChain::new(args.chain.to_config(), Utc::now())?;
    let renderer = frame_printer(output_mode(cli), args.frames);

    let summary = if args.live {
        let shutdown = ShutdownFlag::with_os_signals();
        let interval = Duration::from_millis(session.config.ingest.poll_interval_ms);
        let (tx, rx) = unbounded();
        let poller = spawn_poller(chain, interval, shutdown.clone(), tx, StatusMsg::from)?;

        let mut model = StatusModel::new(&session.config);
        model.live_sources = 1;
        let mut runtime = Runtime::new(model, session.logger.clone(), renderer);
        runtime.begin("simulate", &session.config);
        let summary = run_live(runtime, &rx, &shutdown, interval);
        let _ = poller.join();
        summary
    } else {
        simulate_offline(&session, chain, renderer)
    };

    session.finish();
    emit_summary(cli, "simulate", &summary)
}

/// Pump the simulated chain on this thread with its virtual clock.
fn simulate_offline<R: FnMut(&StatusModel)>(
    session: &Session,
    mut chain: SimulatedChain,
    renderer: R,
) -> RunSummary {
    let mut runtime = Runtime::new(
        StatusModel::new(&session.config),
        session.logger.clone(),
        renderer,
    );
    runtime.begin("simulate", &session.config);

    let reason = loop {
        if chain.is_exhausted() {
            break StopReason::SourcesExhausted;
        }
        let msg = match chain.poll() {
            Ok(events) if events.is_empty() => continue,
            Ok(events) => StatusMsg::Heights(events),
            Err(error) => StatusMsg::IngestFailed {
                source: chain.name(),
                error,
            },
        };
        if !runtime.dispatch(msg) {
            break StopReason::UserQuit;
        }
    };
    runtime.finish(reason)
}

fn run_watch(cli: &Cli, args: &WatchArgs) -> Result<(), CliError> {
    if !io::stdout().is_terminal() {
        return Err(CliError::User(
            "watch needs an interactive terminal; use replay or simulate".to_string(),
        ));
    }
    let session = Session::start(cli)?;
    let shutdown = ShutdownFlag::with_os_signals();
    let interval = Duration::from_millis(session.config.ingest.poll_interval_ms);
    let (tx, rx) = unbounded::<StatusMsg>();

    let poller = match &args.script {
        Some(path) => spawn_poller(
            ScriptSource::from_path(path, Utc::now())?,
            interval,
            shutdown.clone(),
            tx.clone(),
            StatusMsg::from,
        )?,
        None => spawn_poller(
            SimulatedChain::new(args.chain.to_config(), Utc::now())?,
            interval,
            shutdown.clone(),
            tx.clone(),
            StatusMsg::from,
        )?,
    };

    let guard = TerminalGuard::new()?;
    let keys = spawn_key_reader(shutdown.clone(), tx, |msg| msg)?;
    let (width, _) = TerminalGuard::terminal_size();

    let mut model = StatusModel::new(&session.config);
    model.live_sources = 1;
    // Keep the final state on screen until the user quits.
    model.stop_when_exhausted = false;
    let renderer = move |model: &StatusModel| {
        let mut stdout = io::stdout().lock();
        let _ = screen::draw(&mut stdout, model, width);
        let _ = stdout.flush();
    };
    let mut runtime = Runtime::new(model, session.logger.clone(), renderer);
    runtime.begin("watch", &session.config);
    let summary = run_live(
        runtime,
        &rx,
        &shutdown,
        Duration::from_millis(args.refresh_ms.max(10)),
    );

    let _ = poller.join();
    let _ = keys.join();
    drop(guard);
    session.finish();
    emit_summary(cli, "watch", &summary)
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;
            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml()?),
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("{}", "Configuration is valid.".green());
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("{} {e}", "Configuration is INVALID:".red());
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                            "code": e.code(),
                        }))?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ──────────────────── output helpers ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("WSS_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
