//! Top-level CLI definition and dispatch.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use serde_json::{Value, json};
use thiserror::Error;

use connwatch::core::config::Config;
use connwatch::core::errors::{CwError, Result as CwResult};
use connwatch::engine::{Applied, EngineModel, EngineRuntime, UserCommand};
use connwatch::enrich::{Collaborators, Collector, RequestContext};
use connwatch::logger::{ActivityEvent, ActivityLoggerHandle, JsonlConfig, spawn_logger};
use connwatch::model::Snapshot;
use connwatch::view::{SelectionId, ViewLevel, VisibleRows};

/// connwatch — which process owns which socket, live.
#[derive(Debug, Parser)]
#[command(
    name = "connwatch",
    author,
    version,
    about = "Live network connection monitor engine",
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
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Drive the engine from recorded snapshots and print each frame.
    Replay(ReplayArgs),
    /// Inspect the effective configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// JSONL file with one snapshot per line.
    #[arg(long, value_name = "FILE")]
    snapshots: PathBuf,
    /// Only show connections on this exact port.
    #[arg(long, value_name = "PORT")]
    port_filter: Option<u16>,
    /// Tick interval between replayed snapshots.
    #[arg(long, value_name = "MILLISECONDS")]
    interval_ms: Option<u64>,
    /// Initial search query.
    #[arg(long, value_name = "TEXT")]
    search: Option<String>,
    /// Write the activity log even if the config disables it.
    #[arg(long)]
    log: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration and print its hash.
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
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

impl From<CwError> for CliError {
    fn from(err: CwError) -> Self {
        match err {
            CwError::InvalidConfig { .. }
            | CwError::MissingConfig { .. }
            | CwError::ConfigParse { .. } => Self::User(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Replay(args) => run_replay(cli, args),
        Command::Config(args) => run_config(cli, args),
    }
}

// ──────────────────── replay ────────────────────

/// Collector that hands out recorded snapshots in file order.
struct ReplayCollector {
    frames: Mutex<VecDeque<Snapshot>>,
}

impl ReplayCollector {
    fn from_jsonl(path: &Path) -> Result<Self, CliError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| CliError::User(format!("cannot read {}: {e}", path.display())))?;
        let mut frames = VecDeque::new();
        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let snapshot: Snapshot = serde_json::from_str(line).map_err(|e| {
                CliError::User(format!("{}:{}: {e}", path.display(), index + 1))
            })?;
            frames.push_back(snapshot);
        }
        Ok(Self {
            frames: Mutex::new(frames),
        })
    }

    fn remaining(&self) -> usize {
        self.frames.lock().len()
    }
}

impl Collector for ReplayCollector {
    fn collect(&self, ctx: &RequestContext) -> CwResult<Snapshot> {
        ctx.check("replay")?;
        let mut snapshot =
            self.frames
                .lock()
                .pop_front()
                .ok_or_else(|| CwError::Collection {
                    source_name: "replay",
                    details: "no recorded snapshots left".to_string(),
                })?;
        snapshot.completed = Instant::now();
        Ok(snapshot)
    }
}

fn run_replay(cli: &Cli, args: &ReplayArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = args.port_filter {
        config.view.port_filter = Some(port);
    }
    if let Some(ms) = args.interval_ms {
        config.refresh.interval_ms = ms;
    }
    if args.log {
        config.logging.enabled = true;
    }
    config.refresh.start_paused = false;
    config.validate()?;

    let collector = Arc::new(ReplayCollector::from_jsonl(&args.snapshots)?);
    if collector.remaining() == 0 {
        return Err(CliError::User(format!(
            "{} contains no snapshots",
            args.snapshots.display()
        )));
    }

    let (logger, logger_join) = if config.logging.enabled {
        let (handle, join) = spawn_logger(JsonlConfig::from_logging(&config.logging))?;
        (handle, Some(join))
    } else {
        (ActivityLoggerHandle::disabled(), None)
    };
    logger.send(ActivityEvent::ConfigLoaded {
        path: config.source_path.display().to_string(),
    });

    let collaborators = Collaborators::collector_only(Arc::clone(&collector) as Arc<dyn Collector>);
    let runtime = EngineRuntime::new(config, collaborators, logger.clone());
    if let Some(query) = &args.search {
        runtime
            .handle()
            .send(UserCommand::SetSearch(query.clone()))?;
    }

    let mode = output_mode(cli);
    let mut stdout = io::stdout().lock();
    let mut write_failure: Option<CliError> = None;
    let result = runtime.run(|model, applied| {
        let exhausted = collector.remaining() == 0;
        match applied {
            Applied::Refresh => {
                if let Err(e) = write_frame(&mut stdout, model, mode) {
                    write_failure = Some(e);
                    return ControlFlow::Break(());
                }
                if exhausted {
                    return ControlFlow::Break(());
                }
            }
            Applied::Failure if exhausted => return ControlFlow::Break(()),
            _ => {}
        }
        ControlFlow::Continue(())
    });

    logger.shutdown();
    if let Some(join) = logger_join {
        let _ = join.join();
    }

    if let Some(e) = write_failure {
        return Err(e);
    }
    let model = result?;
    if let Some(err) = &model.last_error {
        return Err(CliError::Runtime(err.message.clone()));
    }
    Ok(())
}

fn write_frame(out: &mut impl Write, model: &EngineModel, mode: OutputMode) -> Result<(), CliError> {
    let frame = frame_json(model);
    match mode {
        OutputMode::Json => {
            serde_json::to_writer(&mut *out, &frame)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            let view = model.view();
            writeln!(
                out,
                "refresh {} | {} | sort {} {} | cursor {}",
                model.refreshes,
                level_label(view.level),
                view.sort.label(),
                if view.ascending { "asc" } else { "desc" },
                view.cursor,
            )?;
            for (index, label) in row_labels(model).iter().enumerate() {
                let marker = if index == view.cursor { '>' } else { ' ' };
                writeln!(out, "{marker} {label}")?;
            }
        }
    }
    Ok(())
}

fn frame_json(model: &EngineModel) -> Value {
    let view = model.view();
    json!({
        "refresh": model.refreshes,
        "level": level_label(view.level),
        "depth": model.nav.depth(),
        "sort": view.sort.label(),
        "ascending": view.ascending,
        "cursor": view.cursor,
        "selection": view.selection.as_ref().map(selection_label),
        "rows": row_labels(model),
        "changes": model.ledger.len(),
        "error": model.last_error.as_ref().map(|e| e.code),
    })
}

fn row_labels(model: &EngineModel) -> Vec<String> {
    match model.visible_rows() {
        VisibleRows::Processes(apps) => apps.iter().map(|app| app.name.clone()).collect(),
        VisibleRows::Connections(rows) => rows
            .iter()
            .map(|row| {
                let conn = row.connection;
                let marker = match model.change_for(conn).map(|c| c.kind) {
                    Some(connwatch::reconcile::ChangeKind::Added) => "+",
                    Some(connwatch::reconcile::ChangeKind::Removed) => "-",
                    None => " ",
                };
                format!(
                    "{marker}{} {} {} -> {} {}",
                    row.process,
                    conn.protocol.label(),
                    conn.local,
                    conn.remote,
                    conn.state
                )
            })
            .collect(),
    }
}

const fn level_label(level: ViewLevel) -> &'static str {
    match level {
        ViewLevel::ProcessList => "processes",
        ViewLevel::Connections => "connections",
        ViewLevel::AllConnections => "all-connections",
    }
}

fn selection_label(selection: &SelectionId) -> String {
    match selection {
        SelectionId::Process(name) => name.clone(),
        SelectionId::Container(id) => format!("container {id}"),
        SelectionId::Connection {
            process,
            local,
            remote,
        } => format!("{process} {local} -> {remote}"),
    }
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
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
                OutputMode::Json => write_json_line(&json!({
                    "command": "config path",
                    "path": path.to_string_lossy(),
                    "exists": exists,
                }))?,
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;
            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml()?),
                OutputMode::Json => write_json_line(&json!({
                    "command": "config show",
                    "config": serde_json::to_value(&config)?,
                }))?,
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => {
            let config = Config::load(cli.config.as_deref())?;
            let hash = config.stable_hash()?;
            match output_mode(cli) {
                OutputMode::Human => {
                    println!("Configuration is valid.");
                    println!("  Source: {}", config.source_path.display());
                    println!("  Hash: {hash}");
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "config validate",
                    "valid": true,
                    "source": config.source_path.to_string_lossy(),
                    "hash": hash,
                }))?,
            }
            Ok(())
        }
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("CW_OUTPUT_FORMAT").ok();
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
