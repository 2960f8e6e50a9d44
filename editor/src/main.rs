use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fernlight_core::{ExecutorManager, HeadlessToolkit};
use fernlight_editor::log_capture::{self, SharedLogBuffer};
use fernlight_editor::{
    EditorConfig, EditorResult, EditorSession, EngineThread, LoggingListener, Registries, Scene,
    script,
};

const STEP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(
    name = "fernlight-editor",
    about = "Headless Fernlight editor session",
    long_about = "Runs the Fernlight editor core without a GUI.\n\n\
        A headless UI thread and a fixed-timestep engine thread are started, \
        a scripted editing session (node creation, property drags, undo and \
        redo) is played against the scene, and the resulting scene and any \
        captured failures are printed.\n\
        \n\
        EXAMPLES:\n\
          # Default settings\n\
          ./fernlight-editor\n\
        \n\
          # Faster ticks, debug logging\n\
          ./fernlight-editor --tick-ms 4 --frames 30 --verbose",
    version
)]
struct Args {
    /// TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine timestep in milliseconds, overriding the config.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Engine ticks to run before stopping.
    #[arg(long, default_value = "120")]
    frames: u64,

    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let logs = match log_capture::install(args.verbose) {
        Ok(logs) => logs,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    match run(&args, &logs) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, logs: &SharedLogBuffer) -> EditorResult<()> {
    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let tick = Duration::from_millis(args.tick_ms.unwrap_or(config.engine_loop.tick_ms).max(1));

    let manager = ExecutorManager::<Scene>::new(config.executors.clone())?;
    manager.attach_ui_toolkit(Arc::new(HeadlessToolkit::spawn(&config.executors.fx.thread_name)?));

    let session = EditorSession::new(manager.clone(), Registries::default(), config.history.max_undo);
    session.notifier().add_listener(Arc::new(LoggingListener));

    let engine = EngineThread::spawn(manager.clone(), script::initial_scene()?, tick)?;
    let status = manager.schedule_at_fixed_rate(
        {
            let session = session.clone();
            move || {
                log::debug!(
                    "history: {} entries, unsaved changes: {}",
                    session.history_len(),
                    session.has_unsaved_changes()
                )
            }
        },
        Duration::from_millis(250),
    );

    let report = script::play(&session, STEP_TIMEOUT);
    let frames_budget = tick.saturating_mul(u32::try_from(args.frames).unwrap_or(u32::MAX));
    let reached = engine.wait_for_ticks(args.frames, frames_budget.saturating_add(STEP_TIMEOUT));
    status.cancel();
    let scene = engine.stop()?;
    manager.shutdown();
    let report = report?;
    if !reached {
        log::warn!("Engine stopped before {} ticks", args.frames);
    }

    println!("{scene}");
    println!("{} requests posted", report.requests);
    println!("Undo: {}", report.undo.join(", "));
    println!("Redo: {}", report.redo.join(", "));

    let logs = logs.lock();
    println!("{} captured warnings/errors", logs.len());
    for entry in logs.entries() {
        println!("  [{}] {}: {}", entry.level, entry.target, entry.message);
    }
    Ok(())
}
