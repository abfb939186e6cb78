//! CLI mode for mc-tasks: runs game version installs on the simulated worker
//! and renders the registry while they progress.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    AppConfig, CompletionNotifier, FailurePoint, JobOutcome, JobPlan, OrderingPolicy, PathConfig,
    ProgressWeighting, SimulatedWorker, TaskManager, TaskRegistry,
};

use progress::{TerminalAffordance, make_total_progress_bar, print_summary, update_total_bar};

const DEFAULT_TICK_MS: u64 = 100;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "MC_TASKS_CONFIG";

// ============================================================================
// Arguments
// ============================================================================

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub versions: Vec<String>,
    pub weighted: bool,
    pub strict_order: bool,
    pub json: bool,
    /// Versions whose job should fail after the first item.
    pub fail: Vec<String>,
    pub tick_ms: Option<u64>,
    pub help: bool,
}

/// Parses arguments (without the program name).
///
/// # Errors
///
/// Returns a message when an option is missing its value or is unknown.
pub fn parse_args(args: &[String]) -> std::result::Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-w" | "--weighted" => parsed.weighted = true,
            "-s" | "--strict-order" => parsed.strict_order = true,
            "--json" => parsed.json = true,
            "--fail" => {
                i += 1;
                let version = args.get(i).ok_or("--fail requires a version")?;
                parsed.fail.push(version.clone());
            }
            "-t" | "--tick" => {
                i += 1;
                let ms = args
                    .get(i)
                    .and_then(|v| v.parse().ok())
                    .ok_or("--tick requires a number of milliseconds")?;
                parsed.tick_ms = Some(ms);
            }
            "-h" | "--help" => parsed.help = true,
            arg if !arg.starts_with('-') => parsed.versions.push(arg.to_string()),
            other => return Err(format!("unknown option: {other}")),
        }
        i += 1;
    }
    Ok(parsed)
}

fn print_usage() {
    eprintln!("Usage: mc-tasks [OPTIONS] <version>...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <version>           Game version to install, e.g. 1.21.4");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -w, --weighted      Weight item progress by download size");
    eprintln!("  -s, --strict-order  Drop out-of-order progress events");
    eprintln!("      --fail <V>      Make the job for version V fail midway");
    eprintln!("  -t, --tick <MS>     Simulated report interval (default: {DEFAULT_TICK_MS})");
    eprintln!("      --json          Print the final registry snapshot as JSON");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {CONFIG_ENV}     Path to config.toml");
    eprintln!("  RUST_LOG            Log filter, e.g. mc_tasks=debug");
}

// ============================================================================
// Configuration
// ============================================================================

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathConfig::default().config_file(), PathBuf::from)
}

/// Layers command line switches on top of the loaded file.
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if args.weighted {
        config.tasks.progress_weighting = ProgressWeighting::SizeWeighted;
    }
    if args.strict_order {
        config.tasks.ordering = OrderingPolicy::DropStale;
    }
}

// ============================================================================
// Run
// ============================================================================

/// Runs the CLI with the process arguments.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the snapshot
/// cannot be serialized. Failed jobs are reported, not returned.
pub async fn run() -> crate::Result<()> {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            print_usage();
            std::process::exit(2);
        }
    };
    if args.help || args.versions.is_empty() {
        print_usage();
        std::process::exit(i32::from(!args.help));
    }

    let mut config = AppConfig::load_or_default(&config_path())?;
    apply_overrides(&mut config, &args);
    log::debug!("Using {:?}", config.tasks);

    let tick = Duration::from_millis(args.tick_ms.unwrap_or(DEFAULT_TICK_MS));
    let worker = args.fail.iter().fold(SimulatedWorker::new(tick), |worker, version| {
        worker.failing(version.clone(), FailurePoint::AfterFirstItem)
    });

    let total_bar = make_total_progress_bar();
    let notifier = Arc::new(CompletionNotifier::new(TerminalAffordance::new(
        total_bar.clone(),
    )));

    let mut manager = TaskManager::new(TaskRegistry::new(config.tasks), Arc::new(worker));
    manager.subscribe(notifier);

    let outcomes: Vec<_> = args
        .versions
        .iter()
        .map(|version| manager.start_job(JobPlan::game_version(version.clone())))
        .collect();

    let mut redraw = tokio::time::interval(Duration::from_millis(100));
    while manager.running_jobs() > 0 {
        tokio::select! {
            () = manager.process_next() => {}
            _ = redraw.tick() => update_total_bar(&total_bar, manager.registry()),
        }
    }
    manager.process_pending();
    update_total_bar(&total_bar, manager.registry());
    total_bar.finish_and_clear();

    let results = futures::future::join_all(outcomes.into_iter().map(JobOutcome::wait)).await;
    for result in results {
        if let Err(e) = result {
            eprintln!("Job error: {e}");
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&manager.registry().snapshot())
            .map_err(std::io::Error::other)?;
        println!("{json}");
    } else {
        print_summary(manager.registry());
    }
    Ok(())
}
