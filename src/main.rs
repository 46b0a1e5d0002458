use clap::Parser;
use colored::Colorize;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::thread::spawn;
use std::time::Duration;

use buggy_pass::prelude::*;

mod config;
use config::{Args, Config};

use git_version::git_version;
const GIT_VERSION: &str = git_version!(fallback = "unknown");

/// Exit status used when the watchdog fires, as for `timeout(1)`
const WATCHDOG_EXIT_CODE: i32 = 124;

/// Driver running `buggy` / `buggy-attr` pipelines over a module description
///
fn main() -> Result<(), String> {
    // Get parameter from command line
    let args = Args::parse();

    // Load config file if provided, then let the command line override it
    let config = match &args.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.override_with_args(&args);
            config
        }
        None => Config::from_args(&args),
    };

    // RUST_LOG takes precedence over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    println!("--- Buggy pass driver: {GIT_VERSION} ---\n");

    if args.list_options {
        println!("Options of the buggy pass:");
        BuggyOptions::names().for_each(|name| println!("  {name}"));
        return Ok(());
    }

    let input = config
        .input
        .clone()
        .ok_or_else(|| "No input module given".to_string())?;
    let module = Module::from_file(&input).map_err(|e| e.to_string())?;

    // Options for plain `buggy` elements
    let plugin = match &config.options {
        Some(raw) => BuggyPlugin::new(BuggyOptions::parse(raw).map_err(|e| e.to_string())?),
        None => BuggyPlugin::from_env().map_err(|e| e.to_string())?,
    };
    let pipeline = plugin
        .parse_pipeline(config.pipeline_text())
        .map_err(|e| e.to_string())?;
    println!("Run pipeline '{}' on {}", pipeline, input.display());

    let (changed, module) = run_pipeline(pipeline, module, config.watchdog_ms)?;

    if changed {
        println!("{}", "Module changed".yellow());
    } else {
        println!("{}", "Module unchanged".green());
    }

    if config.print {
        println!("\n{module}");
    }

    if let Some(path) = &config.output {
        let text = serde_json::to_string_pretty(&module).map_err(|e| e.to_string())?;
        std::fs::write(path, text).map_err(|e| format!("Failed to write output: {}", e))?;
        println!("Module written to {}", path.display());
    }
    Ok(())
}

/// Run the pipeline on a worker thread and wait for it, optionally bounded by a watchdog.
///
/// Fatal faults abort the whole process from the worker thread. A spinning
/// pipeline is only detected by the watchdog, which terminates the process.
fn run_pipeline(
    pipeline: PassPipeline,
    mut module: Module,
    watchdog_ms: Option<u64>,
) -> Result<(bool, Module), String> {
    let (result_sender, result_receiver) = bounded(1);
    spawn(move || {
        let changed = pipeline.run(&mut module, &ProcessAbort);
        // Receiver may be gone after a watchdog timeout
        let _ = result_sender.send((changed, module));
    });

    match watchdog_ms {
        Some(ms) => match result_receiver.recv_timeout(Duration::from_millis(ms)) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => {
                eprintln!(
                    "{} pipeline did not finish within {} ms",
                    "WATCHDOG:".red().bold(),
                    ms
                );
                std::process::exit(WATCHDOG_EXIT_CODE);
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err("Pipeline worker terminated unexpectedly".to_string())
            }
        },
        None => result_receiver
            .recv()
            .map_err(|_| "Pipeline worker terminated unexpectedly".to_string()),
    }
}
