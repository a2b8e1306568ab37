//! Command-line interface.
//!
//! Three commands around the sorter:
//! - `watch` — run the live watcher until killed
//! - `sweep` — organize everything already in the folder, once
//! - `open` — reveal the watched folder in the file manager

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::category::ExtensionIndex;
use crate::config::Config;
use crate::output::OutputFormatter;
use crate::platform;
use crate::sorter::FileSorter;
use crate::watcher::WatchService;

#[derive(Parser)]
#[command(name = "droptidy", version, about = "Sort a folder's files into category subfolders")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Watch the configured folder and sort new files as they stabilize.
    Watch,
    /// Sort every file currently in the folder, then exit.
    Sweep,
    /// Reveal the watched folder in the system file manager.
    Open,
}

/// Runs the parsed CLI command.
pub fn run(cli: Cli) -> Result<(), String> {
    let config = Config::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;

    match cli.command {
        CliCommand::Watch => run_watch(&config),
        CliCommand::Sweep => run_sweep(&config),
        CliCommand::Open => run_open(&config),
    }
}

fn build_sorter(config: &Config) -> FileSorter {
    let index = ExtensionIndex::build(&config.categories);
    FileSorter::new(config.watch_folder(), index, config.debounce())
}

/// Watches the configured folder until the process is killed.
fn run_watch(config: &Config) -> Result<(), String> {
    let watch_folder = config.watch_folder();
    if !watch_folder.is_dir() {
        return Err(format!(
            "Watch folder does not exist: {}",
            watch_folder.display()
        ));
    }

    let mut sorter = build_sorter(config);
    sorter.set_move_hook(|moved| {
        let name = moved
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        OutputFormatter::success(&format!("{} → {}/", name, moved.category));
        if let Err(e) =
            platform::send_notification("droptidy", &format!("{} → {}", name, moved.category))
        {
            tracing::debug!("notification failed: {e}");
        }
    });

    let mut service = WatchService::new(Arc::new(sorter));
    service.start().map_err(|e| e.to_string())?;

    OutputFormatter::info(&format!(
        "Watching {} (debounce {}s). Press Ctrl-C to stop.",
        watch_folder.display(),
        config.debounce_seconds
    ));

    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}

/// One-shot sweep over the folder with a progress bar.
fn run_sweep(config: &Config) -> Result<(), String> {
    let watch_folder = config.watch_folder();
    let eligible = count_eligible(&watch_folder)?;
    if eligible == 0 {
        OutputFormatter::info("Nothing to sort.");
        return Ok(());
    }

    let pb = OutputFormatter::create_progress_bar(eligible as u64);
    let bar = pb.clone();

    let mut sorter = build_sorter(config);
    sorter.set_move_hook(move |moved| {
        bar.set_message(moved.category.clone());
        bar.inc(1);
    });

    let outcome = sorter.reorganize_all().map_err(|e| e.to_string())?;
    pb.finish_and_clear();

    OutputFormatter::success(&format!(
        "Sorted {} {}",
        outcome.moved,
        if outcome.moved == 1 { "file" } else { "files" }
    ));

    if outcome.errors.is_empty() {
        Ok(())
    } else {
        for error in &outcome.errors {
            OutputFormatter::error(&error.to_string());
        }
        Err("Some files could not be sorted".to_string())
    }
}

fn run_open(config: &Config) -> Result<(), String> {
    platform::reveal_in_file_manager(&config.watch_folder())
        .map_err(|e| format!("Could not open file manager: {}", e))
}

/// Counts direct non-hidden, non-directory children — the files a sweep
/// would touch. Used to size the progress bar.
fn count_eligible(folder: &std::path::Path) -> Result<usize, String> {
    let entries = std::fs::read_dir(folder)
        .map_err(|e| format!("Error reading directory {}: {}", folder.display(), e))?;

    let count = entries
        .flatten()
        .filter(|entry| {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            is_file && !hidden
        })
        .count();
    Ok(count)
}
