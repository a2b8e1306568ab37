//! droptidy - keep a downloads folder tidy, automatically
//!
//! This library watches a single folder for new files, waits for each file
//! to finish writing (debounce), then moves it into a category subfolder
//! chosen by extension, with collision-safe naming. The engine is exposed
//! directly so it can also run one-shot sweeps without a watcher.

pub mod category;
pub mod cli;
pub mod config;
pub mod output;
pub mod platform;
pub mod sorter;
pub mod watcher;

pub use category::{CategoryRule, ExtensionIndex};
pub use config::{Config, ConfigError};
pub use sorter::{FileSorter, MovedFile, SortError, SortResult, SweepOutcome};
pub use watcher::{WatchService, WatcherError};

pub use cli::{Cli, run};
