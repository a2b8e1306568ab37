//! Filesystem event delivery and the periodic tick driver.
//!
//! [`WatchService`] glues the `notify` watcher to a [`FileSorter`]: a
//! background subscription pushes creation/modification events into the
//! sorter's pending set, while a separate timer thread drives the
//! stabilization tick once per second. Both run until [`stop`] is called,
//! which quiesces event delivery before returning.
//!
//! [`stop`]: WatchService::stop

use notify::event::EventKind;
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

use crate::sorter::FileSorter;

/// How often the tick thread sweeps the pending set.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur in the watch service.
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    WatcherCreation(#[from] notify::Error),

    #[error("Failed to watch path {path}: {source}")]
    WatchPath {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Runs a [`FileSorter`] against live filesystem events.
///
/// The watched folder is monitored non-recursively; files appearing in
/// subfolders (including the category folders the sorter creates) never
/// produce events, and the sorter ignores them anyway.
pub struct WatchService {
    sorter: Arc<FileSorter>,
    watcher: Option<RecommendedWatcher>,
    running: Arc<AtomicBool>,
    event_thread: Option<JoinHandle<()>>,
    tick_thread: Option<JoinHandle<()>>,
}

impl WatchService {
    pub fn new(sorter: Arc<FileSorter>) -> Self {
        Self {
            sorter,
            watcher: None,
            running: Arc::new(AtomicBool::new(false)),
            event_thread: None,
            tick_thread: None,
        }
    }

    /// Starts event delivery and the tick loop.
    ///
    /// # Errors
    ///
    /// Fails if the native watcher cannot be created or the watch folder
    /// cannot be subscribed (missing folder, permissions).
    pub fn start(&mut self) -> Result<(), WatcherError> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let _ = tx.send(res);
            },
            NotifyConfig::default(),
        )?;

        let watch_folder = self.sorter.watch_folder().to_path_buf();
        watcher
            .watch(&watch_folder, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::WatchPath {
                path: watch_folder.clone(),
                source: e,
            })?;
        self.watcher = Some(watcher);
        self.running.store(true, Ordering::SeqCst);

        // Event thread: drains until the watcher is dropped and the channel
        // closes.
        let sorter = self.sorter.clone();
        self.event_thread = Some(std::thread::spawn(move || {
            for result in rx {
                match result {
                    Ok(event) => dispatch(&sorter, event),
                    Err(e) => tracing::warn!("watch error: {e}"),
                }
            }
        }));

        // Tick thread: level-triggered sweep of the pending set.
        let sorter = self.sorter.clone();
        let running = self.running.clone();
        self.tick_thread = Some(std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                for error in sorter.tick() {
                    tracing::error!("{error}");
                }
                std::thread::sleep(TICK_INTERVAL);
            }
        }));

        tracing::info!(folder = %watch_folder.display(), "watching for new files");
        Ok(())
    }

    /// Stops both background threads and waits for them to finish.
    ///
    /// Dropping the watcher closes the event channel, so the event thread
    /// has fully quiesced by the time this returns. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the watcher tears down the OS subscription and closes
        // the channel sender.
        self.watcher.take();

        if let Some(handle) = self.event_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.tick_thread.take() {
            let _ = handle.join();
        }
    }

    /// The sorter this service drives.
    pub fn sorter(&self) -> &Arc<FileSorter> {
        &self.sorter
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Routes one raw notify event into the sorter.
///
/// Creations of non-directory paths enter the pending set; modifications
/// refresh pending timers. Everything else (removals, renames, metadata
/// churn) is irrelevant to stabilization and ignored.
fn dispatch(sorter: &FileSorter, event: Event) {
    match event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                if !path.is_dir() {
                    sorter.record_created(path);
                }
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                sorter.record_modified(path);
            }
        }
        _ => {}
    }
}
