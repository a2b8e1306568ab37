/// Debounced file stabilization and move engine.
///
/// This module is the heart of the crate. Filesystem events feed a pending
/// set of recently active files; a periodic tick promotes files that have
/// been quiet for the debounce window into a move operation that resolves
/// the destination category folder and a collision-safe name, performs the
/// rename, and fires the move hook.
///
/// Waiting for the quiet period is what keeps in-progress downloads intact:
/// a file is only touched once nothing has written to it for the configured
/// window.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::category::ExtensionIndex;

/// Fixed fallback bucket for files whose extension matches no category.
pub const OTHER_CATEGORY: &str = "Other";

/// Errors that can occur while moving a file into its category folder.
#[derive(Debug)]
pub enum SortError {
    /// Failed to create a category directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file to its category directory. The source file is
    /// left in place.
    FileMoveFailed {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// The path has no usable file name component.
    InvalidFileName { path: PathBuf },
    /// The watched folder could not be listed during a sweep.
    WatchFolderUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for SortError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailed {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::InvalidFileName { path } => {
                write!(f, "Path has no file name: {}", path.display())
            }
            Self::WatchFolderUnreadable { path, source } => {
                write!(
                    f,
                    "Failed to read watched folder {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for SortError {}

/// Result type for sort operations.
pub type SortResult<T> = Result<T, SortError>;

/// A completed move: where the file ended up and which category claimed it.
#[derive(Debug, Clone)]
pub struct MovedFile {
    /// Final path of the file inside its category folder.
    pub path: PathBuf,
    /// Name of the category folder the file was moved into.
    pub category: String,
}

/// Result of a one-shot sweep over the watched folder.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Number of files successfully moved.
    pub moved: usize,
    /// Per-file failures; the sweep continues past them.
    pub errors: Vec<SortError>,
}

/// Hook invoked after each successful move, from inside the serialized move
/// path. Implementations must not block for long and must not call back
/// into the sorter.
pub type MoveHook = Box<dyn Fn(&MovedFile) + Send + Sync>;

/// Mutable engine state. Guarded by a single mutex so that pending-set
/// updates, collision probing, and renames never race each other.
struct SorterState {
    /// Files seen created in the watched folder, keyed to their last
    /// observed activity.
    pending: HashMap<PathBuf, Instant>,
}

/// Sorts files from a watched folder into category subfolders.
///
/// Event callbacks ([`record_created`](Self::record_created) /
/// [`record_modified`](Self::record_modified)) and the periodic
/// [`tick`](Self::tick) may run on different threads; the sorter serializes
/// them internally and can be shared behind an `Arc`.
pub struct FileSorter {
    watch_folder: PathBuf,
    index: ExtensionIndex,
    debounce: Duration,
    on_moved: Option<MoveHook>,
    state: Mutex<SorterState>,
}

impl FileSorter {
    /// Creates a sorter for `watch_folder` with the given classification
    /// index and debounce window.
    pub fn new(watch_folder: PathBuf, index: ExtensionIndex, debounce: Duration) -> Self {
        Self {
            watch_folder,
            index,
            debounce,
            on_moved: None,
            state: Mutex::new(SorterState {
                pending: HashMap::new(),
            }),
        }
    }

    /// Installs the hook invoked after every successful move. Call before
    /// sharing the sorter across threads.
    pub fn set_move_hook(&mut self, hook: impl Fn(&MovedFile) + Send + Sync + 'static) {
        self.on_moved = Some(Box::new(hook));
    }

    /// The folder this sorter watches.
    pub fn watch_folder(&self) -> &Path {
        &self.watch_folder
    }

    /// The configured quiet window.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Number of files currently waiting to stabilize.
    pub fn pending_count(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Records a file-creation event.
    ///
    /// Only direct children of the watched folder are tracked; events from
    /// subfolders (including the category folders this sorter creates) are
    /// ignored so already-sorted files are never re-processed. Hidden names
    /// (leading dot) are ignored too, which keeps editor temp files and
    /// partial-download sentinels out of the pending set.
    pub fn record_created(&self, path: &Path) {
        if path.parent() != Some(self.watch_folder.as_path()) {
            return;
        }
        if is_hidden(path) {
            return;
        }
        tracing::debug!(path = %path.display(), "tracking new file");
        self.lock_state()
            .pending
            .insert(path.to_path_buf(), Instant::now());
    }

    /// Records a file-modification event.
    ///
    /// Refreshes the quiet-window timer for files already pending. Paths not
    /// previously seen created are not added: modification alone does not
    /// make a file "new".
    pub fn record_modified(&self, path: &Path) {
        let mut state = self.lock_state();
        if let Some(last_seen) = state.pending.get_mut(path) {
            *last_seen = Instant::now();
        }
    }

    /// Moves every pending file whose quiet window has elapsed.
    ///
    /// Each due entry is removed from the pending set before its move is
    /// attempted, so a file gets at most one attempt per stabilization.
    /// Files that vanished in the meantime are skipped silently. Entries
    /// still inside their window are left for the next tick; this is a
    /// level-triggered poll, so the same file may be observed by several
    /// ticks before it stabilizes.
    ///
    /// Returns the move failures so the caller can surface them.
    pub fn tick(&self) -> Vec<SortError> {
        let mut state = self.lock_state();
        let now = Instant::now();

        let due: Vec<PathBuf> = state
            .pending
            .iter()
            .filter(|(_, last_seen)| now.duration_since(**last_seen) >= self.debounce)
            .map(|(path, _)| path.clone())
            .collect();

        let mut errors = Vec::new();
        for path in due {
            state.pending.remove(&path);

            if !path.exists() {
                tracing::debug!(path = %path.display(), "pending file vanished, skipping");
                continue;
            }

            if let Err(e) = self.do_move(&path) {
                errors.push(e);
            }
        }
        errors
    }

    /// Moves a single file into its category folder immediately.
    ///
    /// Resolves the category from the file's extension (unclassified
    /// extensions land in [`OTHER_CATEGORY`]), creates the destination
    /// folder if needed, picks a collision-free name, renames, and fires the
    /// move hook.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use droptidy::category::{CategoryRule, ExtensionIndex};
    /// use droptidy::sorter::FileSorter;
    /// use std::path::{Path, PathBuf};
    /// use std::time::Duration;
    ///
    /// let index = ExtensionIndex::build(&[CategoryRule::new("Images", &[".jpg"])]);
    /// let sorter = FileSorter::new(PathBuf::from("/downloads"), index, Duration::from_secs(2));
    ///
    /// match sorter.move_file(Path::new("/downloads/photo.jpg")) {
    ///     Ok(moved) => println!("Moved to {} ({})", moved.path.display(), moved.category),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn move_file(&self, path: &Path) -> SortResult<MovedFile> {
        let _state = self.lock_state();
        self.do_move(path)
    }

    /// Sweeps the watched folder once, moving every eligible file without
    /// waiting for a quiet window. Intended for files that are already fully
    /// written. Directories and hidden names are skipped.
    ///
    /// Returns how many files moved and any per-file failures.
    pub fn reorganize_all(&self) -> SortResult<SweepOutcome> {
        let _state = self.lock_state();

        let entries =
            fs::read_dir(&self.watch_folder).map_err(|e| SortError::WatchFolderUnreadable {
                path: self.watch_folder.clone(),
                source: e,
            })?;

        let mut outcome = SweepOutcome::default();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(true);
            if is_dir || is_hidden(&path) {
                continue;
            }

            match self.do_move(&path) {
                Ok(_) => outcome.moved += 1,
                Err(e) => outcome.errors.push(e),
            }
        }
        Ok(outcome)
    }

    /// Performs one move. Caller must hold the state lock: collision probing
    /// and folder creation are only race-free while moves are serialized.
    fn do_move(&self, path: &Path) -> SortResult<MovedFile> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        let category = ext
            .as_deref()
            .and_then(|e| self.index.category_for(e))
            .unwrap_or(OTHER_CATEGORY);

        let dest_folder = self.watch_folder.join(category);
        fs::create_dir_all(&dest_folder).map_err(|e| SortError::DirectoryCreationFailed {
            path: dest_folder.clone(),
            source: e,
        })?;

        let file_name = path.file_name().ok_or_else(|| SortError::InvalidFileName {
            path: path.to_path_buf(),
        })?;

        let mut dest_path = dest_folder.join(file_name);

        // Duplicate names get a numeric suffix: file.pdf -> file_1.pdf ->
        // file_2.pdf. The probe is sequential and unbounded; existence is
        // checked right before the rename below, which is the accepted
        // baseline against racing external writers.
        if dest_path.exists() {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string_lossy().into_owned());

            for counter in 1.. {
                let candidate = match ext.as_deref() {
                    Some(e) => format!("{}_{}.{}", stem, counter, e),
                    None => format!("{}_{}", stem, counter),
                };
                dest_path = dest_folder.join(candidate);
                if !dest_path.exists() {
                    break;
                }
            }
        }

        fs::rename(path, &dest_path).map_err(|e| SortError::FileMoveFailed {
            source: path.to_path_buf(),
            destination: dest_path.clone(),
            source_error: e,
        })?;

        let moved = MovedFile {
            path: dest_path,
            category: category.to_string(),
        };

        if let Some(hook) = &self.on_moved {
            hook(&moved);
        }

        Ok(moved)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SorterState> {
        // A poisoned lock means a previous move panicked; the pending set is
        // still structurally valid, so keep going rather than cascading.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// True when the final path component starts with a dot.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryRule, ExtensionIndex};
    use std::fs;
    use tempfile::TempDir;

    fn index() -> ExtensionIndex {
        ExtensionIndex::build(&[
            CategoryRule::new("Images", &[".jpg", ".png"]),
            CategoryRule::new("Documents", &[".pdf", ".txt"]),
        ])
    }

    fn sorter(dir: &TempDir, debounce: Duration) -> FileSorter {
        FileSorter::new(dir.path().to_path_buf(), index(), debounce)
    }

    #[test]
    fn test_move_file_into_category_folder() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        let source = dir.path().join("photo.jpg");
        fs::write(&source, b"jpeg").expect("write");

        let moved = sorter.move_file(&source).expect("move");
        assert_eq!(moved.category, "Images");
        assert_eq!(moved.path, dir.path().join("Images").join("photo.jpg"));
        assert!(moved.path.exists());
        assert!(!source.exists());
    }

    #[test]
    fn test_unclassified_extension_goes_to_other() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        let source = dir.path().join("data.xyz");
        fs::write(&source, b"?").expect("write");

        let moved = sorter.move_file(&source).expect("move");
        assert_eq!(moved.category, OTHER_CATEGORY);
        assert!(dir.path().join("Other").join("data.xyz").exists());
    }

    #[test]
    fn test_file_without_extension_goes_to_other() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        let source = dir.path().join("README");
        fs::write(&source, b"hi").expect("write");

        let moved = sorter.move_file(&source).expect("move");
        assert_eq!(moved.category, OTHER_CATEGORY);
        assert!(dir.path().join("Other").join("README").exists());
    }

    #[test]
    fn test_collision_appends_numeric_suffix() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        for content in ["first", "second", "third"] {
            let source = dir.path().join("a.txt");
            fs::write(&source, content).expect("write");
            sorter.move_file(&source).expect("move");
        }

        let docs = dir.path().join("Documents");
        assert!(docs.join("a.txt").exists());
        assert!(docs.join("a_1.txt").exists());
        assert!(docs.join("a_2.txt").exists());
        assert_eq!(
            fs::read_to_string(docs.join("a.txt")).expect("read"),
            "first"
        );
        assert_eq!(
            fs::read_to_string(docs.join("a_2.txt")).expect("read"),
            "third"
        );
    }

    #[test]
    fn test_collision_suffix_without_extension() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        for _ in 0..2 {
            let source = dir.path().join("Makefile");
            fs::write(&source, b"all:").expect("write");
            sorter.move_file(&source).expect("move");
        }

        assert!(dir.path().join("Other").join("Makefile").exists());
        assert!(dir.path().join("Other").join("Makefile_1").exists());
    }

    #[test]
    fn test_uppercase_extension_is_classified_and_suffix_lowercased() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        for _ in 0..2 {
            let source = dir.path().join("Photo.JPG");
            fs::write(&source, b"jpeg").expect("write");
            sorter.move_file(&source).expect("move");
        }

        let images = dir.path().join("Images");
        assert!(images.join("Photo.JPG").exists());
        // The suffixed name carries the lowercased extension.
        assert!(images.join("Photo_1.jpg").exists());
    }

    #[test]
    fn test_record_created_ignores_subfolder_paths() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        let nested = dir.path().join("Images").join("old.jpg");
        sorter.record_created(&nested);
        assert_eq!(sorter.pending_count(), 0);
    }

    #[test]
    fn test_record_created_ignores_hidden_files() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        sorter.record_created(&dir.path().join(".part.crdownload"));
        sorter.record_created(&dir.path().join(".DS_Store"));
        assert_eq!(sorter.pending_count(), 0);
    }

    #[test]
    fn test_record_modified_does_not_add_entries() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        sorter.record_modified(&dir.path().join("untracked.txt"));
        assert_eq!(sorter.pending_count(), 0);
    }

    #[test]
    fn test_tick_respects_debounce_window() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::from_millis(150));

        let source = dir.path().join("slow.pdf");
        fs::write(&source, b"pdf").expect("write");
        sorter.record_created(&source);

        // Inside the window: nothing happens, entry stays pending.
        let errors = sorter.tick();
        assert!(errors.is_empty());
        assert!(source.exists());
        assert_eq!(sorter.pending_count(), 1);

        std::thread::sleep(Duration::from_millis(200));
        let errors = sorter.tick();
        assert!(errors.is_empty());
        assert!(!source.exists());
        assert!(dir.path().join("Documents").join("slow.pdf").exists());
        assert_eq!(sorter.pending_count(), 0);
    }

    #[test]
    fn test_modification_refresh_postpones_move() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::from_millis(120));

        let source = dir.path().join("download.zip");
        fs::write(&source, b"zip").expect("write");
        sorter.record_created(&source);

        // Keep writing at intervals shorter than the window; the file must
        // never move while refreshes continue.
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(60));
            sorter.record_modified(&source);
            sorter.tick();
            assert!(source.exists(), "file moved while still being written");
        }

        std::thread::sleep(Duration::from_millis(160));
        sorter.tick();
        assert!(!source.exists());
    }

    #[test]
    fn test_tick_skips_vanished_files_silently() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        let source = dir.path().join("gone.txt");
        fs::write(&source, b"x").expect("write");
        sorter.record_created(&source);
        fs::remove_file(&source).expect("remove");

        let errors = sorter.tick();
        assert!(errors.is_empty());
        assert_eq!(sorter.pending_count(), 0);
    }

    #[test]
    fn test_tick_attempts_each_file_at_most_once() {
        let dir = TempDir::new().expect("tempdir");
        let mut sorter = sorter(&dir, Duration::ZERO);

        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        sorter.set_move_hook(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let source = dir.path().join("once.txt");
        fs::write(&source, b"x").expect("write");
        sorter.record_created(&source);

        sorter.tick();
        sorter.tick();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_move_hook_receives_destination_and_category() {
        let dir = TempDir::new().expect("tempdir");
        let mut sorter = sorter(&dir, Duration::ZERO);

        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        sorter.set_move_hook(move |moved| {
            sink.lock().unwrap().push((moved.path.clone(), moved.category.clone()));
        });

        let source = dir.path().join("pic.png");
        fs::write(&source, b"png").expect("write");
        sorter.move_file(&source).expect("move");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, dir.path().join("Images").join("pic.png"));
        assert_eq!(seen[0].1, "Images");
    }

    #[test]
    fn test_reorganize_all_counts_eligible_files_only() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        fs::write(dir.path().join("a.jpg"), b"1").expect("write");
        fs::write(dir.path().join("b.pdf"), b"2").expect("write");
        fs::write(dir.path().join("c.xyz"), b"3").expect("write");
        fs::write(dir.path().join(".hidden"), b"4").expect("write");
        fs::create_dir(dir.path().join("keepdir")).expect("mkdir");

        let outcome = sorter.reorganize_all().expect("sweep");
        assert_eq!(outcome.moved, 3);
        assert!(outcome.errors.is_empty());

        assert!(dir.path().join("Images").join("a.jpg").exists());
        assert!(dir.path().join("Documents").join("b.pdf").exists());
        assert!(dir.path().join("Other").join("c.xyz").exists());
        assert!(dir.path().join(".hidden").exists());
        assert!(dir.path().join("keepdir").exists());
    }

    #[test]
    fn test_reorganize_all_skips_existing_category_folders() {
        let dir = TempDir::new().expect("tempdir");
        let sorter = sorter(&dir, Duration::ZERO);

        fs::create_dir(dir.path().join("Images")).expect("mkdir");
        fs::write(dir.path().join("Images").join("sorted.jpg"), b"1").expect("write");
        fs::write(dir.path().join("new.jpg"), b"2").expect("write");

        let outcome = sorter.reorganize_all().expect("sweep");
        assert_eq!(outcome.moved, 1);
        // The already-sorted file stayed where it was.
        assert!(dir.path().join("Images").join("sorted.jpg").exists());
        assert!(dir.path().join("Images").join("new.jpg").exists());
    }

    #[test]
    fn test_reorganize_all_on_missing_folder_is_error() {
        let sorter = FileSorter::new(
            PathBuf::from("/definitely/not/here"),
            index(),
            Duration::ZERO,
        );
        let result = sorter.reorganize_all();
        assert!(matches!(
            result,
            Err(SortError::WatchFolderUnreadable { .. })
        ));
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(Path::new("/d/.DS_Store")));
        assert!(!is_hidden(Path::new("/d/file.txt")));
    }
}
