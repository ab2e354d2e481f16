// IntuneLens - app/watcher.rs
//
// File watcher: observes one log file for writes, truncation and
// replacement, and invokes a callback on every qualifying change.
//
// Architecture:
//   - `WatchBackend` is the capability `watch(path, on_change) -> handle`.
//     Dropping the returned `WatchHandle` releases the OS resource.
//   - `NotifyBackend` uses kernel change queues through the `notify` crate.
//     It watches the parent directory (non-recursive) and filters on the
//     file name, so a log that is rotated or replaced by rename keeps
//     producing events for the new file.
//   - `PollBackend` runs a background thread comparing size and mtime on a
//     fixed interval; an `Arc<AtomicBool>` cancel flag stops it and the
//     handle joins the thread on drop.
//   - `FallbackBackend` tries the kernel backend first and polls if that
//     cannot be set up.
//   - `FileWatcher` owns at most one `WatchSession`; arming always tears
//     down the previous session first.
//
// The callback runs on the backend's notification thread and must not block
// for long; `app::monitor` only enqueues a reload trigger from it.

use crate::core::model::WatchBackendKind;
use crate::util::constants::{DEFAULT_WATCH_POLL_INTERVAL_MS, WATCH_CANCEL_CHECK_INTERVAL_MS};
use crate::util::error::WatchError;
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

/// Callback fired (fire-and-forget) on each qualifying file change.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

// =============================================================================
// Backend capability
// =============================================================================

/// A live OS-level observation. Dropping it releases the underlying
/// resource (inotify/FSEvents watch, or the poll thread).
pub trait WatchHandle: Send {
    /// The file being observed.
    fn path(&self) -> &Path;
}

/// Something that can observe a file path for changes.
pub trait WatchBackend: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Start observing `path`; `on_change` is invoked for every qualifying
    /// event until the returned handle is dropped.
    fn watch(
        &self,
        path: &Path,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>, WatchError>;
}

/// Build the backend selected in config. `Notify` falls back to polling
/// when the kernel watch cannot be established.
pub fn backend_for(kind: WatchBackendKind, poll_interval: Duration) -> Box<dyn WatchBackend> {
    match kind {
        WatchBackendKind::Notify => Box::new(FallbackBackend {
            primary: Box::new(NotifyBackend),
            fallback: Box::new(PollBackend::new(poll_interval)),
        }),
        WatchBackendKind::Poll => Box::new(PollBackend::new(poll_interval)),
    }
}

// =============================================================================
// Kernel notification backend
// =============================================================================

/// Kernel change-queue backend (`notify::RecommendedWatcher`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend;

struct NotifyHandle {
    path: PathBuf,
    // Dropping the watcher removes the kernel watch and stops its thread.
    _watcher: RecommendedWatcher,
}

impl WatchHandle for NotifyHandle {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl WatchBackend for NotifyBackend {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn watch(
        &self,
        path: &Path,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        let file_name: OsString = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| WatchError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "watched path has no file name",
                ),
            })?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let target = path.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if ours && is_qualifying(&event.kind) {
                        tracing::trace!(kind = ?event.kind, "Watched file changed");
                        on_change();
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %target.display(), error = %e, "File watch error");
                }
            }
        })
        .map_err(|e| WatchError::Backend {
            path: path.to_path_buf(),
            source: e,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Backend {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Box::new(NotifyHandle {
            path: path.to_path_buf(),
            _watcher: watcher,
        }))
    }
}

/// Writes, extension, truncation, the file being created or renamed into
/// place, and its removal (the reload then reports the read failure). Pure
/// reads and metadata-only changes are ignored.
fn is_qualifying(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Remove(_)
    )
}

// =============================================================================
// Polling backend
// =============================================================================

/// Polls file size and mtime on a background thread.
#[derive(Debug, Clone, Copy)]
pub struct PollBackend {
    interval: Duration,
}

impl PollBackend {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for PollBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_WATCH_POLL_INTERVAL_MS))
    }
}

struct PollHandle {
    path: PathBuf,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle for PollHandle {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            // Joining from the poll thread itself (a callback that disarms)
            // would deadlock; the cancel flag is enough there.
            if thread.thread().id() != std::thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

/// What the poll loop compares between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

fn stamp(path: &Path) -> std::io::Result<FileStamp> {
    let m = std::fs::metadata(path)?;
    Ok(FileStamp {
        len: m.len(),
        modified: m.modified().ok(),
    })
}

impl WatchBackend for PollBackend {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn watch(
        &self,
        path: &Path,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        let initial = stamp(path).map_err(|e| WatchError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = Arc::clone(&cancel);
        let thread_path = path.to_path_buf();
        let interval = self.interval;

        let thread = std::thread::Builder::new()
            .name("intunelens-poll".to_string())
            .spawn(move || run_poll_loop(thread_path, initial, interval, on_change, thread_cancel))
            .map_err(|e| WatchError::Spawn {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Box::new(PollHandle {
            path: path.to_path_buf(),
            cancel,
            thread: Some(thread),
        }))
    }
}

/// Background poll loop. Fires when the file grows, shrinks (truncation or
/// rotation), gets a new mtime, or reappears after being missing.
fn run_poll_loop(
    path: PathBuf,
    initial: FileStamp,
    interval: Duration,
    on_change: ChangeCallback,
    cancel: Arc<AtomicBool>,
) {
    let check = Duration::from_millis(WATCH_CANCEL_CHECK_INTERVAL_MS);
    let slices = u32::try_from((interval.as_millis() / check.as_millis()).max(1))
        .unwrap_or(u32::MAX);
    let slice = interval / slices;

    let mut last: Option<FileStamp> = Some(initial);
    tracing::debug!(file = %path.display(), "Poll watcher running");

    loop {
        for _ in 0..slices {
            std::thread::sleep(slice);
            if cancel.load(Ordering::SeqCst) {
                tracing::debug!(file = %path.display(), "Poll watcher stopped");
                return;
            }
        }

        match stamp(&path) {
            Ok(current) => {
                if last != Some(current) {
                    if let Some(prev) = last {
                        if current.len < prev.len {
                            tracing::info!(
                                file = %path.display(),
                                old_len = prev.len,
                                new_len = current.len,
                                "File truncated or rotated"
                            );
                        }
                    }
                    last = Some(current);
                    on_change();
                }
            }
            Err(e) => {
                // Missing mid-rotation; the next successful stat fires.
                if last.is_some() {
                    tracing::debug!(file = %path.display(), error = %e, "Watched file unavailable");
                }
                last = None;
            }
        }
    }
}

// =============================================================================
// Fallback backend
// =============================================================================

/// Tries `primary`, then `fallback` if the primary cannot start.
pub struct FallbackBackend {
    pub primary: Box<dyn WatchBackend>,
    pub fallback: Box<dyn WatchBackend>,
}

impl WatchBackend for FallbackBackend {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn watch(
        &self,
        path: &Path,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        match self.primary.watch(path, Arc::clone(&on_change)) {
            Ok(handle) => Ok(handle),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    error = %e,
                    backend = self.primary.name(),
                    fallback = self.fallback.name(),
                    "Watch backend unavailable; falling back"
                );
                self.fallback.watch(path, on_change)
            }
        }
    }
}

// =============================================================================
// FileWatcher
// =============================================================================

/// An armed watch: one path and its live OS handle.
pub struct WatchSession {
    handle: Box<dyn WatchHandle>,
}

impl WatchSession {
    pub fn path(&self) -> &Path {
        self.handle.path()
    }
}

/// Owns at most one active `WatchSession`.
pub struct FileWatcher {
    backend: Box<dyn WatchBackend>,
    session: Option<WatchSession>,
}

impl FileWatcher {
    pub fn new(backend: Box<dyn WatchBackend>) -> Self {
        Self {
            backend,
            session: None,
        }
    }

    /// Watch `path`, replacing any current session.
    ///
    /// The old session is released before the new one is requested, so at
    /// most one OS handle exists at any time. On error no session is active.
    pub fn arm(&mut self, path: &Path, on_change: ChangeCallback) -> Result<(), WatchError> {
        self.disarm();

        let handle = self.backend.watch(path, on_change)?;
        tracing::info!(
            file = %path.display(),
            backend = self.backend.name(),
            "File monitoring started"
        );
        self.session = Some(WatchSession { handle });
        Ok(())
    }

    /// Release the current session, if any.
    pub fn disarm(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(file = %session.path().display(), "File monitoring stopped");
            drop(session);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.session.is_some()
    }

    pub fn watched_path(&self) -> Option<&Path> {
        self.session.as_ref().map(WatchSession::path)
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.disarm();
    }
}
