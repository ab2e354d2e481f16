// IntuneLens - app/monitor.rs
//
// Live monitoring: the surface the UI collaborator drives. Combines the
// `Ingestor` (load + snapshot) with a `FileWatcher` (change notification).
//
// Architecture:
//   - `LogMonitor` lives on the UI thread. `open` loads synchronously and
//     then arms the watcher for the same path.
//   - The watcher callback only sends a trigger over an mpsc channel to a
//     per-session reload thread, so the notification thread never blocks on
//     file I/O.
//   - The reload thread drains every queued trigger before each pass, so a
//     burst of writes collapses into one re-ingestion.
//   - Results are published as `MonitorEvent`s on a second channel that the
//     UI drains with `poll_events`.
//   - Disarming drops the watch handle, which drops the trigger sender and
//     lets the reload thread exit. A reload still queued for an old file is
//     discarded by the ingestor's generation check.

use crate::app::ingest::Ingestor;
use crate::app::watcher::{self, ChangeCallback, FileWatcher, WatchBackend};
use crate::core::model::{MonitorEvent, Snapshot};
use crate::core::store::LoadResult;
use crate::platform::config::AppConfig;
use crate::util::error::{LoadError, WatchError};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Load-and-watch coordinator for a single log file at a time.
pub struct LogMonitor {
    ingestor: Arc<Ingestor>,
    watcher: FileWatcher,
    auto_refresh: bool,
    events_tx: mpsc::Sender<MonitorEvent>,
    events_rx: mpsc::Receiver<MonitorEvent>,
}

impl LogMonitor {
    /// Build a monitor using the backend and auto-refresh setting from config.
    pub fn new(config: &AppConfig) -> Self {
        let backend = watcher::backend_for(
            config.watch_backend,
            Duration::from_millis(config.poll_interval_ms),
        );
        Self::with_backend(backend, config.auto_refresh)
    }

    pub fn with_backend(backend: Box<dyn WatchBackend>, auto_refresh: bool) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            ingestor: Arc::new(Ingestor::new()),
            watcher: FileWatcher::new(backend),
            auto_refresh,
            events_tx,
            events_rx,
        }
    }

    /// Load `path` and, when auto-refresh is on, start monitoring it.
    ///
    /// A load failure is returned and leaves both the previous snapshot and
    /// any existing watch untouched. A watch failure is logged and leaves
    /// monitoring off; the load result is still returned.
    pub fn open(&mut self, path: &Path) -> Result<LoadResult, LoadError> {
        let result = self.ingestor.load(path)?;
        if self.auto_refresh {
            if let Err(e) = self.arm(path) {
                tracing::warn!(
                    file = %path.display(),
                    error = %e,
                    "Live monitoring unavailable; continuing without it"
                );
            }
        }
        Ok(result)
    }

    /// Re-read the current file on demand. `None` if nothing is loaded.
    pub fn reload(&self) -> Option<Result<LoadResult, LoadError>> {
        let path = self.ingestor.current_path()?;
        Some(self.ingestor.load(&path))
    }

    /// Switch live monitoring on or off for the current file.
    pub fn set_auto_refresh(&mut self, enabled: bool) -> Result<(), WatchError> {
        self.auto_refresh = enabled;
        if !enabled {
            self.disarm();
            return Ok(());
        }
        match self.ingestor.current_path() {
            Some(path) if !self.is_monitoring() => self.arm(&path),
            _ => Ok(()),
        }
    }

    /// Stop live monitoring (the loaded snapshot stays).
    pub fn disarm(&mut self) {
        if self.watcher.is_armed() {
            self.watcher.disarm();
            let _ = self.events_tx.send(MonitorEvent::WatchStopped);
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.watcher.is_armed()
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// The latest snapshot. Consumers hold the `Arc`; it never changes
    /// underneath them.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.ingestor.current()
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.ingestor.current_path()
    }

    /// Drain at most `max` pending events without blocking.
    pub fn poll_events(&self, max: usize) -> Vec<MonitorEvent> {
        let mut events = Vec::with_capacity(max.min(8));
        while events.len() < max {
            match self.events_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }

    /// Block up to `timeout` for the next event.
    pub fn wait_event(&self, timeout: Duration) -> Option<MonitorEvent> {
        self.events_rx.recv_timeout(timeout).ok()
    }

    fn arm(&mut self, path: &Path) -> Result<(), WatchError> {
        let (trigger_tx, trigger_rx) = mpsc::channel::<()>();
        let generation = self.ingestor.generation();
        let ingestor = Arc::clone(&self.ingestor);
        let events_tx = self.events_tx.clone();
        let reload_path = path.to_path_buf();

        let on_change: ChangeCallback = Arc::new(move || {
            let _ = trigger_tx.send(());
        });

        // Replaces (and releases) any previous session.
        let was_armed = self.watcher.is_armed();
        if let Err(e) = self.watcher.arm(path, on_change) {
            if was_armed {
                let _ = self.events_tx.send(MonitorEvent::WatchStopped);
            }
            return Err(e);
        }

        let spawned = std::thread::Builder::new()
            .name("intunelens-reload".to_string())
            .spawn(move || run_reload_loop(trigger_rx, ingestor, generation, reload_path, events_tx));
        if let Err(e) = spawned {
            self.watcher.disarm();
            if was_armed {
                let _ = self.events_tx.send(MonitorEvent::WatchStopped);
            }
            return Err(WatchError::Spawn {
                path: path.to_path_buf(),
                source: e,
            });
        }

        let _ = self.events_tx.send(MonitorEvent::WatchStarted {
            path: path.to_path_buf(),
        });
        Ok(())
    }
}

/// Reload thread for one watch session. Exits when the session's trigger
/// sender is dropped, the file it was armed for is no longer current, or the
/// monitor has gone away.
fn run_reload_loop(
    triggers: mpsc::Receiver<()>,
    ingestor: Arc<Ingestor>,
    generation: u64,
    path: PathBuf,
    events_tx: mpsc::Sender<MonitorEvent>,
) {
    while triggers.recv().is_ok() {
        // Coalesce everything that queued up while the last pass ran.
        let mut coalesced = 0usize;
        while triggers.try_recv().is_ok() {
            coalesced += 1;
        }
        tracing::debug!(file = %path.display(), coalesced, "Change detected; reloading");

        let event = match ingestor.reload_if_current(generation) {
            None => {
                tracing::debug!(file = %path.display(), "Stale reload dropped");
                return;
            }
            Some(Ok(result)) => {
                if result.new_errors {
                    tracing::warn!(
                        file = %path.display(),
                        new = result.new_error_delta,
                        total_errors = result.snapshot.error_count(),
                        "New errors detected"
                    );
                }
                MonitorEvent::Reloaded {
                    snapshot: result.snapshot,
                    new_errors: result.new_errors,
                    new_error_delta: result.new_error_delta,
                }
            }
            Some(Err(e)) => MonitorEvent::ReloadFailed {
                path: path.clone(),
                message: e.to_string(),
            },
        };

        if events_tx.send(event).is_err() {
            return;
        }
    }
    tracing::debug!(file = %path.display(), "Reload thread exiting");
}
