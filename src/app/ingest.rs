// IntuneLens - app/ingest.rs
//
// Ingestion: read a log file from disk and rebuild the record store from
// its full content.
//
// All passes go through one `Mutex`, so at most one read+parse runs at a
// time; a file-change reload and a caller-initiated open simply queue on
// the lock. A failed read returns before the store is touched, leaving the
// previous snapshot current.

use crate::core::model::Snapshot;
use crate::core::store::{LoadResult, RecordStore};
use crate::platform::fs;
use crate::util::error::LoadError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[derive(Debug, Default)]
struct IngestState {
    store: RecordStore,
    current_path: Option<PathBuf>,
    /// Bumped whenever a different file becomes current. Change-triggered
    /// reloads carry the generation they were armed for and are discarded
    /// once it is stale.
    generation: u64,
}

/// Serialised owner of the record store for the currently loaded file.
#[derive(Debug, Default)]
pub struct Ingestor {
    state: Mutex<IngestState>,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IngestState> {
        // A panic mid-pass cannot leave a torn snapshot (it is swapped in
        // whole), so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read `path` and replace the snapshot with its parsed content.
    ///
    /// Loading a different path than the current one resets the new-errors
    /// baseline, so the first load of every file never raises the signal.
    pub fn load(&self, path: &Path) -> Result<LoadResult, LoadError> {
        let mut state = self.lock();
        load_locked(&mut state, path)
    }

    /// Re-read the current file, unless a different file has been loaded
    /// since `generation` was observed. Returns `None` when stale or when
    /// nothing has been loaded yet.
    pub fn reload_if_current(&self, generation: u64) -> Option<Result<LoadResult, LoadError>> {
        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        let path = state.current_path.clone()?;
        Some(load_locked(&mut state, &path))
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.lock().store.snapshot()
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock().current_path.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}

fn load_locked(state: &mut IngestState, path: &Path) -> Result<LoadResult, LoadError> {
    let started = Instant::now();

    let content = match fs::read_log_file(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "Log file load failed");
            return Err(e);
        }
    };

    if state.current_path.as_deref() != Some(path) {
        state.store.reset();
        state.current_path = Some(path.to_path_buf());
        state.generation += 1;
    }

    let result = state.store.load(&content);

    tracing::info!(
        file = %path.display(),
        bytes = content.len(),
        total = result.snapshot.total(),
        errors = result.snapshot.error_count(),
        warnings = result.snapshot.warning_count(),
        skipped = result.skipped_lines,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Log file loaded"
    );

    Ok(result)
}
