//! File-backed session coordination.
//!
//! Every hook firing is its own short-lived process, so the only thing
//! two invocations can share is the filesystem. For each session id the
//! store keeps at most two files in one directory:
//!
//! ```text
//! <dir>/<stem>.init    marker: session initialization already ran
//! <dir>/<stem>.spoken  fingerprint of the last text spoken
//! ```
//!
//! Files older than the retention window are treated as absent and are
//! deleted by [`SessionStore::sweep`]. Age is always the file's mtime,
//! never mere existence, so a marker created a moment ago by another
//! process survives any concurrent sweep.
//!
//! Coordination is advisory. Two processes racing on a brand-new session
//! may both decide to initialize or to speak; everything guarded here is
//! idempotent, so the worst case is a repeat, never corruption.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::session::SessionId;
use crate::text::fingerprint;

/// How long markers and records stay meaningful.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

const INIT_EXT: &str = "init";
const SPOKEN_EXT: &str = "spoken";
const TEMP_EXT: &str = "tmp";

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files deleted because they outlived the retention window
    pub removed: usize,
    /// Expired files that could not be deleted
    pub failed: usize,
}

enum Eviction {
    Removed,
    Kept,
    Failed,
}

/// Per-session markers stored under one directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    retention: Duration,
}

impl SessionStore {
    /// Creates a store rooted at `dir` with the default 24h retention.
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention: DEFAULT_RETENTION,
        }
    }

    /// Overrides the retention window.
    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn marker_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir
            .join(format!("{}.{INIT_EXT}", session_id.file_stem()))
    }

    fn record_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir
            .join(format!("{}.{SPOKEN_EXT}", session_id.file_stem()))
    }

    fn ensure_dir(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|source| CoreError::StateDir {
            path: self.dir.clone(),
            source,
        })
    }

    /// True if `modified` is older than the retention window at `now`.
    ///
    /// Timestamps in the future (clock skew) never count as expired.
    fn is_expired(&self, modified: SystemTime, now: SystemTime) -> bool {
        now.duration_since(modified)
            .map(|age| age > self.retention)
            .unwrap_or(false)
    }

    /// True if `path` exists and is still inside the retention window.
    fn is_live(&self, path: &Path) -> bool {
        match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => !self.is_expired(modified, SystemTime::now()),
            Err(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // Session-start idempotency
    // ------------------------------------------------------------------

    /// Returns true if initialization has not yet run for this session.
    ///
    /// An unknown (empty) session id always returns true: without an
    /// identifier there is nothing to coordinate on.
    pub fn should_initialize(&self, session_id: &SessionId) -> bool {
        if session_id.is_unknown() {
            debug!("No session id, coordination disabled");
            return true;
        }
        !self.is_live(&self.marker_path(session_id))
    }

    /// Records that initialization ran for this session.
    ///
    /// Creation is exclusive; a marker that already exists counts as
    /// success. An expired marker that has not been swept yet is replaced
    /// so the new session window starts now.
    pub fn record_initialized(&self, session_id: &SessionId) -> CoreResult<()> {
        if session_id.is_unknown() {
            return Ok(());
        }
        self.ensure_dir()?;

        let path = self.marker_path(session_id);
        match create_exclusive(&path, session_id.as_str()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if self.is_live(&path) {
                    return Ok(());
                }
                remove_if_present(&path)?;
                match create_exclusive(&path, session_id.as_str()) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
                    Err(source) => Err(CoreError::Io {
                        action: "create",
                        path,
                        source,
                    }),
                }
            }
            Err(source) => Err(CoreError::Io {
                action: "create",
                path,
                source,
            }),
        }
    }

    /// Atomically tests and sets the initialization marker.
    ///
    /// Returns true for exactly one caller per live marker: the process
    /// whose exclusive create succeeded. If the marker cannot be written at
    /// all the caller is told to initialize anyway, since skipping the
    /// side effect is worse than repeating it.
    pub fn claim_initialization(&self, session_id: &SessionId) -> bool {
        if session_id.is_unknown() {
            debug!("No session id, coordination disabled");
            return true;
        }
        if let Err(e) = self.ensure_dir() {
            warn!(error = %e, "Cannot prepare state directory");
            return true;
        }

        let path = self.marker_path(session_id);
        for _ in 0..2 {
            match create_exclusive(&path, session_id.as_str()) {
                Ok(()) => return true,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if self.is_live(&path) {
                        return false;
                    }
                    // Expired leftover: clear it and race for the new slot
                    if let Err(e) = remove_if_present(&path) {
                        warn!(error = %e, "Cannot remove expired marker");
                        return true;
                    }
                }
                Err(e) => {
                    warn!(
                        session_id = %session_id,
                        path = %path.display(),
                        error = %e,
                        "Cannot create session marker"
                    );
                    return true;
                }
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Speech de-duplication
    // ------------------------------------------------------------------

    /// Returns true if `text` is what was last spoken for this session.
    ///
    /// Comparison is on fingerprints of the normalized text.
    pub fn is_duplicate(&self, session_id: &SessionId, text: &str) -> bool {
        if session_id.is_unknown() {
            return false;
        }
        let path = self.record_path(session_id);
        if !self.is_live(&path) {
            return false;
        }
        match fs::read_to_string(&path) {
            Ok(stored) => stored.trim() == fingerprint(text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot read dedup record");
                false
            }
        }
    }

    /// Remembers `text` as the last thing spoken for this session.
    ///
    /// Only the most recent utterance is kept. The record is written to a
    /// temporary file and renamed into place so readers never observe a
    /// partial fingerprint.
    pub fn record(&self, session_id: &SessionId, text: &str) -> CoreResult<()> {
        if session_id.is_unknown() {
            return Ok(());
        }
        self.ensure_dir()?;

        let path = self.record_path(session_id);
        let temp = self.dir.join(format!(
            "{}.{SPOKEN_EXT}.{}.{TEMP_EXT}",
            session_id.file_stem(),
            process::id()
        ));

        fs::write(&temp, fingerprint(text)).map_err(|source| CoreError::Io {
            action: "write",
            path: temp.clone(),
            source,
        })?;

        fs::rename(&temp, &path).map_err(|source| {
            let _ = fs::remove_file(&temp);
            CoreError::Io {
                action: "rename",
                path: path.clone(),
                source,
            }
        })
    }

    // ------------------------------------------------------------------
    // Eviction
    // ------------------------------------------------------------------

    /// Deletes every marker, record and leftover temp file older than the
    /// retention window.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now())
    }

    /// Same as [`sweep`](Self::sweep) with an explicit notion of "now".
    pub fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(dir = %self.dir.display(), error = %e, "Cannot read state directory");
                }
                return report;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !is_state_file(&path) {
                continue;
            }
            match self.evict_if_expired(&path, now) {
                Eviction::Removed => report.removed += 1,
                Eviction::Kept => {}
                Eviction::Failed => report.failed += 1,
            }
        }

        if report.removed > 0 || report.failed > 0 {
            debug!(
                removed = report.removed,
                failed = report.failed,
                "Session state sweep complete"
            );
        }
        report
    }

    /// Deletes `path` if its mtime, read right before the removal, is
    /// outside the retention window at `now`.
    ///
    /// Another process may have replaced an expired marker with a fresh
    /// one since the directory was listed; that file is kept.
    fn evict_if_expired(&self, path: &Path, now: SystemTime) -> Eviction {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return Eviction::Kept,
        };
        if !self.is_expired(modified, now) {
            return Eviction::Kept;
        }
        match fs::remove_file(path) {
            Ok(()) => Eviction::Removed,
            // Another sweeper got there first
            Err(e) if e.kind() == io::ErrorKind::NotFound => Eviction::Kept,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot evict state file");
                Eviction::Failed
            }
        }
    }

    /// Runs a sweep on a detached thread.
    ///
    /// The handle may be dropped; process exit simply abandons the sweep.
    pub fn spawn_sweep(&self) -> thread::JoinHandle<SweepReport> {
        let store = self.clone();
        thread::spawn(move || store.sweep())
    }
}

fn create_exclusive(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(contents.as_bytes())
}

fn remove_if_present(path: &Path) -> CoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CoreError::Io {
            action: "remove",
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn is_state_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(INIT_EXT) | Some(SPOKEN_EXT) | Some(TEMP_EXT)
    )
}
