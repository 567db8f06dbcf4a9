//! Lifecycle tests for the file-backed session store.
//!
//! Each test builds fresh `SessionStore` handles over one temp directory to
//! mimic independent hook processes that share nothing but the filesystem.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use parrot_core::{SessionId, SessionStore, DEFAULT_RETENTION};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn fresh_process(dir: &TempDir) -> SessionStore {
    SessionStore::new(dir.path().join("sessions"))
}

fn age_all(dir: &TempDir, by: Duration) {
    let past = FileTime::from_system_time(SystemTime::now() - by);
    for entry in std::fs::read_dir(dir.path().join("sessions")).unwrap() {
        filetime::set_file_mtime(entry.unwrap().path(), past).unwrap();
    }
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_initialization_true_exactly_once_then_again_after_eviction() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let id = SessionId::new("s1");

    // Invocation 1: session start
    let first = fresh_process(&dir);
    assert!(first.should_initialize(&id));
    first.record_initialized(&id).unwrap();

    // Invocations 2..5: later hooks of the same session
    for _ in 0..4 {
        assert!(!fresh_process(&dir).should_initialize(&id));
    }

    // A day passes, some invocation sweeps
    age_all(&dir, DEFAULT_RETENTION + Duration::from_secs(1));
    let report = fresh_process(&dir).sweep();
    assert_eq!(report.removed, 1);

    assert!(fresh_process(&dir).should_initialize(&id));
}

#[test]
fn test_concurrent_claims_have_single_winner() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let id = SessionId::new("racy-session");
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let store = fresh_process(&dir);
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.claim_initialization(&id)
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

#[test]
fn test_sweep_concurrent_with_new_marker_keeps_it() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let stale = SessionId::new("yesterday");
    let store = fresh_process(&dir);
    store.record_initialized(&stale).unwrap();
    age_all(&dir, DEFAULT_RETENTION * 2);

    let sweeper = fresh_process(&dir).spawn_sweep();
    let brand_new = SessionId::new("just-started");
    store.record_initialized(&brand_new).unwrap();
    sweeper.join().unwrap();

    assert!(fresh_process(&dir).should_initialize(&stale));
    assert!(!fresh_process(&dir).should_initialize(&brand_new));
}

// ============================================================================
// De-duplication
// ============================================================================

#[test]
fn test_duplicate_first_repeat_and_interleaved() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let id = SessionId::new("s1");

    let p1 = fresh_process(&dir);
    assert!(!p1.is_duplicate(&id, "A"));
    p1.record(&id, "A").unwrap();

    // Second terminal event for the same turn
    assert!(fresh_process(&dir).is_duplicate(&id, "A"));

    let p3 = fresh_process(&dir);
    assert!(!p3.is_duplicate(&id, "B"));
    p3.record(&id, "B").unwrap();

    assert!(!fresh_process(&dir).is_duplicate(&id, "A"));
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = fresh_process(&dir);
    let id = SessionId::new("s1");
    for text in ["one", "two", "three"] {
        store.record(&id, text).unwrap();
    }

    let names: Vec<String> = std::fs::read_dir(dir.path().join("sessions"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["s1.spoken".to_string()]);
}
