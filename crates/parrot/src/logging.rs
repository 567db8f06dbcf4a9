//! Tracing setup.
//!
//! Hook invocations run inside the assistant host, which owns stdout and
//! stderr, so they log to a file. Interactive commands log to stderr.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset, empty or unparseable.
const DEFAULT_DIRECTIVES: &[&str] = &[
    "parrot=info",
    "parrot_cli=info",
    "parrot_core=info",
    "parrot_protocol=info",
];

fn env_filter() -> EnvFilter {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn filter_from(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|spec| !spec.trim().is_empty())
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES.join(",")))
}

/// Opens the log file in append mode, creating its directory.
///
/// Returns `None` if any step fails; logging is then disabled.
fn create_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// File logging for hook invocations. Silent if the file can't be opened.
pub fn init_file(path: &Path) {
    let Some(file) = create_log_file(path) else {
        return;
    };

    // Wrap in Mutex for thread-safe writes from the sweep thread
    let writer = Mutex::new(file);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}

/// Stderr logging for interactive commands.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::Directive;

    #[test]
    fn test_default_directives_parse() {
        for directive in DEFAULT_DIRECTIVES {
            assert!(directive.parse::<Directive>().is_ok(), "{directive}");
        }
    }

    #[test]
    fn test_rust_log_target_directive_survives() {
        let filter = filter_from(Some("parrot_cli=debug")).to_string();
        assert!(filter.contains("parrot_cli=debug"), "{filter}");
        assert!(!filter.contains("parrot_cli=info"), "{filter}");
    }

    #[test]
    fn test_defaults_without_rust_log() {
        for rust_log in [None, Some("  "), Some("parrot_cli=loud")] {
            let filter = filter_from(rust_log).to_string();
            assert!(filter.contains("parrot_cli=info"), "{filter}");
            assert!(!filter.contains("debug"), "{filter}");
        }
    }

    #[test]
    fn test_create_log_file_makes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/parrot.log");
        assert!(create_log_file(&path).is_some());
        assert!(path.exists());
    }
}
