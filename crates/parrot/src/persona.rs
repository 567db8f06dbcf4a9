//! Persona profiles: named Markdown files copied into a host's
//! active-instructions file.
//!
//! ```text
//! <persona_dir>/<name>.md   the profile
//! <workdir>/<target>        the applied copy (target depends on the host)
//! ```

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{PersonaError, PersonaResult};

const EXTENSION: &str = "md";
const MAX_NAME_LEN: usize = 64;
const CURSOR_RULE_HEADER: &str = "---\ndescription: parrot persona\nalwaysApply: true\n---\n\n";

/// Directory of persona profiles.
#[derive(Debug, Clone)]
pub struct PersonaStore {
    dir: PathBuf,
}

impl PersonaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the profile for `name`, after validating the name.
    pub fn path(&self, name: &str) -> PersonaResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{EXTENSION}")))
    }

    /// Sorted names of all stored personas. A missing directory is empty.
    pub fn list(&self) -> PersonaResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error("list", &self.dir, source)),
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(EXTENSION))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .filter(|name| validate_name(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn read(&self, name: &str) -> PersonaResult<String> {
        let path = self.path(name)?;
        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                PersonaError::NotFound {
                    name: name.to_string(),
                    path: path.clone(),
                }
            } else {
                self.io_error("read", &path, source)
            }
        })
    }

    /// Stores `contents` as persona `name`, replacing any previous one.
    pub fn write(&self, name: &str, contents: &str) -> PersonaResult<PathBuf> {
        let path = self.path(name)?;
        write_atomic(&path, contents.as_bytes()).map_err(|e| self.io_error("write", &path, e))?;
        info!(persona = name, path = %path.display(), "Saved persona");
        Ok(path)
    }

    /// Copies persona `name` to `target`, creating parent directories.
    ///
    /// Returns `false` when `target` already held exactly this content.
    /// Cursor rule files (`.mdc`) get rule frontmatter unless the profile
    /// brings its own.
    pub fn apply(&self, name: &str, target: &Path) -> PersonaResult<bool> {
        let profile = self.read(name)?;
        let contents = render_for_target(&profile, target);

        if fs::read_to_string(target).ok().as_deref() == Some(contents.as_str()) {
            debug!(persona = name, target = %target.display(), "Persona already applied");
            return Ok(false);
        }
        write_atomic(target, contents.as_bytes()).map_err(|e| self.io_error("write", target, e))?;
        info!(persona = name, target = %target.display(), "Applied persona");
        Ok(true)
    }

    /// Opens persona `name` in `$VISUAL`/`$EDITOR` (default `vi`),
    /// creating a stub first if it does not exist yet.
    pub fn edit(&self, name: &str) -> PersonaResult<PathBuf> {
        let path = self.path(name)?;
        if !path.exists() {
            self.write(name, &format!("# {name}\n\n"))?;
        }

        let editor = env::var("VISUAL")
            .ok()
            .or_else(|| env::var("EDITOR").ok())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        let mut parts = editor.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(PersonaError::Editor {
                editor,
                reason: "empty command".to_string(),
            });
        };

        let status = Command::new(program)
            .args(parts)
            .arg(&path)
            .status()
            .map_err(|e| PersonaError::Editor {
                editor: editor.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(PersonaError::Editor {
                editor,
                reason: status.to_string(),
            });
        }
        Ok(path)
    }

    fn io_error(&self, action: &'static str, path: &Path, source: io::Error) -> PersonaError {
        PersonaError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Persona names become file names, so only a safe alphabet is allowed.
pub fn validate_name(name: &str) -> PersonaResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PersonaError::InvalidName(name.to_string()))
    }
}

fn render_for_target(profile: &str, target: &Path) -> String {
    let is_cursor_rule = target.extension().and_then(|e| e.to_str()) == Some("mdc");
    if is_cursor_rule && !profile.trim_start().starts_with("---") {
        format!("{CURSOR_RULE_HEADER}{profile}")
    } else {
        profile.to_string()
    }
}

/// Writes through a sibling temp file so readers never see a partial file.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
