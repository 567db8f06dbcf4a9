//! Application configuration and well-known paths.
//!
//! `config.toml` holds everything that is not a voice parameter. A missing
//! file means defaults; an unreadable or invalid one is reported with a
//! warning and also falls back to defaults, because hooks must keep
//! working when the user breaks their config.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parrot_protocol::Source;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

/// Overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "PARROT_CONFIG_DIR";
/// Overrides where session markers, history and logs live.
pub const STATE_DIR_ENV: &str = "PARROT_STATE_DIR";
/// Overrides where persona profiles are stored.
pub const PERSONA_DIR_ENV: &str = "PARROT_PERSONA_DIR";

const CONFIG_FILE: &str = "config.toml";
const VOICE_FILE: &str = "voice.json";
const PROJECT_DIR: &str = ".parrot";
const PERSONA_DESCRIPTOR: &str = "persona.json";

// ============================================================================
// config.toml
// ============================================================================

/// Contents of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where runtime state lives; `PARROT_STATE_DIR` wins over this
    pub state_dir: Option<PathBuf>,
    /// Age after which session markers are swept
    pub retention_hours: u64,
    /// Desktop notifications for attention events
    pub notifications: bool,
    /// Persona applied when the project descriptor names none
    pub default_persona: Option<String>,
    /// Audio player command, e.g. `"mpv --no-video"`
    pub player: Option<String>,
    pub speak_on_subagent_stop: bool,
    pub instructions: InstructionTargets,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            retention_hours: 24,
            notifications: true,
            default_persona: None,
            player: None,
            speak_on_subagent_stop: false,
            instructions: InstructionTargets::default(),
        }
    }
}

impl AppConfig {
    /// Parses `config.toml` contents.
    pub fn parse(contents: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Reads `path`, distinguishing "absent" from "broken".
    pub fn read(path: &Path) -> ConfigResult<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents, path).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Loads `path`, falling back to defaults on any problem.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(config)) => {
                debug!(path = %path.display(), "Loaded config");
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "Using default config");
                Self::default()
            }
        }
    }

    /// Retention window for session markers, never shorter than an hour.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.max(1) * 60 * 60)
    }
}

/// Where each host reads its active instructions, relative to the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionTargets {
    pub claude_code: PathBuf,
    pub codex: PathBuf,
    pub cursor: PathBuf,
}

impl Default for InstructionTargets {
    fn default() -> Self {
        Self {
            claude_code: PathBuf::from(".claude/rules/persona.md"),
            codex: PathBuf::from("AGENTS.override.md"),
            cursor: PathBuf::from(".cursor/rules/persona.mdc"),
        }
    }
}

impl InstructionTargets {
    pub fn for_source(&self, source: Source) -> &Path {
        match source {
            Source::ClaudeCode => &self.claude_code,
            Source::Codex => &self.codex,
            Source::Cursor => &self.cursor,
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Resolved locations for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub state_dir: PathBuf,
    pub persona_dir: PathBuf,
}

impl Paths {
    /// Config directory: `$PARROT_CONFIG_DIR`, else `~/.config/parrot`.
    pub fn config_dir_from<E>(env: E) -> PathBuf
    where
        E: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = non_empty_env(&env, CONFIG_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .map(|home| home.join(".config"))
            .or_else(dirs::config_dir)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("parrot")
    }

    /// Resolves state and persona directories once the config is known.
    pub fn resolve<E>(config_dir: PathBuf, config: &AppConfig, env: E) -> Self
    where
        E: Fn(&str) -> Option<String>,
    {
        let state_dir = non_empty_env(&env, STATE_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| config.state_dir.clone())
            .unwrap_or_else(|| {
                dirs::state_dir()
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join("parrot")
            });
        let persona_dir = non_empty_env(&env, PERSONA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("personas"));

        Self {
            config_dir,
            state_dir,
            persona_dir,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// The global provider-settings document.
    pub fn global_voice_settings(&self) -> PathBuf {
        self.config_dir.join(VOICE_FILE)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.state_dir.join("sessions")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.state_dir.join("history")
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join("parrot.log")
    }
}

/// `<workdir>/.parrot/persona.json`
pub fn project_persona_descriptor(workdir: &Path) -> PathBuf {
    workdir.join(PROJECT_DIR).join(PERSONA_DESCRIPTOR)
}

/// `<workdir>/.parrot/voice.json`
pub fn project_voice_settings(workdir: &Path) -> PathBuf {
    workdir.join(PROJECT_DIR).join(VOICE_FILE)
}

fn non_empty_env<E>(env: &E, key: &str) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    env(key).filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.retention(), Duration::from_secs(24 * 3600));
        assert!(config.notifications);
        assert!(!config.speak_on_subagent_stop);
        assert_eq!(
            config.instructions.for_source(Source::Codex),
            Path::new("AGENTS.override.md")
        );
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config = AppConfig::parse(
            r#"
retention_hours = 6
default_persona = "pirate"

[instructions]
cursor = ".cursor/rules/voice.mdc"
"#,
            Path::new("config.toml"),
        )
        .unwrap();

        assert_eq!(config.retention_hours, 6);
        assert_eq!(config.default_persona.as_deref(), Some("pirate"));
        assert!(config.notifications);
        assert_eq!(
            config.instructions.cursor,
            PathBuf::from(".cursor/rules/voice.mdc")
        );
        assert_eq!(
            config.instructions.claude_code,
            PathBuf::from(".claude/rules/persona.md")
        );
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "retention_hours = \"soon\"").unwrap();

        assert!(matches!(
            AppConfig::read(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::read(&dir.path().join("nope.toml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_retention_has_floor() {
        let config = AppConfig {
            retention_hours: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.retention(), Duration::from_secs(3600));
    }

    #[test]
    fn test_env_overrides_paths() {
        let env = env_of(&[
            (CONFIG_DIR_ENV, "/cfg"),
            (STATE_DIR_ENV, "/state"),
            (PERSONA_DIR_ENV, "/personas"),
        ]);
        let config_dir = Paths::config_dir_from(&env);
        let paths = Paths::resolve(config_dir, &AppConfig::default(), &env);

        assert_eq!(paths.config_file(), PathBuf::from("/cfg/config.toml"));
        assert_eq!(paths.sessions_dir(), PathBuf::from("/state/sessions"));
        assert_eq!(paths.persona_dir, PathBuf::from("/personas"));
    }

    #[test]
    fn test_config_state_dir_used_without_env() {
        let config = AppConfig {
            state_dir: Some(PathBuf::from("/var/parrot")),
            ..AppConfig::default()
        };
        let env = env_of(&[(STATE_DIR_ENV, "  ")]);
        let paths = Paths::resolve(PathBuf::from("/cfg"), &config, env);

        assert_eq!(paths.state_dir, PathBuf::from("/var/parrot"));
        assert_eq!(paths.persona_dir, PathBuf::from("/cfg/personas"));
        assert_eq!(paths.log_file(), PathBuf::from("/var/parrot/parrot.log"));
    }

    #[test]
    fn test_project_paths() {
        let workdir = Path::new("/work");
        assert_eq!(
            project_voice_settings(workdir),
            PathBuf::from("/work/.parrot/voice.json")
        );
        assert_eq!(
            project_persona_descriptor(workdir),
            PathBuf::from("/work/.parrot/persona.json")
        );
    }
}
