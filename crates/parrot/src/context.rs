//! Per-invocation application context.

use parrot_core::SessionStore;

use crate::config::{AppConfig, Paths};
use crate::error::ConfigError;
use crate::history::History;
use crate::persona::PersonaStore;
use crate::speech::Player;

/// Loaded configuration plus the paths derived from it.
#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub paths: Paths,
    /// Why `config.toml` was ignored, if it was. Reported once logging
    /// is up, since logging itself depends on the config.
    pub config_error: Option<ConfigError>,
}

impl AppContext {
    pub fn new(config: AppConfig, paths: Paths) -> Self {
        Self {
            config,
            paths,
            config_error: None,
        }
    }

    /// Loads everything from the process environment and `config.toml`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<E>(env: E) -> Self
    where
        E: Fn(&str) -> Option<String>,
    {
        let config_dir = Paths::config_dir_from(&env);
        let config_file = config_dir.join("config.toml");
        let (config, config_error) = match AppConfig::read(&config_file) {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(e) => (AppConfig::default(), Some(e)),
        };
        let paths = Paths::resolve(config_dir, &config, &env);
        Self {
            config,
            paths,
            config_error,
        }
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.paths.sessions_dir()).with_retention(self.config.retention())
    }

    pub fn personas(&self) -> PersonaStore {
        PersonaStore::new(self.paths.persona_dir.clone())
    }

    pub fn history(&self) -> History {
        History::new(self.paths.history_dir())
    }

    pub fn player(&self) -> Player {
        Player::new(self.config.player.clone())
    }
}
