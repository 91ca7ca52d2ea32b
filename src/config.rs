// Settings: defaults, then config.toml, then TASKDECK_* variables

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "TASKDECK_CONFIG";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Remote,
    Fixture,
}

impl SourceKind {
    fn parse(value: &str) -> Result<SourceKind, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "remote" => Ok(SourceKind::Remote),
            "fixture" | "demo" => Ok(SourceKind::Fixture),
            _ => Err(ConfigError::InvalidValue {
                key: "source",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub source: SourceKind,
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub default_project_id: Option<String>,
    pub search_debounce_ms: u64,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source: SourceKind::Fixture,
            backend_url: None,
            api_key: None,
            user_id: None,
            default_project_id: None,
            search_debounce_ms: 300,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

// Shape of config.toml; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    source: Option<SourceKind>,
    backend_url: Option<String>,
    api_key: Option<String>,
    user_id: Option<String>,
    default_project_id: Option<String>,
    search_debounce_ms: Option<u64>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

impl Settings {
    pub fn load() -> Result<Settings, ConfigError> {
        Settings::load_with(|key: &str| std::env::var(key).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // A path named in the environment must exist; the default one is optional
        let settings = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Settings::from_file(Path::new(&path))?,
            None => match default_config_path() {
                Some(path) if path.exists() => Settings::from_file(&path)?,
                _ => Settings::default(),
            },
        };
        let settings = settings.with_env(lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Settings::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Settings, ConfigError> {
        let file: FileSettings = toml::from_str(text)?;
        let defaults = Settings::default();
        let has_backend = file.backend_url.is_some() && file.api_key.is_some();
        Ok(Settings {
            source: file.source.unwrap_or(if has_backend {
                SourceKind::Remote
            } else {
                defaults.source
            }),
            backend_url: file.backend_url,
            api_key: file.api_key,
            user_id: file.user_id,
            default_project_id: file.default_project_id,
            search_debounce_ms: file.search_debounce_ms.unwrap_or(defaults.search_debounce_ms),
            log_level: file.log_level.unwrap_or(defaults.log_level),
            log_file: file.log_file,
        })
    }

    /// Overrides values from `TASKDECK_*` variables as resolved by `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut backend_from_env = false;
        if let Some(url) = lookup("TASKDECK_URL") {
            self.backend_url = Some(url);
            backend_from_env = true;
        }
        if let Some(key) = lookup("TASKDECK_API_KEY") {
            self.api_key = Some(key);
            backend_from_env = true;
        }
        if let Some(user) = lookup("TASKDECK_USER_ID") {
            self.user_id = Some(user);
        }
        if let Some(project) = lookup("TASKDECK_DEFAULT_PROJECT") {
            self.default_project_id = Some(project);
        }
        if let Some(raw) = lookup("TASKDECK_SEARCH_DEBOUNCE_MS") {
            self.search_debounce_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "search_debounce_ms",
                value: raw.clone(),
            })?;
        }
        if let Some(level) = lookup("TASKDECK_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(file) = lookup("TASKDECK_LOG_FILE") {
            self.log_file = Some(PathBuf::from(file));
        }

        match lookup("TASKDECK_SOURCE") {
            Some(raw) => self.source = SourceKind::parse(&raw)?,
            None => {
                if backend_from_env && self.backend_url.is_some() && self.api_key.is_some() {
                    self.source = SourceKind::Remote;
                }
            }
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source == SourceKind::Remote {
            if self.backend_url.is_none() {
                return Err(ConfigError::Missing("backend_url"));
            }
            if self.api_key.is_none() {
                return Err(ConfigError::Missing("api_key"));
            }
        }
        Ok(())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskdeck").join("config.toml"))
}
