use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("failed to merge config overlay: {0}")]
    Merge(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub url: String,
    pub clean_start: bool,
}

/// Fixed civil timezone all wall-clock scheduling is evaluated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timezone {
    /// UTC offset of the deployment's venue, e.g. "+02:00".
    pub offset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    pub timezone: Timezone,
}

impl Settings {
    /// Load `configs/default.toml`, overlaying `configs/{RUN_MODE}.toml` when
    /// that file exists. Non-null overlay values win.
    pub fn new() -> Result<Self, SettingsError> {
        let base_path =
            env::var("THERMOSYNC_CONFIG").unwrap_or_else(|_| "configs/default.toml".to_string());
        let settings: Settings = Self::load_file(&base_path)?;

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let overlay_path = format!("configs/{run_mode}.toml");

        if Path::new(&overlay_path).exists() {
            let overlay: toml::Value = Self::load_file(&overlay_path)?;
            return Self::merge(settings, overlay);
        }

        Ok(settings)
    }

    fn load_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_string(),
            source,
        })?;

        toml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_string(),
            source,
        })
    }

    fn merge(base: Settings, overlay: toml::Value) -> Result<Settings, SettingsError> {
        let mut base_map = serde_json::to_value(&base)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .ok_or_else(|| SettingsError::Merge("base settings are not a table".to_string()))?;

        let overlay_map = serde_json::to_value(&overlay)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .ok_or_else(|| SettingsError::Merge("overlay is not a table".to_string()))?;

        for (key, value) in overlay_map {
            if !value.is_null() {
                base_map.insert(key, value);
            }
        }

        serde_json::from_value(serde_json::Value::Object(base_map))
            .map_err(|e| SettingsError::Merge(e.to_string()))
    }
}
