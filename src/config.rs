use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PlanAssignError, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7878;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
const DEFAULT_MAX_CONNECTIONS: u32 = 8;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    #[serde(default = "crate::runtime_paths::default_db_path")]
    pub sqlite_path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(sqlite_path: impl Into<String>) -> Self {
        Self {
            sqlite_path: sqlite_path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Config {
    pub fn convention_defaults(db_path: &str) -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::new(db_path),
        }
    }

    /// Reads a JSON config file. Sections or fields left out fall back to the
    /// convention defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            PlanAssignError::Config(format!(
                "failed to read config {}: {e}",
                path.to_string_lossy()
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| PlanAssignError::Config(e.to_string()))?;
        if let Some(obj) = value.as_object_mut() {
            obj.entry("database")
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_value(value).map_err(|e| PlanAssignError::Config(e.to_string()))
    }

    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    fn apply_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PLAN_ASSIGN_HOST").filter(|v| !v.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        if let Some(port) = lookup("PLAN_ASSIGN_PORT").filter(|v| !v.trim().is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| {
                PlanAssignError::Config(format!("PLAN_ASSIGN_PORT is not a valid port: {port}"))
            })?;
        }
        if let Some(db) = lookup("PLAN_ASSIGN_DB").filter(|v| !v.trim().is_empty()) {
            self.database.sqlite_path = db.trim().to_string();
        }
        Ok(self)
    }
}
