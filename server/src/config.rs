use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Top-level server configuration, loaded from palaver.toml.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub history: HistorySection,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen_addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Directory holding one JSON history file per room. Created at startup
    /// if missing.
    pub dir: String,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            dir: "chat_history".into(),
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> Self {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .unwrap_or_else(|e| panic!("failed to read config file {}: {}", path, e));
            toml::from_str(&contents)
                .unwrap_or_else(|e| panic!("failed to parse config file {}: {}", path, e))
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Ok(v) = std::env::var("HISTORY_DIR") {
            self.history.dir = v;
        }
    }
}
