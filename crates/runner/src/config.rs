//! Runner endpoint and bot identity configuration.
//!
//! Search order: `GALAXIO_BOT_CONFIG_DIR/bot.toml`, then `./bot.toml`. Every
//! field has a default so the bot runs with no config file at all; env
//! overrides win over the file.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "bot.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BotConfig {
    #[serde(default = "default_runner_host")]
    pub runner_host: String,
    #[serde(default = "default_runner_port")]
    pub runner_port: u16,
    #[serde(default = "default_nickname")]
    pub nickname: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            runner_host: default_runner_host(),
            runner_port: default_runner_port(),
            nickname: default_nickname(),
        }
    }
}

fn default_runner_host() -> String {
    "localhost".to_string()
}

fn default_runner_port() -> u16 {
    5000
}

fn default_nickname() -> String {
    "RustyGalaxio".to_string()
}

impl BotConfig {
    /// Loads `bot.toml` if one resolves, the defaults otherwise.
    pub fn load() -> anyhow::Result<Self> {
        match resolve_path(CONFIG_FILE) {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("read config at {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parse config at {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// WebSocket url of the runner hub. `RUNNER_IPV4` overrides the
    /// configured host and may carry a scheme prefix.
    pub fn runner_url(&self) -> String {
        let override_host = env::var("RUNNER_IPV4").ok().filter(|v| !v.trim().is_empty());
        self.runner_url_with(override_host.as_deref())
    }

    fn runner_url_with(&self, override_host: Option<&str>) -> String {
        let host = override_host.unwrap_or(&self.runner_host);
        let host = host
            .trim()
            .trim_start_matches("http://")
            .trim_start_matches("ws://")
            .trim_end_matches('/');
        format!("ws://{host}:{}/runnerhub", self.runner_port)
    }
}

/// Registration token: env override, else a fresh unique one per run.
pub fn registration_token() -> String {
    env::var("REGISTRATION_TOKEN")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn resolve_path(relative: &str) -> Option<PathBuf> {
    let rel = Path::new(relative);

    if let Some(root) = env::var_os("GALAXIO_BOT_CONFIG_DIR") {
        let candidate = PathBuf::from(root).join(rel);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if let Ok(cwd) = env::current_dir() {
        let candidate = cwd.join(rel);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}
