use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use std::env;
use std::time::Duration;

use crate::coordinator::CoordinatorConfig;

/// Upper bound on how long one poll may block the UI thread.
const MAX_POLL_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub greeting: String,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
    pub poll_timeout_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
            window_width: None,
            window_height: None,
            poll_timeout_ms: 50,
        }
    }
}

impl AppSettings {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.min(MAX_POLL_TIMEOUT_MS))
    }

    /// Coordinator setup for this session. Start value and cadence stay fixed.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig { poll_timeout: self.poll_timeout(), ..CoordinatorConfig::default() }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store backed by `settings.toml` next to the executable.
    pub fn new() -> Result<Self> {
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .ok_or_else(|| anyhow::anyhow!("failed to resolve executable directory"))?;
        fs::create_dir_all(&exe_dir)?;
        Ok(Self { path: exe_dir.join("settings.toml") })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf { &self.path }

    pub fn load(&self) -> Result<AppSettings> {
        if !self.path.exists() {
            return Ok(AppSettings::default());
        }
        let text = fs::read_to_string(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let settings: AppSettings = toml::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(settings)
    }

    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        let text = toml::to_string_pretty(settings)?;
        fs::write(&self.path, text).with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
