// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name of the persisted config inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `AppConfig::site_url`.
pub const ENV_SITE_URL: &str = "WEBSHELL_SITE_URL";

/// Environment variable overriding `AppConfig::backend_url`.
pub const ENV_BACKEND_URL: &str = "WEBSHELL_BACKEND_URL";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The remote site loaded into the browsing surface.
    pub site_url: String,
    /// Base URL of the device-registry backend. Push registration is skipped
    /// when unset.
    pub backend_url: Option<String>,
    /// Request a push token on startup.
    pub push_enabled: bool,
    /// Startup overlay and page-load retry timings.
    pub readiness: ReadinessConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_url: "https://example.com/".into(),
            backend_url: None,
            push_enabled: true,
            readiness: ReadinessConfig::default(),
        }
    }
}

/// Timings for the readiness state machine. Stored as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Delay after the page view is constructed before navigation events are
    /// trusted.
    pub mount_delay_ms: u64,
    /// Delay between a clean load-end and declaring the page ready.
    pub settle_delay_ms: u64,
    /// Hard ceiling on how long the startup overlay may stay up.
    pub max_wait_ms: u64,
    /// Delay before an automatic reload after a load error.
    pub reload_backoff_ms: u64,
    /// Consecutive load errors tolerated before the manual-retry view.
    pub max_load_retries: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            mount_delay_ms: 300,
            settle_delay_ms: 500,
            max_wait_ms: 8_000,
            reload_backoff_ms: 2_000,
            max_load_retries: 3,
        }
    }
}

impl ReadinessConfig {
    pub fn mount_delay(&self) -> Duration {
        Duration::from_millis(self.mount_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn reload_backoff(&self) -> Duration {
        Duration::from_millis(self.reload_backoff_ms)
    }
}

impl AppConfig {
    /// Load the config from `data_dir`, falling back to defaults when the file
    /// is missing or unreadable, then apply environment overrides.
    pub fn load(data_dir: &Path) -> Self {
        let mut config = read_config(data_dir).unwrap_or_default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from a key lookup (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_SITE_URL).filter(|v| !v.trim().is_empty()) {
            self.site_url = url;
        }
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend_url = Some(url);
        }
    }

    /// Write the config to `data_dir` as pretty JSON.
    pub fn persist(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

fn read_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}
