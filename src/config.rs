//! Runtime configuration
//!
//! All tunables live here: thresholds, delays, timeouts, fixed screen
//! coordinates and paths. Loaded from an optional JSON file, then overridden
//! by `ROK_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Fixed screen point, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPoint {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the adb binary (shell backend only).
    pub adb_path: String,
    /// Bound on every single bridge call.
    pub adb_timeout_secs: u64,
    /// Default similarity threshold for template matching (0.0 to 1.0).
    pub match_threshold: f32,
    /// Root of the template content directory.
    pub template_dir: PathBuf,
    /// Bound on "wait until template found" polls.
    pub search_timeout_secs: u64,
    /// Interval between capture polls inside a wait.
    pub poll_interval_ms: u64,
    /// Sleep between control loop iterations.
    pub loop_interval_ms: u64,
    /// Backoff after a failed iteration.
    pub retry_delay_ms: u64,
    /// Settle delay after a tap in task step sequences.
    pub tap_delay_ms: u64,
    /// Cooldown before confirming an alternate-login prompt.
    pub login_cooldown_secs: u64,
    /// Persisted per-device state (JSON).
    pub state_file: PathBuf,
    /// Commit each captured frame to the screenshots directory.
    pub save_screenshots: bool,
    pub screenshot_dir: PathBuf,
    /// Drop loopback (127.0.0.1:*) entries from device listings.
    pub filter_loopback_devices: bool,
    /// Tapped when the disconnect indicator is on screen.
    pub reconnect_point: FixedPoint,
    /// Tapped to accept the "still matching" farming outcome.
    pub screen_center: FixedPoint,
    /// Tapped to confirm a training order.
    pub train_confirm_point: FixedPoint,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            adb_path: "adb".to_string(),
            adb_timeout_secs: 15,
            match_threshold: 0.9,
            template_dir: PathBuf::from("images"),
            search_timeout_secs: 10,
            poll_interval_ms: 500,
            loop_interval_ms: 1000,
            retry_delay_ms: 2000,
            tap_delay_ms: 800,
            login_cooldown_secs: 300,
            state_file: PathBuf::from("data/app_state.json"),
            save_screenshots: false,
            screenshot_dir: PathBuf::from("screenshots"),
            filter_loopback_devices: true,
            reconnect_point: FixedPoint { x: 638, y: 471 },
            screen_center: FixedPoint { x: 640, y: 360 },
            train_confirm_point: FixedPoint { x: 985, y: 592 },
        }
    }
}

impl Settings {
    /// Load from a JSON file when one is given, then apply environment
    /// overrides. An explicitly named file that cannot be read is an error;
    /// a typo'd path must not silently run on default coordinates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => Settings::default(),
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("ROK_ADB_PATH") {
            self.adb_path = path;
        }
        if let Ok(raw) = std::env::var("ROK_MATCH_THRESHOLD")
            && let Ok(threshold) = raw.parse::<f32>()
        {
            self.match_threshold = threshold;
        }
        if let Ok(dir) = std::env::var("ROK_TEMPLATE_DIR") {
            self.template_dir = PathBuf::from(dir);
        }
        if let Ok(file) = std::env::var("ROK_STATE_FILE") {
            self.state_file = PathBuf::from(file);
        }
    }

    /// Collect configuration problems; an empty Vec means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(0.0..=1.0).contains(&self.match_threshold) {
            errors.push(format!(
                "match_threshold must be between 0.0 and 1.0, got {}",
                self.match_threshold
            ));
        }
        if self.adb_timeout_secs == 0 || self.search_timeout_secs == 0 {
            errors.push("timeouts must be positive".to_string());
        }
        if self.poll_interval_ms == 0 {
            errors.push("poll_interval_ms must be positive".to_string());
        }
        errors
    }

    pub fn adb_timeout(&self) -> Duration {
        Duration::from_secs(self.adb_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn tap_delay(&self) -> Duration {
        Duration::from_millis(self.tap_delay_ms)
    }

    pub fn login_cooldown(&self) -> Duration {
        Duration::from_secs(self.login_cooldown_secs)
    }

    /// Resolve a template path relative to the content directory.
    pub fn template_path(&self, rel: &str) -> PathBuf {
        self.template_dir.join(rel)
    }
}
