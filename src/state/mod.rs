//! Persisted per-device state
//!
//! One JSON file holds, per device: task switches, farm priority order and
//! cursor, pause flag, named building coordinates and a last-used timestamp.
//! The store is read when a device is first touched and written on every
//! change. Building coordinates are populated out-of-band by the coordinate
//! capture tool; the automation core only reads them.

use crate::automation::types::{ResourceKind, TaskSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// A named building position recorded for one device.
pub type Coordinate = (u32, u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    pub tasks: TaskSet,
    /// Devices start paused until explicitly resumed.
    pub paused: bool,
    pub farm_priority: Vec<ResourceKind>,
    pub farm_cursor: usize,
    /// Building name -> screen coordinate, captured out-of-band.
    pub buildings: HashMap<String, Coordinate>,
    /// Unix seconds of the last state change for this device.
    pub last_used: Option<u64>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            tasks: TaskSet::default(),
            paused: true,
            farm_priority: ResourceKind::DEFAULT_ORDER.to_vec(),
            farm_cursor: 0,
            buildings: HashMap::new(),
            last_used: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppState {
    devices: HashMap<String, DeviceState>,
}

/// Load/save access to the persisted application state.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: AppState,
}

impl StateStore {
    /// Open the store, loading existing state if the file is present. A
    /// missing file is not an error; a corrupt one is.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| StateError::Read {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| StateError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            AppState::default()
        };
        Ok(Self { path, state })
    }

    pub fn save(&self) -> Result<(), StateError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|source| StateError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(&self.state).expect("state serializes");
        std::fs::write(&self.path, raw).map_err(|source| StateError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Current state for a device, defaults if never seen.
    pub fn device(&self, device: &str) -> DeviceState {
        self.state.devices.get(device).cloned().unwrap_or_default()
    }

    pub fn known_devices(&self) -> Vec<String> {
        self.state.devices.keys().cloned().collect()
    }

    /// Mutate one device's state and persist the change. Save failures are
    /// logged, not propagated: losing a cursor position must not stop the
    /// automation.
    pub fn update(&mut self, device: &str, mutate: impl FnOnce(&mut DeviceState)) {
        let entry = self.state.devices.entry(device.to_string()).or_default();
        mutate(entry);
        entry.last_used = Some(unix_now());
        if let Err(e) = self.save() {
            log::error!("[{device}] failed to persist state: {e}");
        }
    }

    /// Coordinate registry lookup: named building -> point, absent when the
    /// coordinate was never captured for this device.
    pub fn coordinate(&self, device: &str, name: &str) -> Option<Coordinate> {
        self.state
            .devices
            .get(device)
            .and_then(|d| d.buildings.get(name))
            .copied()
    }

    pub fn clear_device(&mut self, device: &str) {
        if self.state.devices.remove(device).is_some()
            && let Err(e) = self.save()
        {
            log::error!("[{device}] failed to persist state: {e}");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
