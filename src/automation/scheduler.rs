//! Device discovery and runner lifecycle
//!
//! The scheduler owns the runner handles. Task switches flow through the
//! state store first, then to the live runner (or start one); pause tears
//! the runner down entirely so a paused device sees no device I/O at all.

use super::channels::runner_channel;
use super::runner::DeviceRunner;
use super::types::{AutomationEvent, ResourceKind, RunnerCommand, RunnerStatus, TaskKind, TaskSet};
use crate::adb::{AdbResult, Device, DeviceBridge};
use crate::config::Settings;
use crate::state::{DeviceState, StateStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct RunnerHandle {
    commands: mpsc::Sender<RunnerCommand>,
    join: JoinHandle<()>,
}

pub struct Scheduler<B: DeviceBridge + 'static> {
    bridge: Arc<B>,
    settings: Arc<Settings>,
    store: Arc<tokio::sync::Mutex<StateStore>>,
    events: mpsc::Sender<AutomationEvent>,
    runners: HashMap<String, RunnerHandle>,
}

impl<B: DeviceBridge + 'static> Scheduler<B> {
    pub fn new(
        bridge: Arc<B>,
        settings: Arc<Settings>,
        store: Arc<tokio::sync::Mutex<StateStore>>,
        events: mpsc::Sender<AutomationEvent>,
    ) -> Self {
        Self {
            bridge,
            settings,
            store,
            events,
            runners: HashMap::new(),
        }
    }

    /// Enumerate connected devices, optionally dropping loopback transport
    /// duplicates the emulator bridge reports.
    pub async fn list_devices(&self) -> AdbResult<Vec<Device>> {
        let mut devices = self.bridge.list_devices().await?;
        if self.settings.filter_loopback_devices {
            devices.retain(|d| !d.name.starts_with("127.0.0.1"));
        }
        Ok(devices)
    }

    pub async fn status(&mut self, device: &str) -> RunnerStatus {
        self.prune(device);
        if self.runners.contains_key(device) {
            return RunnerStatus::Active;
        }
        let state = self.store.lock().await.device(device);
        if !state.tasks.any_enabled() {
            RunnerStatus::Idle
        } else if state.paused {
            RunnerStatus::Paused
        } else {
            RunnerStatus::Stopped
        }
    }

    pub async fn set_task(&mut self, device: &str, task: TaskKind, enabled: bool) {
        self.apply(device, |tasks| tasks.set_enabled(task, enabled))
            .await;
    }

    pub async fn set_resource(&mut self, device: &str, resource: ResourceKind, enabled: bool) {
        self.apply(device, |tasks| tasks.set_resource_enabled(resource, enabled))
            .await;
    }

    pub async fn set_army_count(&mut self, device: &str, count: u8) {
        self.apply(device, |tasks| tasks.set_army_count(count)).await;
    }

    /// Persist a task-set change, then forward it to the live runner, or
    /// start one if the device is unpaused with work to do.
    async fn apply(&mut self, device: &str, mutate: impl FnOnce(&mut TaskSet)) {
        let state = {
            let mut store = self.store.lock().await;
            store.update(device, |d| mutate(&mut d.tasks));
            store.device(device)
        };
        self.prune(device);
        if let Some(handle) = self.runners.get(device) {
            if handle
                .commands
                .send(RunnerCommand::UpdateTasks(state.tasks.clone()))
                .await
                .is_err()
            {
                // Runner raced us to exit; restart it if there is work left.
                self.runners.remove(device);
                if !state.paused && state.tasks.any_enabled() {
                    self.spawn(device, state);
                }
            }
        } else if !state.paused && state.tasks.any_enabled() {
            self.spawn(device, state);
        }
    }

    /// Pause: persist the flag, then tear the runner down. After this
    /// returns no further capture or tap is issued for the device.
    pub async fn pause(&mut self, device: &str) {
        self.store.lock().await.update(device, |d| d.paused = true);
        if let Some(handle) = self.runners.remove(device) {
            let _ = handle.commands.send(RunnerCommand::Shutdown).await;
            handle.join.abort();
            log::info!("[{device}] paused, runner torn down");
        }
    }

    pub async fn resume(&mut self, device: &str) {
        let state = {
            let mut store = self.store.lock().await;
            store.update(device, |d| d.paused = false);
            store.device(device)
        };
        self.prune(device);
        if state.tasks.any_enabled() && !self.runners.contains_key(device) {
            self.spawn(device, state);
        }
    }

    /// Devices with persisted state that are unpaused and have enabled
    /// tasks; used to restart automation after a process restart.
    pub async fn resumable_devices(&self) -> Vec<String> {
        let store = self.store.lock().await;
        store
            .known_devices()
            .into_iter()
            .filter(|device| {
                let state = store.device(device);
                !state.paused && state.tasks.any_enabled()
            })
            .collect()
    }

    pub async fn shutdown(&mut self) {
        for (device, handle) in self.runners.drain() {
            let _ = handle.commands.send(RunnerCommand::Shutdown).await;
            handle.join.abort();
            log::info!("[{device}] runner shut down");
        }
    }

    fn spawn(&mut self, device: &str, state: DeviceState) {
        let (commands, rx) = runner_channel();
        let runner = DeviceRunner::new(
            device.to_string(),
            Arc::clone(&self.bridge),
            Arc::clone(&self.settings),
            Arc::clone(&self.store),
            state,
            rx,
            self.events.clone(),
        );
        let join = tokio::spawn(runner.run());
        self.runners
            .insert(device.to_string(), RunnerHandle { commands, join });
        log::info!("[{device}] runner started");
    }

    /// Drop the handle of a runner that exited on its own.
    fn prune(&mut self, device: &str) {
        if self
            .runners
            .get(device)
            .is_some_and(|handle| handle.join.is_finished())
        {
            self.runners.remove(device);
        }
    }
}
