//! Per-device control loop
//!
//! One runner owns one device. It is the sole writer of that device's
//! mutable automation state (task switches, farm cursor); everyone else
//! talks to it through its command channel. Each iteration captures a
//! frame, resolves interrupts, then dispatches enabled tasks in a fixed
//! order. A failed iteration is logged and retried after a backoff; only a
//! shutdown command or an empty task set ends the loop.

use super::farm_priority::FarmPriority;
use super::resolver::Resolver;
use super::types::{AutomationEvent, RunnerCommand, TaskKind, TaskSet};
use crate::adb::{AdbResult, DeviceBridge, Frame};
use crate::config::Settings;
use crate::state::{DeviceState, StateStore};
use crate::tasks::{self, TaskContext, explore::ExploreMode};
use crate::vision;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

pub struct DeviceRunner<B: DeviceBridge> {
    device: String,
    bridge: Arc<B>,
    settings: Arc<Settings>,
    store: Arc<tokio::sync::Mutex<StateStore>>,
    resolver: Resolver,
    tasks: TaskSet,
    priority: FarmPriority,
    commands: mpsc::Receiver<RunnerCommand>,
    events: mpsc::Sender<AutomationEvent>,
}

impl<B: DeviceBridge> DeviceRunner<B> {
    pub fn new(
        device: String,
        bridge: Arc<B>,
        settings: Arc<Settings>,
        store: Arc<tokio::sync::Mutex<StateStore>>,
        initial: DeviceState,
        commands: mpsc::Receiver<RunnerCommand>,
        events: mpsc::Sender<AutomationEvent>,
    ) -> Self {
        let resolver = Resolver::new(&settings);
        Self {
            device,
            bridge,
            settings,
            store,
            resolver,
            tasks: initial.tasks,
            priority: FarmPriority::new(initial.farm_priority, initial.farm_cursor),
            commands,
            events,
        }
    }

    pub async fn run(mut self) {
        log::info!("[{}] control loop started", self.device);
        loop {
            loop {
                match self.commands.try_recv() {
                    Ok(RunnerCommand::UpdateTasks(tasks)) => self.tasks = tasks,
                    Ok(RunnerCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                        return self.stop().await;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }
            if !self.tasks.any_enabled() {
                log::info!("[{}] no tasks enabled, control loop exits", self.device);
                return self.stop().await;
            }

            match self.iteration().await {
                Ok(()) => tokio::time::sleep(self.settings.loop_interval()).await,
                Err(e) => {
                    log::warn!("[{}] iteration failed: {e}", self.device);
                    self.emit(AutomationEvent::IterationFailed {
                        device: self.device.clone(),
                        detail: e.to_string(),
                    });
                    tokio::time::sleep(self.settings.retry_delay()).await;
                }
            }
        }
    }

    /// One pass: capture, resolve interrupts, dispatch tasks. Any error
    /// bubbles to the loop's retry path without tearing the runner down.
    async fn iteration(&mut self) -> AdbResult<()> {
        let frame = self.bridge.capture(&self.device).await?;
        log::debug!(
            "[{}] frame {}x{} captured in {}ms",
            self.device,
            frame.width(),
            frame.height(),
            frame.duration_ms
        );
        self.emit(AutomationEvent::FrameCaptured {
            device: self.device.clone(),
            png: frame.png.clone(),
        });
        if self.settings.save_screenshots {
            save_screenshot(&self.settings, &self.device, &frame).await;
        }

        let device = self.device.clone();
        let buildings = self.store.lock().await.device(&device).buildings;
        let bridge = Arc::clone(&self.bridge);
        let settings = Arc::clone(&self.settings);
        let ctx = TaskContext {
            bridge: bridge.as_ref(),
            device: &device,
            settings: &settings,
            buildings: &buildings,
            cancel: None,
        };

        if let Some(rule) = self.resolver.resolve(&ctx, &frame).await? {
            self.emit(AutomationEvent::InterruptHandled {
                device: device.clone(),
                rule,
            });
            return Ok(());
        }

        let tasks = self.tasks.clone();
        if tasks.recruit {
            tasks::recruit::run(&ctx, &frame).await?;
            self.dispatched(TaskKind::Recruit);
        }
        if tasks.train {
            tasks::train::run(&ctx, &frame).await?;
            self.dispatched(TaskKind::Train);
        }
        if tasks.build {
            tasks::build::run(&ctx).await?;
            self.dispatched(TaskKind::Build);
        }
        if (tasks.explore || tasks.cave)
            && vision::exists_any(&frame, &ctx.template_set("explore_check"))
        {
            let mode = match (tasks.explore, tasks.cave) {
                (true, true) => ExploreMode::Combined,
                (true, false) => ExploreMode::Explore,
                _ => ExploreMode::CaveProbe,
            };
            tasks::explore::run(&ctx, mode).await?;
            self.dispatched(if tasks.explore {
                TaskKind::Explore
            } else {
                TaskKind::Cave
            });
        }
        if tasks.farm {
            tasks::farm::run(&ctx, &tasks, &mut self.priority).await?;
            self.dispatched(TaskKind::Farm);
            let cursor = self.priority.cursor();
            self.store
                .lock()
                .await
                .update(&device, |d| d.farm_cursor = cursor);
        }
        Ok(())
    }

    async fn stop(self) {
        let cursor = self.priority.cursor();
        self.store
            .lock()
            .await
            .update(&self.device, |d| d.farm_cursor = cursor);
        self.emit(AutomationEvent::RunnerStopped {
            device: self.device.clone(),
        });
        log::info!("[{}] control loop stopped", self.device);
    }

    /// Events are best-effort: a full or closed channel never stalls the
    /// loop.
    fn emit(&self, event: AutomationEvent) {
        let _ = self.events.try_send(event);
    }

    fn dispatched(&self, task: TaskKind) {
        self.emit(AutomationEvent::TaskDispatched {
            device: self.device.clone(),
            task,
        });
    }
}

async fn save_screenshot(settings: &Settings, device: &str, frame: &Frame) {
    let safe_name = device.replace(':', "_");
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let path = settings.screenshot_dir.join(format!("{safe_name}_{stamp}.png"));
    if let Err(e) = tokio::fs::create_dir_all(&settings.screenshot_dir).await {
        log::error!("[{device}] cannot create screenshot dir: {e}");
        return;
    }
    if let Err(e) = tokio::fs::write(&path, &frame.png).await {
        log::error!("[{device}] failed to save screenshot {}: {e}", path.display());
    }
}
