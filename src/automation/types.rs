// Types shared across the automation core

use serde::{Deserialize, Serialize};

/// The automatable tasks, in their fixed per-iteration dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Recruit,
    Train,
    Build,
    Explore,
    Cave,
    Farm,
}

/// Gatherable resource kinds, in default farm priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Wood,
    Stone,
    Gold,
}

impl ResourceKind {
    pub const DEFAULT_ORDER: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Gold,
    ];

    /// Template file name for the resource's search icon.
    pub fn template_name(&self) -> &'static str {
        match self {
            ResourceKind::Food => "food.png",
            ResourceKind::Wood => "wood.png",
            ResourceKind::Stone => "stone.png",
            ResourceKind::Gold => "gold.png",
        }
    }
}

/// Per-device task switches plus the farming army budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSet {
    pub recruit: bool,
    pub train: bool,
    pub build: bool,
    pub explore: bool,
    pub cave: bool,
    pub farm: bool,
    pub food: bool,
    pub wood: bool,
    pub stone: bool,
    pub gold: bool,
    /// Concurrent gather expeditions to keep in flight (1..=5).
    pub army_count: u8,
}

impl Default for TaskSet {
    fn default() -> Self {
        Self {
            recruit: false,
            train: false,
            build: false,
            explore: false,
            cave: false,
            farm: false,
            food: false,
            wood: false,
            stone: false,
            gold: false,
            army_count: 1,
        }
    }
}

impl TaskSet {
    pub fn enabled(&self, task: TaskKind) -> bool {
        match task {
            TaskKind::Recruit => self.recruit,
            TaskKind::Train => self.train,
            TaskKind::Build => self.build,
            TaskKind::Explore => self.explore,
            TaskKind::Cave => self.cave,
            TaskKind::Farm => self.farm,
        }
    }

    pub fn set_enabled(&mut self, task: TaskKind, enabled: bool) {
        match task {
            TaskKind::Recruit => self.recruit = enabled,
            TaskKind::Train => self.train = enabled,
            TaskKind::Build => self.build = enabled,
            TaskKind::Explore => self.explore = enabled,
            TaskKind::Cave => self.cave = enabled,
            TaskKind::Farm => self.farm = enabled,
        }
    }

    pub fn resource_enabled(&self, resource: ResourceKind) -> bool {
        match resource {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Gold => self.gold,
        }
    }

    pub fn set_resource_enabled(&mut self, resource: ResourceKind, enabled: bool) {
        match resource {
            ResourceKind::Food => self.food = enabled,
            ResourceKind::Wood => self.wood = enabled,
            ResourceKind::Stone => self.stone = enabled,
            ResourceKind::Gold => self.gold = enabled,
        }
    }

    pub fn set_army_count(&mut self, count: u8) {
        self.army_count = count.clamp(1, 5);
    }

    /// True while any task switch is on; the control loop exits when this
    /// turns false.
    pub fn any_enabled(&self) -> bool {
        self.recruit || self.train || self.build || self.explore || self.cave || self.farm
    }
}

/// Commands serialized through a device runner's inbound channel. The runner
/// is the single writer of its own state; everyone else talks to it here.
#[derive(Debug, Clone)]
pub enum RunnerCommand {
    UpdateTasks(TaskSet),
    Shutdown,
}

/// Observable events published by runners for operator inspection.
#[derive(Debug, Clone)]
pub enum AutomationEvent {
    FrameCaptured { device: String, png: Vec<u8> },
    InterruptHandled { device: String, rule: &'static str },
    TaskDispatched { device: String, task: TaskKind },
    IterationFailed { device: String, detail: String },
    RunnerStopped { device: String },
}

/// Lifecycle of a device's control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    /// No tasks enabled, no loop running.
    Idle,
    /// Loop running, consuming frames.
    Active,
    /// Loop torn down by an explicit pause; no device I/O occurs.
    Paused,
    /// Tasks are enabled but no loop is running (exited or never started).
    Stopped,
}
