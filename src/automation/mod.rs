//! Automation core: interrupt resolution, task dispatch, runner lifecycle

pub mod channels;
pub mod farm_priority;
pub mod poll;
pub mod resolver;
pub mod runner;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod tests;

pub use channels::{event_channel, runner_channel};
pub use farm_priority::FarmPriority;
pub use resolver::Resolver;
pub use runner::DeviceRunner;
pub use scheduler::Scheduler;
pub use types::{
    AutomationEvent, ResourceKind, RunnerCommand, RunnerStatus, TaskKind, TaskSet,
};
