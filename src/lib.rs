pub mod adb;
pub mod args;
pub mod automation;
pub mod config;
pub mod state;
pub mod tasks;
pub mod vision;

pub use adb::{AdbBackend, BackendKind};
pub use automation::Scheduler;
pub use config::Settings;
pub use state::StateStore;
