// Communication channels for the automation core
use super::types::{AutomationEvent, RunnerCommand};
use tokio::sync::mpsc;

/// Inbound command channel for one device runner.
pub fn runner_channel() -> (mpsc::Sender<RunnerCommand>, mpsc::Receiver<RunnerCommand>) {
    mpsc::channel(32)
}

/// Shared event channel for operator inspection.
pub fn event_channel() -> (mpsc::Sender<AutomationEvent>, mpsc::Receiver<AutomationEvent>) {
    mpsc::channel(64)
}
