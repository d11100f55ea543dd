use super::error::AdbResult;
use super::server::AdbServerBridge;
use super::shell::AdbShell;
use super::types::{Device, DeviceBridge, Frame};
use std::time::Duration;

/// Which device-link implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Shell,
    Server,
}

pub enum AdbBackend {
    Shell(AdbShell),
    Server(AdbServerBridge),
}

impl AdbBackend {
    pub async fn new(kind: BackendKind, adb_path: &str, timeout: Duration) -> AdbResult<Self> {
        match kind {
            BackendKind::Shell => Ok(AdbBackend::Shell(AdbShell::new(adb_path, timeout)?)),
            BackendKind::Server => Ok(AdbBackend::Server(AdbServerBridge::new(timeout).await?)),
        }
    }
}

impl DeviceBridge for AdbBackend {
    async fn list_devices(&self) -> AdbResult<Vec<Device>> {
        match self {
            AdbBackend::Shell(s) => s.list_devices().await,
            AdbBackend::Server(r) => r.list_devices().await,
        }
    }

    async fn capture_bytes(&self, device: &str) -> AdbResult<Vec<u8>> {
        match self {
            AdbBackend::Shell(s) => s.capture_bytes(device).await,
            AdbBackend::Server(r) => r.capture_bytes(device).await,
        }
    }

    async fn capture(&self, device: &str) -> AdbResult<Frame> {
        match self {
            AdbBackend::Shell(s) => s.capture(device).await,
            AdbBackend::Server(r) => r.capture(device).await,
        }
    }

    async fn tap(&self, device: &str, x: u32, y: u32) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.tap(device, x, y).await,
            AdbBackend::Server(r) => r.tap(device, x, y).await,
        }
    }
}
