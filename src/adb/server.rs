// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{Device, DeviceBridge};
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Pure-Rust device bridge that talks to a running ADB server, no `adb`
/// binary required. Connections are cached per device and re-established
/// after a failed command.
pub struct AdbServerBridge {
    connections: Mutex<HashMap<String, Arc<Mutex<ADBServerDevice>>>>,
    timeout: Duration,
}

impl AdbServerBridge {
    /// Connects to the local ADB server. Failure here is fatal: nothing can
    /// be automated without the server.
    pub async fn new(timeout: Duration) -> AdbResult<Self> {
        // One devices() round-trip validates the server is reachable.
        tokio::task::spawn_blocking(|| {
            let mut server = ADBServer::default();
            server.devices()
        })
        .await?
        .map_err(|e| AdbError::ServerUnavailable {
            detail: e.to_string(),
        })?;

        Ok(Self {
            connections: Mutex::new(HashMap::new()),
            timeout,
        })
    }

    async fn device_handle(&self, device: &str) -> AdbResult<Arc<Mutex<ADBServerDevice>>> {
        {
            let cache = self.connections.lock().await;
            if let Some(handle) = cache.get(device) {
                return Ok(Arc::clone(handle));
            }
        }

        let name = device.to_string();
        let connected = tokio::task::spawn_blocking(move || {
            let mut server = ADBServer::default();
            server.get_device_by_name(&name)
        })
        .await?
        .map_err(|_| AdbError::DeviceNotFound {
            device: device.to_string(),
        })?;

        let handle = Arc::new(Mutex::new(connected));
        self.connections
            .lock()
            .await
            .insert(device.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    async fn drop_connection(&self, device: &str) {
        self.connections.lock().await.remove(device);
    }

    /// Run a shell command on the device, wrapped in `spawn_blocking` so the
    /// overall timeout can take effect even though `adb_client` blocks.
    async fn shell(&self, device: &str, args: &[&str]) -> AdbResult<Vec<u8>> {
        let handle = self.device_handle(device).await?;
        let command_str = args.join(" ");
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();

        let fut = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, String> {
            let mut out: Vec<u8> = Vec::new();
            let mut dev = handle.blocking_lock();
            let refs: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
            dev.shell_command(&refs, &mut out).map_err(|e| e.to_string())?;
            Ok(out)
        });

        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(joined) => joined?,
            Err(_) => {
                self.drop_connection(device).await;
                return Err(AdbError::Timeout {
                    duration: self.timeout,
                    description: format!("shell '{command_str}' on '{device}'"),
                });
            }
        };

        match result {
            Ok(out) => Ok(out),
            Err(detail) => {
                // Stale server connections show up as command failures; drop
                // the cached handle so the next call reconnects.
                self.drop_connection(device).await;
                Err(AdbError::CommandFailed {
                    device: device.to_string(),
                    command: command_str,
                    detail,
                })
            }
        }
    }
}

impl DeviceBridge for AdbServerBridge {
    async fn list_devices(&self) -> AdbResult<Vec<Device>> {
        let listed = tokio::task::spawn_blocking(|| {
            let mut server = ADBServer::default();
            server.devices()
        })
        .await?
        .map_err(|e| AdbError::ServerUnavailable {
            detail: e.to_string(),
        })?;

        Ok(listed
            .into_iter()
            .map(|d| Device {
                name: d.identifier,
                transport_id: None,
            })
            .collect())
    }

    async fn capture_bytes(&self, device: &str) -> AdbResult<Vec<u8>> {
        let bytes = self.shell(device, &["screencap", "-p"]).await?;
        if bytes.is_empty() {
            return Err(AdbError::CaptureFailed {
                device: device.to_string(),
                detail: "screencap produced no output".to_string(),
            });
        }
        Ok(bytes)
    }

    async fn tap(&self, device: &str, x: u32, y: u32) -> AdbResult<()> {
        let xs = x.to_string();
        let ys = y.to_string();
        self.shell(device, &["input", "tap", &xs, &ys]).await?;
        Ok(())
    }
}
