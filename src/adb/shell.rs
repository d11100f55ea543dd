use super::error::{AdbError, AdbResult};
use super::types::{Device, DeviceBridge};
use std::time::Duration;
use tokio::process::Command;

/// Device bridge backed by the external `adb` binary, mirroring what the
/// platform tools do: `adb devices`, `adb -s <dev> exec-out screencap -p`,
/// `adb -s <dev> shell input tap`.
pub struct AdbShell {
    adb_path: String,
    timeout: Duration,
}

impl AdbShell {
    /// Verify the `adb` binary is runnable. This is the only startup-time
    /// fatal precondition: without it no device can be driven.
    pub fn new(adb_path: &str, timeout: Duration) -> AdbResult<Self> {
        match std::process::Command::new(adb_path).arg("version").output() {
            Ok(out) if out.status.success() => Ok(Self {
                adb_path: adb_path.to_string(),
                timeout,
            }),
            Ok(out) => Err(AdbError::BinaryNotFound {
                detail: format!("'{adb_path} version' returned non-zero ({})", out.status),
            }),
            Err(e) => Err(AdbError::BinaryNotFound {
                detail: e.to_string(),
            }),
        }
    }

    pub fn parse_devices(output: &str) -> Vec<Device> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 && parts[1] == "device" {
                    let transport_id = parts.iter().find_map(|part| {
                        part.strip_prefix("transport_id:").map(|tid| tid.to_string())
                    });
                    Some(Device {
                        name: parts[0].to_string(),
                        transport_id,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    async fn run_adb(&self, device: Option<&str>, args: &[&str]) -> AdbResult<Vec<u8>> {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(dev) = device {
            cmd.arg("-s").arg(dev);
        }
        cmd.args(args);

        let command_str = args.join(" ");
        let dev_name = device.unwrap_or("-").to_string();
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| AdbError::Timeout {
                duration: self.timeout,
                description: format!("adb {command_str} on '{dev_name}'"),
            })?
            .map_err(|e| AdbError::CommandFailed {
                device: dev_name.clone(),
                command: command_str.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                device: dev_name,
                command: command_str,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl DeviceBridge for AdbShell {
    async fn list_devices(&self) -> AdbResult<Vec<Device>> {
        let stdout = self.run_adb(None, &["devices", "-l"]).await?;
        Ok(Self::parse_devices(&String::from_utf8_lossy(&stdout)))
    }

    async fn capture_bytes(&self, device: &str) -> AdbResult<Vec<u8>> {
        let bytes = self
            .run_adb(Some(device), &["exec-out", "screencap", "-p"])
            .await?;
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
        self.run_adb(Some(device), &["shell", "input", "tap", &xs, &ys])
            .await?;
        Ok(())
    }
}
