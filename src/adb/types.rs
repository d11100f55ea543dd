// Core device bridge types and traits
use super::error::{AdbError, AdbResult};
use image::GrayImage;
use serde::Serialize;

/// A connected device as reported by `adb devices`.
#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Device {
    pub name: String,
    pub transport_id: Option<String>,
}

/// One screen capture from a device at a point in time.
///
/// Holds both the raw PNG bytes (for the inspection channel) and the decoded
/// grayscale buffer the matcher works on. A frame is ephemeral: it lives for
/// one loop iteration and is never retained beyond that iteration's
/// decisions.
#[derive(Debug, Clone)]
pub struct Frame {
    pub png: Vec<u8>,
    pub gray: GrayImage,
    pub duration_ms: u128,
}

impl Frame {
    pub fn decode(png: Vec<u8>, duration_ms: u128) -> AdbResult<Self> {
        let decoded =
            image::load_from_memory(&png).map_err(|e| AdbError::FrameDecodeFailed {
                detail: e.to_string(),
            })?;
        Ok(Self {
            gray: decoded.to_luma8(),
            png,
            duration_ms,
        })
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

// Trait defining the device link (shell or server implementations).
// The contract is deliberately narrow: enumerate devices, capture a frame,
// inject a tap. All calls carry bounded timeouts and report failures as
// values. Futures are Send so runners can be spawned over a generic bridge.
pub trait DeviceBridge: Send + Sync {
    fn list_devices(&self) -> impl Future<Output = AdbResult<Vec<Device>>> + Send;

    // Raw backend-specific capture (implemented per backend)
    fn capture_bytes(&self, device: &str) -> impl Future<Output = AdbResult<Vec<u8>>> + Send;

    // Default high-level capture with decode and timing
    fn capture(&self, device: &str) -> impl Future<Output = AdbResult<Frame>> + Send {
        async move {
            let start = std::time::Instant::now();
            let bytes = self.capture_bytes(device).await?;
            Frame::decode(bytes, start.elapsed().as_millis())
        }
    }

    fn tap(&self, device: &str, x: u32, y: u32) -> impl Future<Output = AdbResult<()>> + Send;
}
