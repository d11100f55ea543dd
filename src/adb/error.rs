use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for device bridge operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all device bridge operations.
///
/// Everything except `BinaryNotFound` and `ServerUnavailable` is transient
/// from the scheduler's point of view: the current iteration is abandoned and
/// the loop retries after a delay.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error(
        "'adb' binary not found or not runnable: {detail}. Install Android Platform Tools or run with --impl=server."
    )]
    BinaryNotFound { detail: String },

    #[error("ADB server unavailable: {detail}")]
    ServerUnavailable { detail: String },

    #[error("Device '{device}' not found")]
    DeviceNotFound { device: String },

    #[error("Command '{command}' failed on device '{device}': {detail}")]
    CommandFailed {
        device: String,
        command: String,
        detail: String,
    },

    #[error("Screen capture on device '{device}' returned no frame: {detail}")]
    CaptureFailed { device: String, detail: String },

    #[error("Captured frame could not be decoded: {detail}")]
    FrameDecodeFailed { detail: String },

    #[error("Operation timed out after {duration:?}: {description}")]
    Timeout {
        duration: Duration,
        description: String,
    },

    #[error("Task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl AdbError {
    /// Fatal errors abort startup; everything else is retried by the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdbError::BinaryNotFound { .. } | AdbError::ServerUnavailable { .. }
        )
    }
}
