// Device bridge - the narrow contract to a connected Android device:
// enumerate devices, capture the screen, inject a tap. Two interchangeable
// implementations: the external `adb` binary and a pure-Rust ADB server
// client.

pub mod backend;
pub mod error;
pub mod server;
pub mod shell;
pub mod types;


pub use backend::{AdbBackend, BackendKind};
pub use error::{AdbError, AdbResult};
pub use shell::AdbShell;
pub use types::{Device, DeviceBridge, Frame};
