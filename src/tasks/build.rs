//! Construction via the builder's hut
//!
//! Walks the build menu, asks for alliance help, and returns to the city.
//! The sequence stops quietly at the first screen that never appears, which
//! covers both "no idle builder" and "nothing affordable".

use super::TaskContext;
use crate::adb::{AdbResult, DeviceBridge};

const BUILD_SEQUENCE: [&str; 7] = [
    "build/build_1.png",
    "build/build_2.png",
    "build/build_3.png",
    "build/build_4.png",
    "build/help.png",
    "home.png",
    "goback.png",
];

pub async fn run<B: DeviceBridge>(ctx: &TaskContext<'_, B>) -> AdbResult<()> {
    let Some((x, y)) = ctx.coordinate("builder_hut") else {
        return Ok(());
    };
    log::info!("[{}] checking construction", ctx.device);

    ctx.tap(x, y).await?;
    ctx.settle().await;
    ctx.tap_sequence(&BUILD_SEQUENCE).await?;
    Ok(())
}
