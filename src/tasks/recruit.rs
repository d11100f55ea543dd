//! Tavern recruitment
//!
//! Triggered by the recruitment banner showing on the city view. The tavern
//! chest is opened, both confirm buttons are optional (only one shows for
//! silver vs. golden keys), and the flow always tries to back out to the
//! city afterwards.

use super::TaskContext;
use crate::adb::{AdbResult, DeviceBridge, Frame};
use crate::vision;
use std::time::Duration;

pub async fn run<B: DeviceBridge>(ctx: &TaskContext<'_, B>, frame: &Frame) -> AdbResult<()> {
    if !vision::exists(frame, &ctx.template("recruitment/banner.png")) {
        return Ok(());
    }
    let Some((x, y)) = ctx.coordinate("tavern") else {
        return Ok(());
    };
    log::info!("[{}] recruiting at tavern", ctx.device);

    ctx.tap(x, y).await?;
    ctx.settle().await;
    if !ctx.tap_when_found(&ctx.template("recruitment/open_tab.png")).await? {
        return Ok(());
    }
    if !ctx.tap_when_found(&ctx.template("recruitment/open.png")).await? {
        return Ok(());
    }
    // Chest animation.
    tokio::time::sleep(Duration::from_secs(2)).await;

    // At most one of these shows, depending on the key kind.
    ctx.tap_when_found(&ctx.template("recruitment/confirm_1.png")).await?;
    ctx.tap_when_found(&ctx.template("recruitment/confirm_2.png")).await?;

    ctx.tap_when_found(&ctx.template("always_check/back.png")).await?;
    Ok(())
}
