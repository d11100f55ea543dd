//! Scouting: fog exploration and cave probing
//!
//! All three flows start by tapping the scout camp coordinate. Combined
//! mode (explore and cave both enabled) branches on the cave-entry
//! indicator and a depth marker, which makes it behave differently from
//! running either flow alone.

use super::TaskContext;
use crate::adb::{AdbResult, DeviceBridge};
use crate::vision;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreMode {
    Explore,
    CaveProbe,
    Combined,
}

const EXPLORE_SEQUENCE: [&str; 5] = [
    "explore/scout_1.png",
    "explore/scout_2.png",
    "explore/scout_3.png",
    "explore/send.png",
    "goback.png",
];

const CAVE_EXPLORE_SEQUENCE: [&str; 4] = [
    "explore/scout_2.png",
    "explore/scout_3.png",
    "explore/send.png",
    "goback.png",
];

const CAVE_PROBE_SEQUENCE: [&str; 3] = ["cave/probe.png", "explore/send.png", "goback.png"];

// Cave menu positions that have no stable template.
const CAVE_MENU_TAPS: [(u32, u32); 2] = [(750, 212), (993, 605)];

pub async fn run<B: DeviceBridge>(ctx: &TaskContext<'_, B>, mode: ExploreMode) -> AdbResult<()> {
    let Some((x, y)) = ctx.coordinate("scout_camp") else {
        return Ok(());
    };
    log::info!("[{}] scouting ({mode:?})", ctx.device);
    ctx.tap(x, y).await?;
    ctx.settle().await;

    match mode {
        ExploreMode::Explore => {
            ctx.tap_sequence(&EXPLORE_SEQUENCE).await?;
        }
        ExploreMode::CaveProbe => {
            if !ctx.tap_when_found(&ctx.template("explore/scout_1.png")).await? {
                return Ok(());
            }
            tap_cave_menu(ctx).await?;
            ctx.tap_sequence(&CAVE_PROBE_SEQUENCE).await?;
        }
        ExploreMode::Combined => {
            if !ctx.tap_when_found(&ctx.template("explore/scout_1.png")).await? {
                return Ok(());
            }
            // Strict thresholds here: the cave entry icon and the depth
            // marker are small and easily confused with nearby UI.
            let cave_entry = ctx
                .wait_for_timeout(
                    &ctx.template("cave/entry.png").with_threshold(0.98),
                    Duration::from_secs(5),
                )
                .await;
            let frame = ctx.capture().await?;
            let depth_marker =
                vision::find(&frame, &ctx.template("cave/depth_marker.png").with_threshold(0.99));

            if cave_entry.is_some() && depth_marker.is_none() {
                tap_cave_menu(ctx).await?;
                ctx.tap_sequence(&CAVE_PROBE_SEQUENCE).await?;
            } else {
                ctx.tap_sequence(&CAVE_EXPLORE_SEQUENCE).await?;
            }
        }
    }
    Ok(())
}

async fn tap_cave_menu<B: DeviceBridge>(ctx: &TaskContext<'_, B>) -> AdbResult<()> {
    for (x, y) in CAVE_MENU_TAPS {
        ctx.tap(x, y).await?;
        ctx.settle().await;
    }
    Ok(())
}
