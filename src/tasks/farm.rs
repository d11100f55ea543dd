//! Resource gathering
//!
//! Picks the next enabled resource from the device's rotation, skips the
//! whole pass when the army budget is already committed, then drives the map
//! search flow. After the gather button, the game lands on one of two
//! screens in unpredictable order, so two probes race for them and the
//! first to see its screen claims the finish; the loser's wait is
//! cancelled.

use super::TaskContext;
use crate::adb::{AdbError, AdbResult, DeviceBridge};
use crate::automation::farm_priority::FarmPriority;
use crate::automation::types::TaskSet;
use crate::vision;
use std::sync::atomic::{AtomicBool, Ordering};

pub async fn run<B: DeviceBridge>(
    ctx: &TaskContext<'_, B>,
    tasks: &TaskSet,
    priority: &mut FarmPriority,
) -> AdbResult<()> {
    let Some(resource) = priority.next_resource(tasks) else {
        return Ok(());
    };

    let frame = ctx.capture().await?;
    let busy = format!("armies/busy_{}.png", tasks.army_count);
    if vision::exists(&frame, &ctx.template(&busy)) {
        log::debug!("[{}] {} armies out, gathering skipped", ctx.device, tasks.army_count);
        return Ok(());
    }
    if !vision::exists(&frame, &ctx.template("farm/boost_ready.png")) {
        ctx.tap_when_found(&ctx.template("farm/use_boost.png")).await?;
    }

    log::info!("[{}] gathering {resource:?}", ctx.device);
    let resource_rel = format!("farm/{}", resource.template_name());
    let nav = [
        "home.png",
        "search.png",
        resource_rel.as_str(),
        "searching.png",
        "farm/gather_button.png",
    ];
    if !ctx.tap_sequence(&nav).await? {
        log::debug!(
            "[{}] gather navigation stopped early, no finish race",
            ctx.device
        );
        return Ok(());
    }

    finish_race(ctx).await
}

/// Race the two possible post-gather screens. The claim cell guarantees at
/// most one branch performs taps; the winner cancels the loser's wait.
async fn finish_race<B: DeviceBridge>(ctx: &TaskContext<'_, B>) -> AdbResult<()> {
    let claim = AtomicBool::new(false);
    let cancel_matching = AtomicBool::new(false);
    let cancel_gather_now = AtomicBool::new(false);

    let matching_ctx = probe_ctx(ctx, &cancel_matching);
    let gather_now_ctx = probe_ctx(ctx, &cancel_gather_now);

    let matching = async {
        if matching_ctx
            .wait_for(&matching_ctx.template("farm/matching.png"))
            .await
            .is_some()
            && claim
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            cancel_gather_now.store(true, Ordering::SeqCst);
            // A march was auto-matched; dismiss the dialog and back out.
            let center = ctx.settings.screen_center;
            ctx.tap(center.x, center.y).await?;
            ctx.settle().await;
            ctx.tap_when_found(&ctx.template("goback.png")).await?;
            ctx.wait_for(&ctx.template("home.png")).await;
        }
        Ok::<_, AdbError>(())
    };

    let gather_now = async {
        if let Some(button) = gather_now_ctx
            .wait_for(&gather_now_ctx.template("farm/gather_now.png"))
            .await
            && claim
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            cancel_matching.store(true, Ordering::SeqCst);
            ctx.tap_point(button).await?;
            ctx.settle().await;
            if let Some(march) = ctx.wait_for(&ctx.template("farm/matched.png")).await {
                ctx.tap_point(march).await?;
                ctx.settle().await;
            }
            ctx.tap_when_found(&ctx.template("goback.png")).await?;
            ctx.wait_for(&ctx.template("home.png")).await;
        }
        Ok::<_, AdbError>(())
    };

    let (matching, gather_now) = tokio::join!(matching, gather_now);
    matching?;
    gather_now?;
    Ok(())
}

fn probe_ctx<'c, B: DeviceBridge>(
    ctx: &'c TaskContext<'_, B>,
    cancel: &'c AtomicBool,
) -> TaskContext<'c, B> {
    TaskContext {
        bridge: ctx.bridge,
        device: ctx.device,
        settings: ctx.settings,
        buildings: ctx.buildings,
        cancel: Some(cancel),
    }
}
