//! Troop training
//!
//! Each unit kind has a "unit ready" template set checked against the
//! iteration's frame. When one matches, the flow opens the unit's building
//! by its recorded coordinate, taps the train button once it appears, and
//! confirms at the fixed confirm point.

use super::TaskContext;
use crate::adb::{AdbResult, DeviceBridge, Frame};
use crate::vision;

struct UnitSpec {
    label: &'static str,
    /// Registry name of the production building.
    building: &'static str,
    /// Template set signalling the unit can be trained.
    ready_set: &'static str,
    /// Train button inside the building menu.
    button: &'static str,
}

const UNITS: [UnitSpec; 4] = [
    UnitSpec {
        label: "siege",
        building: "siege_workshop",
        ready_set: "train/siege",
        button: "train/siege_button.png",
    },
    UnitSpec {
        label: "cavalry",
        building: "stable",
        ready_set: "train/cavalry",
        button: "train/cavalry_button.png",
    },
    UnitSpec {
        label: "infantry",
        building: "barracks",
        ready_set: "train/infantry",
        button: "train/infantry_button.png",
    },
    UnitSpec {
        label: "archer",
        building: "archery_range",
        ready_set: "train/archer",
        button: "train/archer_button.png",
    },
];

pub async fn run<B: DeviceBridge>(ctx: &TaskContext<'_, B>, frame: &Frame) -> AdbResult<()> {
    for unit in &UNITS {
        if !vision::exists_any(frame, &ctx.template_set(unit.ready_set)) {
            continue;
        }
        let Some((x, y)) = ctx.coordinate(unit.building) else {
            continue;
        };
        log::info!("[{}] training {}", ctx.device, unit.label);

        ctx.tap(x, y).await?;
        ctx.settle().await;
        if let Some(button) = ctx.wait_for(&ctx.template(unit.button)).await {
            ctx.tap_point(button).await?;
            ctx.settle().await;
        }
        let confirm = ctx.settings.train_confirm_point;
        ctx.tap(confirm.x, confirm.y).await?;
        ctx.settle().await;
    }
    Ok(())
}
