//! Interrupt detection and handling
//!
//! Before any task runs, every iteration's frame is checked against an
//! ordered rule list. The first rule whose trigger matches handles the
//! interrupt and the iteration ends there; task dispatch never races a
//! pending dialog. Ordering is part of the contract: a disconnect overlay
//! also covers the go-back arrow, so the disconnect rule must win.

use crate::adb::{AdbResult, DeviceBridge, Frame};
use crate::config::{FixedPoint, Settings};
use crate::tasks::TaskContext;
use crate::vision::{self, Point, Template, TemplateSet};
use std::time::Duration;

enum Trigger {
    Single(Template),
    AnyOf(TemplateSet),
}

enum Action {
    /// Tap a fixed screen point.
    TapFixed(FixedPoint),
    /// Wait out the login cooldown, then tap the confirm button.
    ConfirmLogin { confirm: Template, cooldown: Duration },
    /// Tap the center of whatever matched.
    TapMatch,
}

pub struct InterruptRule {
    pub name: &'static str,
    trigger: Trigger,
    action: Action,
}

/// Ordered interrupt rules for one device loop.
pub struct Resolver {
    rules: Vec<InterruptRule>,
    home: Template,
}

impl Resolver {
    pub fn new(settings: &Settings) -> Self {
        let template = |rel: &str| {
            Template::new(settings.template_path(rel)).with_threshold(settings.match_threshold)
        };
        let rules = vec![
            InterruptRule {
                name: "disconnect",
                trigger: Trigger::Single(template("disconnected.png")),
                action: Action::TapFixed(settings.reconnect_point),
            },
            InterruptRule {
                name: "alt_login",
                trigger: Trigger::Single(template("alt_login.png")),
                action: Action::ConfirmLogin {
                    confirm: template("login_confirm.png"),
                    cooldown: settings.login_cooldown(),
                },
            },
            InterruptRule {
                name: "always_check",
                trigger: Trigger::AnyOf(
                    TemplateSet::new(settings.template_path("always_check"))
                        .with_threshold(settings.match_threshold),
                ),
                action: Action::TapMatch,
            },
            InterruptRule {
                name: "go_back",
                trigger: Trigger::Single(template("goback.png")),
                action: Action::TapMatch,
            },
        ];
        Self {
            rules,
            home: template("home.png"),
        }
    }

    /// First matching rule against the frame, in rule order. Pure: no device
    /// I/O happens here.
    pub fn probe(&self, frame: &Frame) -> Option<(&InterruptRule, Point)> {
        self.rules.iter().find_map(|rule| {
            let hit = match &rule.trigger {
                Trigger::Single(template) => vision::find(frame, template),
                Trigger::AnyOf(set) => vision::find_any(frame, set),
            };
            hit.map(|point| (rule, point))
        })
    }

    /// Probe the frame and handle the first matching interrupt. Returns the
    /// handled rule's name, or `None` when the frame is clean and task
    /// dispatch may proceed.
    pub async fn resolve<B: DeviceBridge>(
        &self,
        ctx: &TaskContext<'_, B>,
        frame: &Frame,
    ) -> AdbResult<Option<&'static str>> {
        let Some((rule, point)) = self.probe(frame) else {
            return Ok(None);
        };
        log::info!("[{}] interrupt '{}' at ({}, {})", ctx.device, rule.name, point.x, point.y);

        match &rule.action {
            Action::TapFixed(target) => {
                ctx.tap(target.x, target.y).await?;
                ctx.settle().await;
            }
            Action::ConfirmLogin { confirm, cooldown } => {
                if let Some(button) = ctx.wait_for(confirm).await {
                    log::warn!(
                        "[{}] another session logged in, reclaiming in {}s",
                        ctx.device,
                        cooldown.as_secs()
                    );
                    tokio::time::sleep(*cooldown).await;
                    ctx.tap_point(button).await?;
                    ctx.settle().await;
                }
            }
            Action::TapMatch => {
                ctx.tap_point(point).await?;
                ctx.settle().await;
            }
        }

        // Give the game a chance to land back on the city view; a miss here
        // is fine, the next iteration re-probes anyway.
        ctx.wait_for(&self.home).await;
        Ok(Some(rule.name))
    }
}
