//! Task modules and their shared execution context
//!
//! Each task is a short tap sequence driven by template matches. A task is a
//! no-op when its enabling flag is off or a required building coordinate was
//! never captured; that is logged, never fatal.

pub mod build;
pub mod explore;
pub mod farm;
pub mod recruit;
pub mod train;

use crate::adb::{AdbResult, DeviceBridge, Frame};
use crate::automation::poll::{WaitOpts, wait_until};
use crate::config::Settings;
use crate::state::Coordinate;
use crate::vision::{self, Point, Template, TemplateSet};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Everything a task needs for one iteration on one device.
pub struct TaskContext<'a, B: DeviceBridge> {
    pub bridge: &'a B,
    pub device: &'a str,
    pub settings: &'a Settings,
    /// Building name -> coordinate snapshot for this iteration (registry is
    /// read-only here).
    pub buildings: &'a HashMap<String, Coordinate>,
    /// Raised to cancel in-progress waits (used by the farming race).
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a, B: DeviceBridge> TaskContext<'a, B> {
    pub fn template(&self, rel: &str) -> Template {
        Template::new(self.settings.template_path(rel))
            .with_threshold(self.settings.match_threshold)
    }

    pub fn template_set(&self, rel: &str) -> TemplateSet {
        TemplateSet::new(self.settings.template_path(rel))
            .with_threshold(self.settings.match_threshold)
    }

    /// Registry lookup; a missing coordinate disables the dependent step for
    /// this iteration only.
    pub fn coordinate(&self, name: &str) -> Option<Coordinate> {
        let coord = self.buildings.get(name).copied();
        if coord.is_none() {
            log::info!("[{}] no coordinate recorded for '{name}', skipping", self.device);
        }
        coord
    }

    pub async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        self.bridge.tap(self.device, x, y).await
    }

    pub async fn tap_point(&self, point: Point) -> AdbResult<()> {
        self.tap(point.x, point.y).await
    }

    /// Settle delay between taps in a step sequence.
    pub async fn settle(&self) {
        tokio::time::sleep(self.settings.tap_delay()).await;
    }

    fn wait_opts(&self, timeout: Duration) -> WaitOpts {
        WaitOpts {
            interval: self.settings.poll_interval(),
            timeout,
        }
    }

    /// Poll the device until the template shows up, bounded by the
    /// configured search timeout. Capture failures during the wait count as
    /// a miss for that poll and the wait keeps going until the deadline.
    pub async fn wait_for(&self, template: &Template) -> Option<Point> {
        self.wait_for_timeout(template, self.settings.search_timeout())
            .await
    }

    pub async fn wait_for_timeout(&self, template: &Template, timeout: Duration) -> Option<Point> {
        let bridge = self.bridge;
        let device = self.device;
        wait_until(self.wait_opts(timeout), self.cancel, move || async move {
            match bridge.capture(device).await {
                Ok(frame) => vision::find(&frame, template),
                Err(e) => {
                    log::debug!("[{device}] capture during wait failed: {e}");
                    None
                }
            }
        })
        .await
    }

    /// Wait for the template, tap its center, settle. Returns whether the
    /// template was found; callers stop their sequence on `false`.
    pub async fn tap_when_found(&self, template: &Template) -> AdbResult<bool> {
        match self.wait_for(template).await {
            Some(point) => {
                self.tap_point(point).await?;
                self.settle().await;
                Ok(true)
            }
            None => {
                log::debug!("[{}] '{}' not found, sequence stops", self.device, template.name);
                Ok(false)
            }
        }
    }

    /// Tap through templates in order, stopping at the first that never
    /// appears. Returns whether every step was found and tapped, so callers
    /// can gate follow-up actions on the sequence actually completing.
    pub async fn tap_sequence(&self, paths: &[&str]) -> AdbResult<bool> {
        for rel in paths {
            if !self.tap_when_found(&self.template(rel)).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Capture a fresh frame mid-task.
    pub async fn capture(&self) -> AdbResult<Frame> {
        self.bridge.capture(self.device).await
    }
}
