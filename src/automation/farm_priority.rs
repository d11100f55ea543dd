// Round-robin selection of the next resource kind to gather

use super::types::{ResourceKind, TaskSet};

/// Circular cursor over a device's resource priority order.
///
/// Invariant: the cursor is always within `[0, order.len())`. Advancing past
/// the end wraps to the start, so repeated calls with every kind enabled
/// visit them in strict round-robin order and never starve one kind.
#[derive(Debug, Clone)]
pub struct FarmPriority {
    order: Vec<ResourceKind>,
    cursor: usize,
}

impl FarmPriority {
    pub fn new(order: Vec<ResourceKind>, cursor: usize) -> Self {
        let order = if order.is_empty() {
            ResourceKind::DEFAULT_ORDER.to_vec()
        } else {
            order
        };
        let cursor = cursor % order.len();
        Self { order, cursor }
    }

    /// Starting at the cursor, scan at most one full cycle and return the
    /// first resource kind whose flag is enabled, advancing the cursor to
    /// just past it. No kind enabled: `None`, cursor untouched.
    pub fn next_resource(&mut self, tasks: &TaskSet) -> Option<ResourceKind> {
        for offset in 0..self.order.len() {
            let idx = (self.cursor + offset) % self.order.len();
            let kind = self.order[idx];
            if tasks.resource_enabled(kind) {
                self.cursor = (idx + 1) % self.order.len();
                return Some(kind);
            }
        }
        None
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn order(&self) -> &[ResourceKind] {
        &self.order
    }
}

impl Default for FarmPriority {
    fn default() -> Self {
        Self::new(ResourceKind::DEFAULT_ORDER.to_vec(), 0)
    }
}
