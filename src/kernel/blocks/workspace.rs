use std::time::Duration;

use super::Blocks;
use crate::kernel::model::{TargetMetrics, WorkspaceViewport};
use crate::kernel::schedule::TaskSlot;

/// Flyout fields that mirror the editing target's position.
const POSITION_FIELDS: [(&str, Axis); 6] = [
    ("glidex", Axis::X),
    ("glidey", Axis::Y),
    ("movex", Axis::X),
    ("movey", Axis::Y),
    ("setx", Axis::X),
    ("sety", Axis::Y),
];

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Blocks {
    /// Reloads the canvas with `script` for `target_id`.
    ///
    /// The change listener is off while loading so the load is not recorded as
    /// user edits, and undo history never crosses targets.
    pub(super) fn reconcile_workspace(&mut self, target_id: &str, script: &str) {
        self.request_toolbox_update();

        if !self.state.viewports.contains_key(target_id) {
            self.schedule_metrics_capture(target_id);
        }

        self.canvas.detach_change_listener();
        if let Err(error) = self.canvas.clear_and_load(script) {
            tracing::error!(target_id, error = %error, "Workspace Update Error: {error}");
        }
        self.canvas.attach_change_listener();

        if let Some(viewport) = self.state.viewports.get(target_id).copied() {
            self.canvas.set_viewport(viewport);
            self.canvas.resize();
        }
        self.canvas.clear_undo();
    }

    fn schedule_metrics_capture(&mut self, target_id: &str) {
        self.state.pending_metrics.insert(target_id.to_string());
        self.scheduler
            .coalesce(TaskSlot::MetricsDispatch, self.now, Duration::ZERO);
    }

    /// Captures the canvas viewport for targets still being edited.
    pub(super) fn dispatch_metrics(&mut self) {
        let pending = std::mem::take(&mut self.state.pending_metrics);
        let Some(current) = self.runtime.editing_target() else {
            return;
        };
        if pending.contains(&current.id) {
            let viewport = self.canvas.viewport();
            self.record_metrics(current.id, viewport);
        }
    }

    /// Canvas scroll or zoom changed; the viewport is recorded next tick.
    pub fn on_canvas_metrics_changed(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(target) = self.runtime.editing_target() {
            self.schedule_metrics_capture(&target.id);
        }
    }

    fn record_metrics(&mut self, target_id: String, viewport: WorkspaceViewport) {
        self.state.viewports.insert(target_id.clone(), viewport);
        self.shell.update_metrics(&TargetMetrics {
            target_id,
            viewport,
        });
    }

    pub fn remembered_viewport(&self, target_id: &str) -> Option<WorkspaceViewport> {
        self.state.viewports.get(target_id).copied()
    }

    pub(super) fn on_targets_update(&mut self) {
        let delay = self.state.targets_debounce;
        self.scheduler
            .debounce(TaskSlot::TargetsDebounce, self.now, delay);
    }

    /// Pushes the editing target's rounded position into the motion fields.
    pub(super) fn apply_target_position(&mut self) {
        let Some(target) = self.runtime.editing_target() else {
            return;
        };
        let (x, y) = target.rounded_position();
        self.with_toolbox_updates(move |blocks| {
            for (field, axis) in POSITION_FIELDS {
                let value = match axis {
                    Axis::X => &x,
                    Axis::Y => &y,
                };
                blocks.palette.set_block_field(field, value);
            }
        });
    }
}
