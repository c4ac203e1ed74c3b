use std::time::Duration;

use super::{Blocks, ToolboxCallback};
use crate::kernel::schedule::TaskSlot;
use crate::kernel::toolbox::{synthesize_toolbox, ToolboxDescriptor, ToolboxInputs};

impl Blocks {
    /// Coalesces a toolbox regeneration onto the next tick. While hidden the
    /// toolbox is only marked stale; becoming visible requests it again.
    pub fn request_toolbox_update(&mut self) {
        if self.disposed {
            return;
        }
        if !self.state.visible {
            self.state.toolbox.stale = true;
            return;
        }
        self.scheduler
            .coalesce(TaskSlot::ToolboxUpdate, self.now, Duration::ZERO);
    }

    /// Runs `f` now if no regeneration is pending, otherwise right after it.
    pub fn with_toolbox_updates(&mut self, f: impl FnOnce(&mut Blocks) + 'static) {
        if self.scheduler.is_pending(TaskSlot::ToolboxUpdate) {
            self.toolbox_queue.push_back(Box::new(f) as ToolboxCallback);
        } else {
            f(self);
        }
    }

    pub fn toolbox(&self) -> Option<&ToolboxDescriptor> {
        self.state.toolbox.rendered.as_ref()
    }

    /// Regenerates the palette, keeping the selected category's scroll offset.
    pub(super) fn update_toolbox(&mut self) {
        self.state.toolbox.stale = false;
        self.state.toolbox.passes += 1;

        let selected = self.palette.selected_category();
        let offset = self.palette.category_scroll_offset();

        if let Some(descriptor) = self.synthesize() {
            self.render_toolbox(descriptor, selected.as_deref(), offset);
        }

        self.flush_toolbox_queue();
    }

    fn synthesize(&self) -> Option<ToolboxDescriptor> {
        let target = self.runtime.editing_target();
        let stage = self.runtime.stage();
        let inputs = ToolboxInputs {
            target: target.as_ref(),
            stage: stage.as_ref(),
            devices: self.state.devices.as_slice(),
            catalog: &self.state.catalog,
            extensions: &self.state.extensions,
            mode: self.state.program_mode,
        };
        synthesize_toolbox(&inputs)
    }

    fn render_toolbox(&mut self, mut descriptor: ToolboxDescriptor, selected: Option<&str>, offset: f64) {
        let toolbox = &mut self.state.toolbox;
        let unchanged = toolbox
            .rendered
            .as_ref()
            .is_some_and(|prev| prev.same_content(&descriptor));
        if unchanged && !toolbox.force_redraw {
            tracing::debug!(revision = toolbox.revision, "toolbox unchanged");
            return;
        }
        toolbox.revision += 1;
        toolbox.force_redraw = false;
        descriptor.revision = toolbox.revision;

        self.shell.on_toolbox_will_update();
        self.palette.replace(&descriptor);
        self.shell.update_toolbox_state(&descriptor);
        tracing::debug!(
            revision = descriptor.revision,
            categories = descriptor.categories.len(),
            "toolbox replaced"
        );

        if let Some(category) = selected {
            self.restore_scroll(category, offset);
        }
        self.state.toolbox.rendered = Some(descriptor);
    }

    /// Puts the flyout back at the same offset inside `category`, or at its
    /// start if the category became shorter than the offset.
    fn restore_scroll(&mut self, category: &str, offset: f64) {
        let Some(position) = self.palette.category_position(category) else {
            return;
        };
        let length = self.palette.category_length(category).unwrap_or(0.0);
        if offset < length {
            self.palette.set_scroll_position(position + offset);
        } else {
            self.palette.set_scroll_position(position);
        }
    }

    fn flush_toolbox_queue(&mut self) {
        let queue = std::mem::take(&mut self.toolbox_queue);
        for f in queue {
            f(self);
        }
    }
}
