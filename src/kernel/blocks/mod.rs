//! The blocks controller: keeps canvas, palette and runtime consistent.
//!
//! All work happens on the caller's thread. Entry points are the public
//! methods below plus [`Blocks::tick`], which drains the kernel bus (runtime
//! events, async completions) and then runs due deferred tasks.

mod events;
mod lifecycle;
mod toolbox;
mod workspace;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::bridge::EventBridge;
use super::model::{DeviceDescriptor, ProgramMode};
use super::prompt::{PromptController, PromptError, PromptRequest, PromptView, VariableOptions};
use super::schedule::{Scheduler, TaskSlot};
use super::services::ports::{Canvas, Palette, Runtime, RuntimeError, Settings, Shell};
use super::services::{kernel_bus, KernelBusReceiver, KernelBusSender, KernelMessage};
use super::state::BlocksState;
use super::toolbox::MY_BLOCKS_CATEGORY;

pub use lifecycle::ModeError;

const MAX_BUS_DRAIN_PER_TICK: usize = 256;

/// Work deferred until the pending toolbox regeneration settles.
pub type ToolboxCallback = Box<dyn FnOnce(&mut Blocks)>;

/// Collaborators the controller drives.
pub struct BlocksParts {
    pub runtime: Box<dyn Runtime>,
    pub canvas: Box<dyn Canvas>,
    pub palette: Box<dyn Palette>,
    pub shell: Box<dyn Shell>,
}

pub struct Blocks {
    runtime: Box<dyn Runtime>,
    canvas: Box<dyn Canvas>,
    palette: Box<dyn Palette>,
    shell: Box<dyn Shell>,
    bus: KernelBusSender,
    rx: KernelBusReceiver,
    bridge: EventBridge,
    scheduler: Scheduler,
    state: BlocksState,
    prompt: PromptController,
    toolbox_queue: VecDeque<ToolboxCallback>,
    now: Instant,
    disposed: bool,
}

impl Blocks {
    /// Creates the controller and mounts it: injects the canvas, attaches the
    /// change listener and the runtime bridge, and applies the locale.
    pub fn new(
        parts: BlocksParts,
        catalog: Vec<DeviceDescriptor>,
        settings: &Settings,
        now: Instant,
    ) -> Self {
        let (bus, rx) = kernel_bus();
        let BlocksParts {
            runtime,
            canvas,
            palette,
            shell,
        } = parts;
        let mut blocks = Self {
            runtime,
            canvas,
            palette,
            shell,
            bridge: EventBridge::new(bus.clone()),
            bus,
            rx,
            scheduler: Scheduler::new(),
            state: BlocksState::new(
                catalog,
                settings.locale.clone(),
                Duration::from_millis(settings.targets_debounce_ms),
            ),
            prompt: PromptController::new(settings.can_use_cloud),
            toolbox_queue: VecDeque::new(),
            now,
            disposed: false,
        };
        blocks.mount(settings);
        blocks
    }

    fn mount(&mut self, settings: &Settings) {
        self.canvas.set_locale(&self.state.locale);
        self.canvas.inject(&settings.workspace);
        self.canvas.attach_change_listener();
        self.bridge.attach(self.runtime.as_mut(), events::SUBSCRIPTIONS);
        if self.state.visible {
            let locale = self.state.locale.clone();
            self.set_locale(&locale, true);
        }
        tracing::info!(locale = %self.state.locale, "blocks controller mounted");
    }

    pub fn state(&self) -> &BlocksState {
        &self.state
    }

    pub fn program_mode(&self) -> ProgramMode {
        self.state.program_mode
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_bridge_attached(&self) -> bool {
        self.bridge.is_attached()
    }

    pub fn is_pending(&self, slot: TaskSlot) -> bool {
        self.scheduler.is_pending(slot)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// One loop step: drain the bus, then run due deferred work.
    pub fn tick(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        self.now = now;
        self.drain_bus();
        for slot in self.scheduler.take_due(now) {
            if self.disposed {
                return;
            }
            match slot {
                TaskSlot::ToolboxUpdate => self.update_toolbox(),
                TaskSlot::TargetsDebounce => self.apply_target_position(),
                TaskSlot::MetricsDispatch => self.dispatch_metrics(),
            }
        }
    }

    fn drain_bus(&mut self) {
        for _ in 0..MAX_BUS_DRAIN_PER_TICK {
            let msg = match self.rx.try_recv() {
                Ok(msg) => msg,
                Err(_) => return,
            };
            match msg {
                KernelMessage::Runtime(event) => self.handle_runtime_event(event),
                KernelMessage::LocaleApplied {
                    locale,
                    refresh_workspace,
                } => self.on_locale_applied(&locale, refresh_workspace),
            }
            if self.disposed {
                return;
            }
        }
        tracing::debug!(
            limit = MAX_BUS_DRAIN_PER_TICK,
            "bus drain limit reached, continuing next tick"
        );
    }

    /// Tears down: detaches the bridge, cancels deferred work, disposes the canvas.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.bridge.detach(self.runtime.as_mut());
        self.scheduler.cancel_all();
        self.toolbox_queue.clear();
        self.state.pending_metrics.clear();
        while self.rx.try_recv().is_ok() {}
        self.canvas.dispose();
        self.disposed = true;
        tracing::info!("blocks controller disposed");
    }

    pub fn set_locale(&mut self, locale: &str, refresh_workspace: bool) {
        self.state.locale = locale.to_string();
        self.canvas.set_locale(locale);
        let done = super::services::ports::LocaleCompletion::new(
            self.bus.clone(),
            locale.to_string(),
            refresh_workspace,
        );
        self.runtime.set_locale(locale, done);
    }

    /// Runs once the runtime has applied a locale. Recycling stays off until
    /// the regenerated toolbox is in place so no half-translated flyout shows.
    fn on_locale_applied(&mut self, locale: &str, refresh_workspace: bool) {
        tracing::debug!(locale, refresh_workspace, "locale applied");
        self.canvas.set_recycling_enabled(false);
        if refresh_workspace {
            self.runtime.refresh_workspace();
        }
        self.request_toolbox_update();
        self.with_toolbox_updates(|blocks| blocks.canvas.set_recycling_enabled(true));
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.state.visible == visible {
            return;
        }
        self.state.visible = visible;
        self.canvas.set_visible(visible);
        if !visible {
            return;
        }
        if self.runtime.locale() != self.state.locale {
            let locale = self.state.locale.clone();
            self.set_locale(&locale, true);
        } else {
            self.runtime.refresh_workspace();
            self.request_toolbox_update();
        }
        self.canvas.resize();
    }

    pub fn set_any_modal_visible(&mut self, visible: bool) {
        if visible && !self.state.any_modal_visible {
            self.canvas.hide_chaff();
        }
        self.state.any_modal_visible = visible;
    }

    pub fn set_code_editor_locked(&mut self, locked: bool) {
        let was_locked = self.state.code_editor_locked;
        self.state.code_editor_locked = locked;
        if locked && !was_locked {
            self.on_code_need_update();
        }
    }

    pub fn open_prompt(&mut self, request: PromptRequest) -> Result<(), PromptError> {
        let view = self.prompt.open(request)?.clone();
        self.shell.on_prompt_changed(Some(&view));
        Ok(())
    }

    pub fn prompt_view(&self) -> Option<&PromptView> {
        self.prompt.view()
    }

    pub fn confirm_prompt(&mut self, input: &str, options: VariableOptions) -> Result<(), PromptError> {
        self.prompt.confirm(input, options, self.runtime.as_ref())?;
        self.shell.on_prompt_changed(None);
        Ok(())
    }

    pub fn cancel_prompt(&mut self) -> bool {
        let closed = self.prompt.cancel();
        if closed {
            self.shell.on_prompt_changed(None);
        }
        closed
    }

    /// Shares dropped blocks (e.g. from the backpack) into the editing target.
    pub fn handle_drop(&mut self, blocks: &str) -> Result<(), RuntimeError> {
        let target = self
            .runtime
            .editing_target()
            .ok_or_else(|| RuntimeError::TargetNotFound("<editing target>".to_string()))?;
        self.runtime.share_blocks_to_target(blocks, &target.id)?;
        self.runtime.refresh_workspace();
        self.request_toolbox_update();
        Ok(())
    }

    pub fn handle_custom_procedures_closed(&mut self) {
        self.palette.refresh_selection();
        self.palette.scroll_to_category(MY_BLOCKS_CATEGORY);
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/blocks/mod.rs"]
mod tests;
