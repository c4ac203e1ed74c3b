use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Duration;

use super::devices::DeviceSet;
use super::extension::ExtensionRegistration;
use super::model::{DeviceDescriptor, ProgramMode, WorkspaceViewport};
use super::toolbox::ToolboxDescriptor;

#[derive(Debug, Default)]
pub struct ToolboxState {
    /// Last descriptor placed into the palette.
    pub rendered: Option<ToolboxDescriptor>,
    pub revision: u64,
    /// Bump the revision on the next regeneration even if content is unchanged.
    pub force_redraw: bool,
    /// A regeneration was requested while the canvas was hidden.
    pub stale: bool,
    /// Regenerations run, including ones that left the palette as is.
    pub passes: u64,
}

#[derive(Debug)]
pub struct BlocksState {
    pub catalog: Vec<DeviceDescriptor>,
    pub devices: DeviceSet,
    pub extensions: Vec<ExtensionRegistration>,
    pub program_mode: ProgramMode,
    pub support_switch_mode: bool,
    pub viewports: FxHashMap<String, WorkspaceViewport>,
    /// Targets whose viewport is captured on the next metrics dispatch.
    pub pending_metrics: FxHashSet<String>,
    pub locale: String,
    pub visible: bool,
    pub any_modal_visible: bool,
    pub code_editor_locked: bool,
    pub toolbox: ToolboxState,
    pub targets_debounce: Duration,
}

impl BlocksState {
    pub fn new(catalog: Vec<DeviceDescriptor>, locale: String, targets_debounce: Duration) -> Self {
        Self {
            catalog,
            devices: DeviceSet::new(),
            extensions: Vec::new(),
            program_mode: ProgramMode::Interactive,
            support_switch_mode: false,
            viewports: FxHashMap::default(),
            pending_metrics: FxHashSet::default(),
            locale,
            visible: true,
            any_modal_visible: false,
            code_editor_locked: false,
            toolbox: ToolboxState::default(),
            targets_debounce,
        }
    }

    pub fn device_descriptor(&self, device_id: &str) -> Option<&DeviceDescriptor> {
        self.catalog.iter().find(|d| d.device_id == device_id)
    }

    /// Adds or replaces the registration with the same category id.
    pub fn register_extension(&mut self, registration: ExtensionRegistration) {
        match self
            .extensions
            .iter_mut()
            .find(|ext| ext.id() == registration.id())
        {
            Some(existing) => *existing = registration,
            None => self.extensions.push(registration),
        }
    }

    /// Drops registrations with category id `extension_id` and, when given,
    /// every registration owned by `device_id`.
    pub fn unregister_extension(&mut self, extension_id: &str, device_id: Option<&str>) -> usize {
        let before = self.extensions.len();
        self.extensions.retain(|ext| {
            ext.id() != extension_id
                && (device_id.is_none() || ext.device_id.as_deref() != device_id)
        });
        before - self.extensions.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/state.rs"]
mod tests;
