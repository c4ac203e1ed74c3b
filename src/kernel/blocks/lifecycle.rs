//! Extension and device lifecycle plus program-mode policy.

use thiserror::Error;

use super::Blocks;
use crate::kernel::devices::{policy_for_added, DeviceInsert, ModePolicy};
use crate::kernel::extension::{
    category_batches, DeviceExtensionPackage, ExtensionInfo, ExtensionRegistration,
};
use crate::kernel::model::{generator_for_device_type, ProgramMode};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    #[error("connected devices do not support switching program mode")]
    SwitchUnsupported,
}

impl Blocks {
    /// Handles both a newly added extension and refreshed block info.
    pub(super) fn on_extension_added(&mut self, info: ExtensionInfo) {
        if let Some(device_id) = info.device_id.as_deref() {
            self.select_device(device_id);
            self.state.toolbox.force_redraw = true;
        }

        for category in info.categories {
            for batch in category_batches(&category) {
                if batch.is_empty() {
                    continue;
                }
                self.canvas.define_blocks(&batch.statics);
                for dynamic in &batch.dynamics {
                    self.canvas.define_dynamic_block(dynamic);
                }
            }
            tracing::debug!(category = %category.id, "extension category defined");
            self.state.register_extension(ExtensionRegistration {
                device_id: info.device_id.clone(),
                category,
            });
        }
        self.request_toolbox_update();
    }

    fn select_device(&mut self, device_id: &str) {
        let Some(device) = self.state.device_descriptor(device_id).cloned() else {
            tracing::warn!(device_id, "extension names a device missing from the catalog");
            return;
        };
        self.shell.on_device_selected(&device);
        self.canvas.set_device(&device.device_id, &device.device_type);
        if let Some(baudrate) = device.default_baud_rate {
            self.shell.on_set_baudrate(baudrate);
        }

        match self.state.devices.insert(&device) {
            DeviceInsert::Added { was_empty } => {
                self.apply_policy(policy_for_added(was_empty, &device));
            }
            DeviceInsert::AlreadyPresent => {
                tracing::debug!(device_id, "device re-announced");
            }
        }
    }

    pub(super) fn on_extension_removed(&mut self, extension_id: &str, device_id: Option<&str>) {
        if let Some(device_id) = device_id {
            self.shell.on_device_removed(device_id);
            if self.state.devices.remove(device_id) && self.state.devices.is_empty() {
                self.apply_policy(ModePolicy::RESET);
            }
        }
        let removed = self.state.unregister_extension(extension_id, device_id);
        tracing::debug!(extension_id, removed, "extension removed");
        self.request_toolbox_update();
    }

    pub(super) fn on_device_extension_added(&mut self, package: DeviceExtensionPackage) {
        self.canvas.install_extension(&package);
        let locale = self.state.locale.clone();
        self.set_locale(&locale, false);
        self.request_toolbox_update();
    }

    fn apply_policy(&mut self, policy: ModePolicy) {
        if let Some(mode) = policy.mode {
            self.apply_program_mode(mode);
        }
        self.state.support_switch_mode = policy.support_switch;
        self.shell.on_set_support_switch_mode(policy.support_switch);
    }

    fn apply_program_mode(&mut self, mode: ProgramMode) {
        self.runtime.set_program_mode(mode);
        if self.state.program_mode == mode {
            return;
        }
        self.state.program_mode = mode;
        self.shell.on_set_code_editor_value("");
        self.canvas.set_program_mode(mode);
        self.request_toolbox_update();
        tracing::info!(mode = mode.as_str(), "program mode changed");
    }

    /// User-initiated mode switch; only allowed when the devices support both modes.
    pub fn switch_program_mode(&mut self, mode: ProgramMode) -> Result<(), ModeError> {
        if !self.state.support_switch_mode {
            return Err(ModeError::SwitchUnsupported);
        }
        self.apply_program_mode(mode);
        if self.state.code_editor_locked {
            self.on_code_need_update();
        }
        Ok(())
    }

    /// Regenerates the code view from the canvas when the code editor follows it.
    pub(super) fn on_code_need_update(&mut self) {
        if !self.state.code_editor_locked {
            self.shell.on_code_editor_is_unlocked();
            return;
        }
        if self.state.program_mode != ProgramMode::Deploy {
            return;
        }
        let Some(device) = self.state.devices.first() else {
            return;
        };
        if !self.canvas.has_content() {
            self.shell.on_set_code_editor_value("");
            return;
        }
        let generator = generator_for_device_type(&device.device_type).to_string();
        match self.canvas.workspace_to_code(&generator) {
            Ok(code) => self.shell.on_set_code_editor_value(&code),
            Err(error) => {
                tracing::warn!(generator = %generator, error = %error, "code generation failed");
                self.shell.on_set_code_editor_value(&error.to_string());
            }
        }
    }

    /// Category chosen in the palette.
    pub fn handle_category_selected(&mut self, category_id: &str) {
        self.select_category_after_update(category_id);
    }

    /// Device chosen in the palette's device list.
    pub fn handle_device_selected(&mut self, device_id: &str) {
        let needs_connection = self
            .state
            .device_descriptor(device_id)
            .is_some_and(|device| device.launch_peripheral_connection_flow);
        if needs_connection {
            self.shell.on_open_connection_modal();
        }
        self.select_category_after_update(device_id);
    }

    fn select_category_after_update(&mut self, category_id: &str) {
        let category_id = category_id.to_string();
        self.with_toolbox_updates(move |blocks| blocks.palette.select_category(&category_id));
    }
}
