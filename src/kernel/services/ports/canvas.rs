use serde_json::Value;
use thiserror::Error;

use crate::kernel::extension::{DeviceExtensionPackage, DynamicBlock};
use crate::kernel::model::{ProgramMode, WorkspaceViewport};
use crate::kernel::services::ports::WorkspaceOptions;
use crate::kernel::toolbox::ToolboxDescriptor;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("failed to load script: {0}")]
    Load(String),
    #[error("code generation failed: {0}")]
    Generate(String),
}

/// The editable block workspace.
pub trait Canvas {
    fn inject(&mut self, options: &WorkspaceOptions);

    /// Listener that records user edits (and undo history).
    fn attach_change_listener(&mut self);
    fn detach_change_listener(&mut self);

    fn clear_and_load(&mut self, script: &str) -> Result<(), CanvasError>;
    fn has_content(&self) -> bool;

    fn viewport(&self) -> WorkspaceViewport;
    fn set_viewport(&mut self, viewport: WorkspaceViewport);
    fn resize(&mut self);
    fn clear_undo(&mut self);

    fn glow_stack(&mut self, id: &str, on: bool);
    fn glow_block(&mut self, id: &str, on: bool);
    fn report_value(&mut self, id: &str, value: &str);

    fn define_blocks(&mut self, definitions: &[Value]);
    fn define_dynamic_block(&mut self, block: &DynamicBlock);
    fn install_extension(&mut self, package: &DeviceExtensionPackage);

    fn set_locale(&mut self, locale: &str);
    fn set_program_mode(&mut self, mode: ProgramMode);
    fn set_device(&mut self, device_id: &str, device_type: &str);
    fn set_visible(&mut self, visible: bool);
    fn set_recycling_enabled(&mut self, enabled: bool);
    fn refresh_status_buttons(&mut self);
    fn hide_chaff(&mut self);

    fn workspace_to_code(&self, generator: &str) -> Result<String, CanvasError>;
    fn dispose(&mut self);
}

/// The category list and flyout attached to the canvas.
///
/// Positions and lengths are in flyout scroll units.
pub trait Palette {
    fn selected_category(&self) -> Option<String>;
    fn category_scroll_offset(&self) -> f64;
    fn category_position(&self, id: &str) -> Option<f64>;
    fn category_length(&self, id: &str) -> Option<f64>;

    fn replace(&mut self, descriptor: &ToolboxDescriptor);
    fn set_scroll_position(&mut self, position: f64);
    fn select_category(&mut self, id: &str);
    fn scroll_to_category(&mut self, id: &str);
    fn refresh_selection(&mut self);

    /// Sets a field in the flyout by field id; `false` when no such field exists.
    fn set_block_field(&mut self, field_id: &str, value: &str) -> bool;
}
