use crate::kernel::model::{DeviceDescriptor, TargetMetrics};
use crate::kernel::prompt::PromptView;
use crate::kernel::toolbox::ToolboxDescriptor;

/// Surrounding UI state the controller reports into.
pub trait Shell {
    fn update_toolbox_state(&mut self, descriptor: &ToolboxDescriptor);
    fn on_toolbox_will_update(&mut self);
    fn on_toolbox_did_update(&mut self);

    fn on_device_selected(&mut self, device: &DeviceDescriptor);
    fn on_device_removed(&mut self, device_id: &str);
    fn on_set_support_switch_mode(&mut self, supported: bool);
    fn on_set_baudrate(&mut self, baudrate: u32);

    fn on_set_code_editor_value(&mut self, value: &str);
    fn on_code_editor_is_unlocked(&mut self);

    fn update_metrics(&mut self, metrics: &TargetMetrics);
    fn on_open_connection_modal(&mut self);
    fn on_prompt_changed(&mut self, prompt: Option<&PromptView>);
}
