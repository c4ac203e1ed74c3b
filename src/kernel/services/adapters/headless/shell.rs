use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::kernel::model::{DeviceDescriptor, TargetMetrics};
use crate::kernel::prompt::PromptView;
use crate::kernel::services::ports::Shell;
use crate::kernel::toolbox::ToolboxDescriptor;

/// Everything the shell has been told, in a form the replay report can print.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShellRecord {
    pub log: Vec<String>,
    pub toolbox_revision: Option<u64>,
    pub toolbox_categories: Vec<String>,
    pub selected_device: Option<String>,
    pub support_switch_mode: bool,
    pub baudrate: Option<u32>,
    pub code_editor_value: String,
    pub prompt_title: Option<String>,
    pub connection_modal_opened: usize,
}

#[derive(Clone, Default)]
pub struct HeadlessShell {
    record: Rc<RefCell<ShellRecord>>,
}

impl HeadlessShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> ShellRecord {
        self.record.borrow().clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.record.borrow().log.clone()
    }

    /// Number of log lines starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.record
            .borrow()
            .log
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    pub fn clear_log(&self) {
        self.record.borrow_mut().log.clear();
    }

    fn push(&self, line: String) {
        self.record.borrow_mut().log.push(line);
    }
}

impl Shell for HeadlessShell {
    fn update_toolbox_state(&mut self, descriptor: &ToolboxDescriptor) {
        {
            let mut record = self.record.borrow_mut();
            record.toolbox_revision = Some(descriptor.revision);
            record.toolbox_categories = descriptor.category_ids().map(str::to_string).collect();
        }
        self.push(format!("update_toolbox_state revision={}", descriptor.revision));
    }

    fn on_toolbox_will_update(&mut self) {
        self.push("toolbox_will_update".to_string());
    }

    fn on_toolbox_did_update(&mut self) {
        self.push("toolbox_did_update".to_string());
    }

    fn on_device_selected(&mut self, device: &DeviceDescriptor) {
        self.record.borrow_mut().selected_device = Some(device.device_id.clone());
        self.push(format!("device_selected {}", device.device_id));
    }

    fn on_device_removed(&mut self, device_id: &str) {
        {
            let mut record = self.record.borrow_mut();
            if record.selected_device.as_deref() == Some(device_id) {
                record.selected_device = None;
            }
        }
        self.push(format!("device_removed {device_id}"));
    }

    fn on_set_support_switch_mode(&mut self, supported: bool) {
        self.record.borrow_mut().support_switch_mode = supported;
        self.push(format!("support_switch_mode {supported}"));
    }

    fn on_set_baudrate(&mut self, baudrate: u32) {
        self.record.borrow_mut().baudrate = Some(baudrate);
        self.push(format!("baudrate {baudrate}"));
    }

    fn on_set_code_editor_value(&mut self, value: &str) {
        self.record.borrow_mut().code_editor_value = value.to_string();
        self.push(format!("code_editor_value len={}", value.len()));
    }

    fn on_code_editor_is_unlocked(&mut self) {
        self.push("code_editor_unlocked".to_string());
    }

    fn update_metrics(&mut self, metrics: &TargetMetrics) {
        let v = metrics.viewport;
        self.push(format!(
            "metrics {} scroll=({}, {}) scale={}",
            metrics.target_id, v.scroll_x, v.scroll_y, v.scale
        ));
    }

    fn on_open_connection_modal(&mut self) {
        self.record.borrow_mut().connection_modal_opened += 1;
        self.push("open_connection_modal".to_string());
    }

    fn on_prompt_changed(&mut self, prompt: Option<&PromptView>) {
        self.record.borrow_mut().prompt_title = prompt.map(|p| p.title.clone());
        match prompt {
            Some(view) => self.push(format!("prompt_opened {}", view.title)),
            None => self.push("prompt_closed".to_string()),
        }
    }
}
