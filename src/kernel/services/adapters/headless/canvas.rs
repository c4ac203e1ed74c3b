use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use crate::kernel::extension::{DeviceExtensionPackage, DynamicBlock};
use crate::kernel::model::{ProgramMode, WorkspaceViewport};
use crate::kernel::services::ports::{Canvas, CanvasError, Palette, WorkspaceOptions};
use crate::kernel::toolbox::{ToolboxDescriptor, ToolboxItem};

/// Flyout height of one palette item, in scroll units.
pub const ITEM_HEIGHT: f64 = 48.0;
/// Flyout height of a category label.
pub const LABEL_HEIGHT: f64 = 32.0;

const GENERATORS: &[&str] = &["arduino", "python"];

#[derive(Default)]
struct CanvasInner {
    options: Option<WorkspaceOptions>,
    change_listener: bool,
    content: Option<Value>,
    viewport: WorkspaceViewport,
    resizes: usize,
    undo_depth: usize,
    glowing_stacks: FxHashSet<String>,
    glowing_blocks: FxHashSet<String>,
    reports: Vec<(String, String)>,
    static_definitions: usize,
    dynamic_opcodes: Vec<String>,
    installed: Vec<String>,
    locale: String,
    program_mode: ProgramMode,
    device: Option<(String, String)>,
    visible: bool,
    recycling: bool,
    status_refreshes: usize,
    chaff_hidden: usize,
    disposed: bool,

    toolbox: Option<ToolboxDescriptor>,
    palette_replacements: usize,
    selected: Option<String>,
    scroll: f64,
    fields: FxHashMap<String, String>,
}

impl CanvasInner {
    /// (position, length) of every category in flyout order.
    fn layout(&self) -> Vec<(&str, f64, f64)> {
        let mut position = 0.0;
        let mut layout = Vec::new();
        if let Some(toolbox) = &self.toolbox {
            for category in &toolbox.categories {
                let length = LABEL_HEIGHT + category.items.len() as f64 * ITEM_HEIGHT;
                layout.push((category.id.as_str(), position, length));
                position += length;
            }
        }
        layout
    }

    fn category_span(&self, id: &str) -> Option<(f64, f64)> {
        self.layout()
            .into_iter()
            .find(|(cid, _, _)| *cid == id)
            .map(|(_, position, length)| (position, length))
    }
}

/// In-memory canvas that also serves as its own palette.
#[derive(Clone)]
pub struct HeadlessCanvas {
    inner: Rc<RefCell<CanvasInner>>,
}

impl Default for HeadlessCanvas {
    fn default() -> Self {
        let inner = CanvasInner {
            visible: true,
            recycling: true,
            ..CanvasInner::default()
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }
}

impl HeadlessCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_injected(&self) -> bool {
        self.inner.borrow().options.is_some()
    }

    pub fn is_change_listener_attached(&self) -> bool {
        self.inner.borrow().change_listener
    }

    pub fn content(&self) -> Option<Value> {
        self.inner.borrow().content.clone()
    }

    pub fn undo_depth(&self) -> usize {
        self.inner.borrow().undo_depth
    }

    /// Simulates a user edit; recorded only while the change listener is on.
    pub fn record_edit(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.change_listener {
            inner.undo_depth += 1;
        }
    }

    /// Simulates the user scrolling or zooming.
    pub fn scroll_to(&self, viewport: WorkspaceViewport) {
        self.inner.borrow_mut().viewport = viewport;
    }

    pub fn resize_count(&self) -> usize {
        self.inner.borrow().resizes
    }

    pub fn is_stack_glowing(&self, id: &str) -> bool {
        self.inner.borrow().glowing_stacks.contains(id)
    }

    pub fn is_block_glowing(&self, id: &str) -> bool {
        self.inner.borrow().glowing_blocks.contains(id)
    }

    pub fn reports(&self) -> Vec<(String, String)> {
        self.inner.borrow().reports.clone()
    }

    pub fn static_definition_count(&self) -> usize {
        self.inner.borrow().static_definitions
    }

    pub fn dynamic_opcodes(&self) -> Vec<String> {
        self.inner.borrow().dynamic_opcodes.clone()
    }

    pub fn installed_extensions(&self) -> Vec<String> {
        self.inner.borrow().installed.clone()
    }

    pub fn locale(&self) -> String {
        self.inner.borrow().locale.clone()
    }

    pub fn program_mode(&self) -> ProgramMode {
        self.inner.borrow().program_mode
    }

    pub fn device(&self) -> Option<(String, String)> {
        self.inner.borrow().device.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.borrow().visible
    }

    pub fn is_recycling_enabled(&self) -> bool {
        self.inner.borrow().recycling
    }

    pub fn status_refreshes(&self) -> usize {
        self.inner.borrow().status_refreshes
    }

    pub fn chaff_hidden(&self) -> usize {
        self.inner.borrow().chaff_hidden
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    pub fn toolbox(&self) -> Option<ToolboxDescriptor> {
        self.inner.borrow().toolbox.clone()
    }

    pub fn palette_replacements(&self) -> usize {
        self.inner.borrow().palette_replacements
    }

    pub fn scroll_position(&self) -> f64 {
        self.inner.borrow().scroll
    }

    pub fn field_value(&self, field_id: &str) -> Option<String> {
        self.inner.borrow().fields.get(field_id).cloned()
    }
}

impl Canvas for HeadlessCanvas {
    fn inject(&mut self, options: &WorkspaceOptions) {
        let mut inner = self.inner.borrow_mut();
        inner.viewport.scale = options.zoom.start_scale;
        inner.options = Some(options.clone());
    }

    fn attach_change_listener(&mut self) {
        self.inner.borrow_mut().change_listener = true;
    }

    fn detach_change_listener(&mut self) {
        self.inner.borrow_mut().change_listener = false;
    }

    fn clear_and_load(&mut self, script: &str) -> Result<(), CanvasError> {
        let mut inner = self.inner.borrow_mut();
        inner.content = None;
        if inner.change_listener {
            inner.undo_depth += 1;
        }
        if script.trim().is_empty() {
            return Ok(());
        }
        let value = serde_json::from_str(script).map_err(|e| CanvasError::Load(e.to_string()))?;
        inner.content = Some(value);
        if inner.change_listener {
            inner.undo_depth += 1;
        }
        Ok(())
    }

    fn has_content(&self) -> bool {
        match &self.inner.borrow().content {
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    fn viewport(&self) -> WorkspaceViewport {
        self.inner.borrow().viewport
    }

    fn set_viewport(&mut self, viewport: WorkspaceViewport) {
        self.inner.borrow_mut().viewport = viewport;
    }

    fn resize(&mut self) {
        self.inner.borrow_mut().resizes += 1;
    }

    fn clear_undo(&mut self) {
        self.inner.borrow_mut().undo_depth = 0;
    }

    fn glow_stack(&mut self, id: &str, on: bool) {
        let mut inner = self.inner.borrow_mut();
        if on {
            inner.glowing_stacks.insert(id.to_string());
        } else {
            inner.glowing_stacks.remove(id);
        }
    }

    fn glow_block(&mut self, id: &str, on: bool) {
        let mut inner = self.inner.borrow_mut();
        if on {
            inner.glowing_blocks.insert(id.to_string());
        } else {
            inner.glowing_blocks.remove(id);
        }
    }

    fn report_value(&mut self, id: &str, value: &str) {
        self.inner
            .borrow_mut()
            .reports
            .push((id.to_string(), value.to_string()));
    }

    fn define_blocks(&mut self, definitions: &[Value]) {
        self.inner.borrow_mut().static_definitions += definitions.len();
    }

    fn define_dynamic_block(&mut self, block: &DynamicBlock) {
        self.inner
            .borrow_mut()
            .dynamic_opcodes
            .push(block.opcode.clone());
    }

    fn install_extension(&mut self, package: &DeviceExtensionPackage) {
        let mut inner = self.inner.borrow_mut();
        if !inner.installed.contains(&package.extension_id) {
            inner.installed.push(package.extension_id.clone());
        }
        inner.static_definitions += package.blocks.len();
    }

    fn set_locale(&mut self, locale: &str) {
        self.inner.borrow_mut().locale = locale.to_string();
    }

    fn set_program_mode(&mut self, mode: ProgramMode) {
        self.inner.borrow_mut().program_mode = mode;
    }

    fn set_device(&mut self, device_id: &str, device_type: &str) {
        self.inner.borrow_mut().device = Some((device_id.to_string(), device_type.to_string()));
    }

    fn set_visible(&mut self, visible: bool) {
        self.inner.borrow_mut().visible = visible;
    }

    fn set_recycling_enabled(&mut self, enabled: bool) {
        self.inner.borrow_mut().recycling = enabled;
    }

    fn refresh_status_buttons(&mut self) {
        self.inner.borrow_mut().status_refreshes += 1;
    }

    fn hide_chaff(&mut self) {
        self.inner.borrow_mut().chaff_hidden += 1;
    }

    fn workspace_to_code(&self, generator: &str) -> Result<String, CanvasError> {
        if !GENERATORS.contains(&generator) {
            return Err(CanvasError::Generate(format!("no generator named {generator}")));
        }
        let inner = self.inner.borrow();
        let body = inner
            .content
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        Ok(format!("// generated by {generator}\n{body}"))
    }

    fn dispose(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.disposed = true;
        inner.change_listener = false;
    }
}

impl Palette for HeadlessCanvas {
    fn selected_category(&self) -> Option<String> {
        self.inner.borrow().selected.clone()
    }

    fn category_scroll_offset(&self) -> f64 {
        let inner = self.inner.borrow();
        let position = inner
            .selected
            .as_deref()
            .and_then(|id| inner.category_span(id))
            .map(|(position, _)| position)
            .unwrap_or(0.0);
        inner.scroll - position
    }

    fn category_position(&self, id: &str) -> Option<f64> {
        self.inner.borrow().category_span(id).map(|(position, _)| position)
    }

    fn category_length(&self, id: &str) -> Option<f64> {
        self.inner.borrow().category_span(id).map(|(_, length)| length)
    }

    fn replace(&mut self, descriptor: &ToolboxDescriptor) {
        let mut inner = self.inner.borrow_mut();
        inner.fields.clear();
        for category in &descriptor.categories {
            for item in &category.items {
                if let ToolboxItem::Block { fields, .. } = item {
                    for field in fields {
                        if let Some(id) = &field.id {
                            inner.fields.insert(id.clone(), field.value.clone());
                        }
                    }
                }
            }
        }
        inner.toolbox = Some(descriptor.clone());
        inner.palette_replacements += 1;
    }

    fn set_scroll_position(&mut self, position: f64) {
        self.inner.borrow_mut().scroll = position;
    }

    fn select_category(&mut self, id: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some((position, _)) = inner.category_span(id) else {
            tracing::debug!(category = id, "select of unknown category ignored");
            return;
        };
        inner.selected = Some(id.to_string());
        inner.scroll = position;
    }

    fn scroll_to_category(&mut self, id: &str) {
        self.select_category(id);
    }

    fn refresh_selection(&mut self) {
        let mut inner = self.inner.borrow_mut();
        let still_present = inner
            .selected
            .as_deref()
            .is_some_and(|id| inner.category_span(id).is_some());
        if !still_present {
            inner.selected = None;
        }
    }

    fn set_block_field(&mut self, field_id: &str, value: &str) -> bool {
        match self.inner.borrow_mut().fields.get_mut(field_id) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }
}
