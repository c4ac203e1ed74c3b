//! Runtime event bridge.
//!
//! Subscriptions are declared once as a table of `{event, handler}` pairs.
//! [`EventBridge::attach`] registers one listener per row and records the
//! returned ids; [`EventBridge::detach`] removes exactly those ids, so attach
//! and detach cannot drift apart.

use crate::kernel::extension::{DeviceExtensionPackage, ExtensionInfo};
use crate::kernel::services::ports::{ListenerId, Runtime};
use crate::kernel::services::KernelBusSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeEventKind {
    ScriptGlowOn,
    ScriptGlowOff,
    BlockGlowOn,
    BlockGlowOff,
    VisualReport,
    WorkspaceUpdate,
    TargetsUpdate,
    ExtensionAdded,
    ExtensionRemoved,
    DeviceExtensionAdded,
    DeviceExtensionRemoved,
    BlocksInfoUpdate,
    PeripheralConnected,
    PeripheralDisconnected,
    CodeNeedUpdate,
    ToolboxUploadFinish,
}

impl RuntimeEventKind {
    pub fn name(self) -> &'static str {
        match self {
            RuntimeEventKind::ScriptGlowOn => "SCRIPT_GLOW_ON",
            RuntimeEventKind::ScriptGlowOff => "SCRIPT_GLOW_OFF",
            RuntimeEventKind::BlockGlowOn => "BLOCK_GLOW_ON",
            RuntimeEventKind::BlockGlowOff => "BLOCK_GLOW_OFF",
            RuntimeEventKind::VisualReport => "VISUAL_REPORT",
            RuntimeEventKind::WorkspaceUpdate => "workspaceUpdate",
            RuntimeEventKind::TargetsUpdate => "targetsUpdate",
            RuntimeEventKind::ExtensionAdded => "EXTENSION_ADDED",
            RuntimeEventKind::ExtensionRemoved => "EXTENSION_REMOVED",
            RuntimeEventKind::DeviceExtensionAdded => "DEVICE_EXTENSION_ADDED",
            RuntimeEventKind::DeviceExtensionRemoved => "DEVICE_EXTENSION_REMOVED",
            RuntimeEventKind::BlocksInfoUpdate => "BLOCKSINFO_UPDATE",
            RuntimeEventKind::PeripheralConnected => "PERIPHERAL_CONNECTED",
            RuntimeEventKind::PeripheralDisconnected => "PERIPHERAL_DISCONNECTED",
            RuntimeEventKind::CodeNeedUpdate => "CODE_NEED_UPDATE",
            RuntimeEventKind::ToolboxUploadFinish => "TOOLBOX_UPLOAD_FINISH",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    ScriptGlowOn { id: String },
    ScriptGlowOff { id: String },
    BlockGlowOn { id: String },
    BlockGlowOff { id: String },
    VisualReport { id: String, value: String },
    WorkspaceUpdate { target_id: String, script: String },
    TargetsUpdate,
    ExtensionAdded(ExtensionInfo),
    ExtensionRemoved {
        extension_id: String,
        device_id: Option<String>,
    },
    DeviceExtensionAdded(DeviceExtensionPackage),
    DeviceExtensionRemoved { extension_id: String },
    BlocksInfoUpdate(ExtensionInfo),
    PeripheralConnected { device_id: String },
    PeripheralDisconnected { device_id: String },
    CodeNeedUpdate,
    ToolboxUploadFinish,
}

impl RuntimeEvent {
    pub fn kind(&self) -> RuntimeEventKind {
        match self {
            RuntimeEvent::ScriptGlowOn { .. } => RuntimeEventKind::ScriptGlowOn,
            RuntimeEvent::ScriptGlowOff { .. } => RuntimeEventKind::ScriptGlowOff,
            RuntimeEvent::BlockGlowOn { .. } => RuntimeEventKind::BlockGlowOn,
            RuntimeEvent::BlockGlowOff { .. } => RuntimeEventKind::BlockGlowOff,
            RuntimeEvent::VisualReport { .. } => RuntimeEventKind::VisualReport,
            RuntimeEvent::WorkspaceUpdate { .. } => RuntimeEventKind::WorkspaceUpdate,
            RuntimeEvent::TargetsUpdate => RuntimeEventKind::TargetsUpdate,
            RuntimeEvent::ExtensionAdded(_) => RuntimeEventKind::ExtensionAdded,
            RuntimeEvent::ExtensionRemoved { .. } => RuntimeEventKind::ExtensionRemoved,
            RuntimeEvent::DeviceExtensionAdded(_) => RuntimeEventKind::DeviceExtensionAdded,
            RuntimeEvent::DeviceExtensionRemoved { .. } => RuntimeEventKind::DeviceExtensionRemoved,
            RuntimeEvent::BlocksInfoUpdate(_) => RuntimeEventKind::BlocksInfoUpdate,
            RuntimeEvent::PeripheralConnected { .. } => RuntimeEventKind::PeripheralConnected,
            RuntimeEvent::PeripheralDisconnected { .. } => RuntimeEventKind::PeripheralDisconnected,
            RuntimeEvent::CodeNeedUpdate => RuntimeEventKind::CodeNeedUpdate,
            RuntimeEvent::ToolboxUploadFinish => RuntimeEventKind::ToolboxUploadFinish,
        }
    }
}

/// One row of a subscription table.
pub struct Subscription<H> {
    pub kind: RuntimeEventKind,
    pub handler: H,
}

pub struct EventBridge {
    sink: KernelBusSender,
    listeners: Vec<(RuntimeEventKind, ListenerId)>,
    attached: bool,
}

impl EventBridge {
    pub fn new(sink: KernelBusSender) -> Self {
        Self {
            sink,
            listeners: Vec::new(),
            attached: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn attach<H>(&mut self, runtime: &mut dyn Runtime, table: &[Subscription<H>]) {
        if self.attached {
            tracing::warn!("event bridge already attached");
            return;
        }
        for row in table {
            let id = runtime.add_listener(row.kind, self.sink.clone());
            self.listeners.push((row.kind, id));
        }
        self.attached = true;
        tracing::debug!(listeners = self.listeners.len(), "event bridge attached");
    }

    pub fn detach(&mut self, runtime: &mut dyn Runtime) {
        if !self.attached {
            return;
        }
        for (kind, id) in self.listeners.drain(..) {
            if !runtime.remove_listener(kind, id) {
                tracing::warn!(event = kind.name(), "listener already gone on detach");
            }
        }
        self.attached = false;
        tracing::debug!("event bridge detached");
    }
}

/// Finds the handler for `kind` in a subscription table.
pub fn route<H: Copy>(table: &[Subscription<H>], kind: RuntimeEventKind) -> Option<H> {
    table.iter().find(|row| row.kind == kind).map(|row| row.handler)
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/bridge.rs"]
mod tests;
