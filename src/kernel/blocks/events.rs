use super::Blocks;
use crate::kernel::bridge::{route, RuntimeEvent, RuntimeEventKind, Subscription};

type Handler = fn(&mut Blocks, RuntimeEvent);

/// Every runtime event the controller listens to. Attach and detach both walk
/// this table.
pub(super) const SUBSCRIPTIONS: &[Subscription<Handler>] = &[
    Subscription { kind: RuntimeEventKind::ScriptGlowOn, handler: on_glow },
    Subscription { kind: RuntimeEventKind::ScriptGlowOff, handler: on_glow },
    Subscription { kind: RuntimeEventKind::BlockGlowOn, handler: on_glow },
    Subscription { kind: RuntimeEventKind::BlockGlowOff, handler: on_glow },
    Subscription { kind: RuntimeEventKind::VisualReport, handler: on_visual_report },
    Subscription { kind: RuntimeEventKind::WorkspaceUpdate, handler: on_workspace_update },
    Subscription { kind: RuntimeEventKind::TargetsUpdate, handler: on_targets_update },
    Subscription { kind: RuntimeEventKind::ExtensionAdded, handler: on_extension_added },
    Subscription { kind: RuntimeEventKind::ExtensionRemoved, handler: on_extension_removed },
    Subscription { kind: RuntimeEventKind::DeviceExtensionAdded, handler: on_device_extension_added },
    Subscription { kind: RuntimeEventKind::DeviceExtensionRemoved, handler: on_device_extension_removed },
    Subscription { kind: RuntimeEventKind::BlocksInfoUpdate, handler: on_extension_added },
    Subscription { kind: RuntimeEventKind::PeripheralConnected, handler: on_peripheral_changed },
    Subscription { kind: RuntimeEventKind::PeripheralDisconnected, handler: on_peripheral_changed },
    Subscription { kind: RuntimeEventKind::CodeNeedUpdate, handler: on_code_need_update },
    Subscription { kind: RuntimeEventKind::ToolboxUploadFinish, handler: on_toolbox_upload_finish },
];

impl Blocks {
    pub(super) fn handle_runtime_event(&mut self, event: RuntimeEvent) {
        if !self.bridge.is_attached() {
            return;
        }
        let kind = event.kind();
        match route(SUBSCRIPTIONS, kind) {
            Some(handler) => handler(self, event),
            None => tracing::debug!(event = kind.name(), "no handler for runtime event"),
        }
    }
}

fn on_glow(blocks: &mut Blocks, event: RuntimeEvent) {
    match event {
        RuntimeEvent::ScriptGlowOn { id } => blocks.canvas.glow_stack(&id, true),
        RuntimeEvent::ScriptGlowOff { id } => blocks.canvas.glow_stack(&id, false),
        RuntimeEvent::BlockGlowOn { id } => blocks.canvas.glow_block(&id, true),
        RuntimeEvent::BlockGlowOff { id } => blocks.canvas.glow_block(&id, false),
        _ => {}
    }
}

fn on_visual_report(blocks: &mut Blocks, event: RuntimeEvent) {
    if let RuntimeEvent::VisualReport { id, value } = event {
        blocks.canvas.report_value(&id, &value);
    }
}

fn on_workspace_update(blocks: &mut Blocks, event: RuntimeEvent) {
    if let RuntimeEvent::WorkspaceUpdate { target_id, script } = event {
        blocks.reconcile_workspace(&target_id, &script);
    }
}

fn on_targets_update(blocks: &mut Blocks, _event: RuntimeEvent) {
    blocks.on_targets_update();
}

fn on_extension_added(blocks: &mut Blocks, event: RuntimeEvent) {
    match event {
        RuntimeEvent::ExtensionAdded(info) | RuntimeEvent::BlocksInfoUpdate(info) => {
            blocks.on_extension_added(info)
        }
        _ => {}
    }
}

fn on_extension_removed(blocks: &mut Blocks, event: RuntimeEvent) {
    if let RuntimeEvent::ExtensionRemoved {
        extension_id,
        device_id,
    } = event
    {
        blocks.on_extension_removed(&extension_id, device_id.as_deref());
    }
}

fn on_device_extension_added(blocks: &mut Blocks, event: RuntimeEvent) {
    if let RuntimeEvent::DeviceExtensionAdded(package) = event {
        blocks.on_device_extension_added(package);
    }
}

fn on_device_extension_removed(blocks: &mut Blocks, _event: RuntimeEvent) {
    blocks.request_toolbox_update();
}

fn on_peripheral_changed(blocks: &mut Blocks, _event: RuntimeEvent) {
    blocks.canvas.refresh_status_buttons();
}

fn on_code_need_update(blocks: &mut Blocks, _event: RuntimeEvent) {
    blocks.on_code_need_update();
}

fn on_toolbox_upload_finish(blocks: &mut Blocks, _event: RuntimeEvent) {
    blocks.shell.on_toolbox_did_update();
}
