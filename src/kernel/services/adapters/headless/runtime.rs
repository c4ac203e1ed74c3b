use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::kernel::bridge::{RuntimeEvent, RuntimeEventKind};
use crate::kernel::model::{EditTarget, ProgramMode, VariableKind};
use crate::kernel::services::ports::{ListenerId, LocaleCompletion, Runtime, RuntimeError};
use crate::kernel::services::KernelBusSender;

new_key_type! { struct ListenerKey; }

#[derive(Default)]
struct RuntimeInner {
    listeners: SlotMap<ListenerKey, (RuntimeEventKind, KernelBusSender)>,
    targets: Vec<EditTarget>,
    scripts: FxHashMap<String, String>,
    editing: Option<String>,
    locale: String,
    /// Completions held back until [`HeadlessRuntime::complete_locale`].
    held_locales: Vec<LocaleCompletion>,
    hold_locale: bool,
    variables: FxHashMap<VariableKind, Vec<String>>,
    program_mode: ProgramMode,
    refresh_count: usize,
}

/// In-memory runtime. Clones share state, so a test can keep one handle while
/// the controller owns another.
#[derive(Clone, Default)]
pub struct HeadlessRuntime {
    inner: Rc<RefCell<RuntimeInner>>,
}

impl HeadlessRuntime {
    pub fn new(locale: &str) -> Self {
        let runtime = Self::default();
        runtime.inner.borrow_mut().locale = locale.to_string();
        runtime
    }

    /// Adds or replaces a target together with its script.
    pub fn add_target(&self, target: EditTarget, script: impl Into<String>) {
        let mut inner = self.inner.borrow_mut();
        inner.scripts.insert(target.id.clone(), script.into());
        match inner.targets.iter_mut().find(|t| t.id == target.id) {
            Some(existing) => *existing = target,
            None => inner.targets.push(target),
        }
    }

    /// Makes `target_id` the editing target and announces its script.
    pub fn set_editing_target(&self, target_id: &str) -> Result<(), RuntimeError> {
        if !self.inner.borrow().targets.iter().any(|t| t.id == target_id) {
            return Err(RuntimeError::TargetNotFound(target_id.to_string()));
        }
        self.inner.borrow_mut().editing = Some(target_id.to_string());
        self.emit_workspace_update();
        self.emit(RuntimeEvent::TargetsUpdate);
        Ok(())
    }

    pub fn move_target(&self, target_id: &str, x: f64, y: f64) -> Result<(), RuntimeError> {
        {
            let mut inner = self.inner.borrow_mut();
            let target = inner
                .targets
                .iter_mut()
                .find(|t| t.id == target_id)
                .ok_or_else(|| RuntimeError::TargetNotFound(target_id.to_string()))?;
            target.x = x;
            target.y = y;
        }
        self.emit(RuntimeEvent::TargetsUpdate);
        Ok(())
    }

    pub fn set_variables(&self, kind: VariableKind, names: Vec<String>) {
        self.inner.borrow_mut().variables.insert(kind, names);
    }

    /// Delivers `event` to every listener registered for its kind.
    pub fn emit(&self, event: RuntimeEvent) -> usize {
        let kind = event.kind();
        let sinks: Vec<KernelBusSender> = self
            .inner
            .borrow()
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, sink)| sink.clone())
            .collect();
        let mut delivered = 0;
        for sink in sinks {
            if sink.send_event(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        if delivered == 0 {
            tracing::debug!(event = kind.name(), "runtime event had no listeners");
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn listener_count_for(&self, kind: RuntimeEventKind) -> usize {
        self.inner
            .borrow()
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Holds locale completions until [`HeadlessRuntime::complete_locale`].
    pub fn hold_locale_completions(&self, hold: bool) {
        self.inner.borrow_mut().hold_locale = hold;
    }

    pub fn complete_locale(&self) -> usize {
        let held = std::mem::take(&mut self.inner.borrow_mut().held_locales);
        let count = held.len();
        for done in held {
            done.complete();
        }
        count
    }

    pub fn refresh_count(&self) -> usize {
        self.inner.borrow().refresh_count
    }

    pub fn current_program_mode(&self) -> ProgramMode {
        self.inner.borrow().program_mode
    }

    pub fn script(&self, target_id: &str) -> Option<String> {
        self.inner.borrow().scripts.get(target_id).cloned()
    }

    fn emit_workspace_update(&self) {
        let update = {
            let inner = self.inner.borrow();
            inner.editing.as_ref().map(|id| RuntimeEvent::WorkspaceUpdate {
                target_id: id.clone(),
                script: inner.scripts.get(id).cloned().unwrap_or_default(),
            })
        };
        if let Some(event) = update {
            self.emit(event);
        }
    }
}

fn listener_id(key: ListenerKey) -> ListenerId {
    ListenerId(key.data().as_ffi())
}

fn listener_key(id: ListenerId) -> ListenerKey {
    ListenerKey::from(KeyData::from_ffi(id.0))
}

fn parse_blocks(blocks: &str) -> Result<Vec<Value>, RuntimeError> {
    match serde_json::from_str::<Value>(blocks) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(RuntimeError::InvalidBlocks("expected a JSON array".to_string())),
        Err(e) => Err(RuntimeError::InvalidBlocks(e.to_string())),
    }
}

impl Runtime for HeadlessRuntime {
    fn add_listener(&mut self, event: RuntimeEventKind, sink: KernelBusSender) -> ListenerId {
        listener_id(self.inner.borrow_mut().listeners.insert((event, sink)))
    }

    fn remove_listener(&mut self, event: RuntimeEventKind, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let key = listener_key(id);
        match inner.listeners.get(key) {
            Some((kind, _)) if *kind == event => inner.listeners.remove(key).is_some(),
            _ => false,
        }
    }

    fn editing_target(&self) -> Option<EditTarget> {
        let inner = self.inner.borrow();
        match &inner.editing {
            Some(id) => inner.targets.iter().find(|t| &t.id == id).cloned(),
            None => inner.targets.iter().find(|t| t.is_stage).cloned(),
        }
    }

    fn stage(&self) -> Option<EditTarget> {
        self.inner
            .borrow()
            .targets
            .iter()
            .find(|t| t.is_stage)
            .cloned()
    }

    fn set_locale(&mut self, locale: &str, done: LocaleCompletion) {
        let mut inner = self.inner.borrow_mut();
        inner.locale = locale.to_string();
        if inner.hold_locale {
            inner.held_locales.push(done);
            return;
        }
        drop(inner);
        done.complete();
    }

    fn locale(&self) -> String {
        self.inner.borrow().locale.clone()
    }

    fn refresh_workspace(&mut self) {
        self.inner.borrow_mut().refresh_count += 1;
        self.emit_workspace_update();
    }

    fn share_blocks_to_target(&mut self, blocks: &str, target_id: &str) -> Result<(), RuntimeError> {
        let shared = parse_blocks(blocks)?;
        let mut inner = self.inner.borrow_mut();
        if !inner.targets.iter().any(|t| t.id == target_id) {
            return Err(RuntimeError::TargetNotFound(target_id.to_string()));
        }
        let script = inner.scripts.entry(target_id.to_string()).or_default();
        let mut merged = if script.trim().is_empty() {
            Vec::new()
        } else {
            parse_blocks(script)?
        };
        merged.extend(shared);
        *script = Value::Array(merged).to_string();
        Ok(())
    }

    fn variable_names(&self, kind: VariableKind) -> Vec<String> {
        self.inner
            .borrow()
            .variables
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn set_program_mode(&mut self, mode: ProgramMode) {
        self.inner.borrow_mut().program_mode = mode;
    }
}
