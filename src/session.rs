//! Scripted editing sessions replayed against the headless collaborators.
//!
//! A session file lists the device catalog, the project's targets and a
//! sequence of steps (runtime events and user actions). Replay drives a
//! [`Blocks`] controller through them and reports what the shell saw.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::kernel::blocks::Blocks;
use crate::kernel::bridge::RuntimeEvent;
use crate::kernel::extension::{CategoryInfo, DeviceExtensionPackage, ExtensionInfo};
use crate::kernel::model::{DeviceDescriptor, EditTarget, ProgramMode, VariableKind, WorkspaceViewport};
use crate::kernel::prompt::{PromptError, PromptRequest, VariableOptions, VariableScope};
use crate::kernel::services::adapters::{HeadlessRig, HeadlessRuntime, ShellRecord};
use crate::kernel::services::ports::Settings;
use crate::kernel::toolbox::ToolboxDescriptor;

/// Upper bound on ticks spent draining deferred work after the last step.
const MAX_SETTLE_TICKS: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    /// Overrides the user settings for this replay.
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub catalog: Vec<DeviceDescriptor>,
    #[serde(default)]
    pub targets: Vec<SessionTarget>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionTarget {
    #[serde(flatten)]
    pub target: EditTarget,
    #[serde(default)]
    pub script: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SelectTarget {
        target_id: String,
    },
    MoveTarget {
        target_id: String,
        x: f64,
        y: f64,
    },
    AddExtension {
        #[serde(default)]
        device_id: Option<String>,
        categories: Vec<CategoryInfo>,
    },
    UpdateBlocksInfo {
        #[serde(default)]
        device_id: Option<String>,
        categories: Vec<CategoryInfo>,
    },
    RemoveExtension {
        extension_id: String,
        #[serde(default)]
        device_id: Option<String>,
    },
    AddDeviceExtension {
        package: DeviceExtensionPackage,
    },
    RemoveDeviceExtension {
        extension_id: String,
    },
    Peripheral {
        device_id: String,
        connected: bool,
    },
    Glow {
        id: String,
        on: bool,
        #[serde(default)]
        stack: bool,
    },
    Report {
        id: String,
        value: String,
    },
    CodeNeedUpdate,
    ToolboxUploadFinish,
    SetLocale {
        locale: String,
    },
    SetVisible {
        visible: bool,
    },
    SetModalVisible {
        visible: bool,
    },
    LockCodeEditor {
        locked: bool,
    },
    SwitchMode {
        mode: ProgramMode,
    },
    SelectCategory {
        category_id: String,
    },
    SelectDevice {
        device_id: String,
    },
    Scroll {
        viewport: WorkspaceViewport,
    },
    DropBlocks {
        blocks: Value,
    },
    CloseCustomProcedures,
    SetVariables {
        kind: VariableKind,
        names: Vec<String>,
    },
    Prompt {
        message: String,
        #[serde(default)]
        default_value: String,
        #[serde(default)]
        kind: VariableKind,
        #[serde(default)]
        rename: bool,
        /// `None` cancels the prompt.
        #[serde(default)]
        answer: Option<String>,
        #[serde(default)]
        local: bool,
        #[serde(default)]
        cloud: bool,
    },
    Wait {
        ms: u64,
    },
    Dispose,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub shell: ShellRecord,
    pub toolbox: Option<ToolboxDescriptor>,
    pub program_mode: ProgramMode,
    pub support_switch_mode: bool,
    pub devices: Vec<String>,
    pub viewports: BTreeMap<String, WorkspaceViewport>,
    pub errors: Vec<String>,
    pub disposed: bool,
}

pub fn load_session(path: &Path) -> Result<Session, SessionError> {
    let data = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_session(&data)
}

pub fn parse_session(data: &str) -> Result<Session, SessionError> {
    Ok(serde_json::from_str(data)?)
}

struct Replay {
    rig: HeadlessRig,
    blocks: Blocks,
    now: Instant,
    errors: Rc<RefCell<Vec<String>>>,
}

/// Replays `session` from a fresh controller and reports the outcome.
pub fn replay(session: &Session, settings: &Settings) -> ReplayReport {
    let settings = session.settings.as_ref().unwrap_or(settings);
    let rig = HeadlessRig::new(&settings.locale);
    for entry in &session.targets {
        let script = match &entry.script {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        rig.runtime.add_target(entry.target.clone(), script);
    }

    let now = Instant::now();
    let blocks = Blocks::new(rig.parts(), session.catalog.clone(), settings, now);
    let mut replay = Replay {
        rig,
        blocks,
        now,
        errors: Rc::new(RefCell::new(Vec::new())),
    };
    replay.settle();

    for (index, step) in session.steps.iter().enumerate() {
        tracing::debug!(index, step = ?step, "replay step");
        replay.apply(index, step);
        replay.blocks.tick(replay.now);
    }
    replay.settle();
    replay.report()
}

impl Replay {
    fn apply(&mut self, index: usize, step: &Step) {
        let runtime = &self.rig.runtime;
        match step {
            Step::SelectTarget { target_id } => {
                if let Err(e) = runtime.set_editing_target(target_id) {
                    self.fail(index, e);
                }
            }
            Step::MoveTarget { target_id, x, y } => {
                if let Err(e) = runtime.move_target(target_id, *x, *y) {
                    self.fail(index, e);
                }
            }
            Step::AddExtension {
                device_id,
                categories,
            } => {
                runtime.emit(RuntimeEvent::ExtensionAdded(ExtensionInfo {
                    device_id: device_id.clone(),
                    categories: categories.clone(),
                }));
            }
            Step::UpdateBlocksInfo {
                device_id,
                categories,
            } => {
                runtime.emit(RuntimeEvent::BlocksInfoUpdate(ExtensionInfo {
                    device_id: device_id.clone(),
                    categories: categories.clone(),
                }));
            }
            Step::RemoveExtension {
                extension_id,
                device_id,
            } => {
                runtime.emit(RuntimeEvent::ExtensionRemoved {
                    extension_id: extension_id.clone(),
                    device_id: device_id.clone(),
                });
            }
            Step::AddDeviceExtension { package } => {
                runtime.emit(RuntimeEvent::DeviceExtensionAdded(package.clone()));
            }
            Step::RemoveDeviceExtension { extension_id } => {
                runtime.emit(RuntimeEvent::DeviceExtensionRemoved {
                    extension_id: extension_id.clone(),
                });
            }
            Step::Peripheral {
                device_id,
                connected,
            } => {
                let device_id = device_id.clone();
                runtime.emit(if *connected {
                    RuntimeEvent::PeripheralConnected { device_id }
                } else {
                    RuntimeEvent::PeripheralDisconnected { device_id }
                });
            }
            Step::Glow { id, on, stack } => {
                let id = id.clone();
                runtime.emit(match (*stack, *on) {
                    (true, true) => RuntimeEvent::ScriptGlowOn { id },
                    (true, false) => RuntimeEvent::ScriptGlowOff { id },
                    (false, true) => RuntimeEvent::BlockGlowOn { id },
                    (false, false) => RuntimeEvent::BlockGlowOff { id },
                });
            }
            Step::Report { id, value } => {
                runtime.emit(RuntimeEvent::VisualReport {
                    id: id.clone(),
                    value: value.clone(),
                });
            }
            Step::CodeNeedUpdate => {
                runtime.emit(RuntimeEvent::CodeNeedUpdate);
            }
            Step::ToolboxUploadFinish => {
                runtime.emit(RuntimeEvent::ToolboxUploadFinish);
            }
            Step::SetLocale { locale } => self.blocks.set_locale(locale, true),
            Step::SetVisible { visible } => self.blocks.set_visible(*visible),
            Step::SetModalVisible { visible } => self.blocks.set_any_modal_visible(*visible),
            Step::LockCodeEditor { locked } => self.blocks.set_code_editor_locked(*locked),
            Step::SwitchMode { mode } => {
                if let Err(e) = self.blocks.switch_program_mode(*mode) {
                    self.fail(index, e);
                }
            }
            Step::SelectCategory { category_id } => self.blocks.handle_category_selected(category_id),
            Step::SelectDevice { device_id } => self.blocks.handle_device_selected(device_id),
            Step::Scroll { viewport } => {
                self.rig.canvas.scroll_to(*viewport);
                self.blocks.on_canvas_metrics_changed();
            }
            Step::DropBlocks { blocks } => {
                if let Err(e) = self.blocks.handle_drop(&blocks.to_string()) {
                    self.fail(index, e);
                }
            }
            Step::CloseCustomProcedures => self.blocks.handle_custom_procedures_closed(),
            Step::SetVariables { kind, names } => runtime.set_variables(*kind, names.clone()),
            Step::Prompt {
                message,
                default_value,
                kind,
                rename,
                answer,
                local,
                cloud,
            } => {
                let mut request = PromptRequest::new(
                    message.clone(),
                    default_value.clone(),
                    create_variable(runtime.clone(), *kind),
                )
                .with_kind(*kind);
                if *rename {
                    request = request.renaming();
                }
                if let Err(e) = self.blocks.open_prompt(request) {
                    self.fail(index, e);
                    return;
                }
                match answer {
                    Some(answer) => {
                        let options = VariableOptions {
                            scope: if *local {
                                VariableScope::Local
                            } else {
                                VariableScope::Global
                            },
                            is_cloud: *cloud,
                        };
                        if let Err(e) = self.blocks.confirm_prompt(answer, options) {
                            self.fail(index, e);
                            // One answer per step; a rejected prompt is dismissed.
                            self.blocks.cancel_prompt();
                        }
                    }
                    None => {
                        self.blocks.cancel_prompt();
                    }
                }
            }
            Step::Wait { ms } => {
                self.now += Duration::from_millis(*ms);
            }
            Step::Dispose => self.blocks.dispose(),
        }
    }

    fn fail(&self, index: usize, error: impl std::fmt::Display) {
        tracing::warn!(index, error = %error, "replay step failed");
        self.errors.borrow_mut().push(format!("step {index}: {error}"));
    }

    /// Ticks until no deferred work is left.
    fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_TICKS {
            self.blocks.tick(self.now);
            match self.blocks.next_deadline() {
                Some(deadline) => self.now = self.now.max(deadline),
                None => return,
            }
        }
        tracing::warn!(ticks = MAX_SETTLE_TICKS, "replay did not settle");
    }

    fn report(self) -> ReplayReport {
        let state = self.blocks.state();
        let errors = self.errors.borrow().clone();
        ReplayReport {
            shell: self.rig.shell.record(),
            toolbox: self.blocks.toolbox().cloned(),
            program_mode: state.program_mode,
            support_switch_mode: state.support_switch_mode,
            devices: state
                .devices
                .as_slice()
                .iter()
                .map(|d| d.device_id.clone())
                .collect(),
            viewports: state
                .viewports
                .iter()
                .map(|(id, viewport)| (id.clone(), *viewport))
                .collect(),
            errors,
            disposed: self.blocks.is_disposed(),
        }
    }
}

/// Prompt callback that adds the confirmed name unless it already exists.
fn create_variable(
    runtime: HeadlessRuntime,
    kind: VariableKind,
) -> impl FnMut(crate::kernel::prompt::PromptResponse) -> Result<(), PromptError> {
    move |response| {
        let name = response.input.trim();
        if name.is_empty() {
            return Err(PromptError::Rejected("name must not be empty".to_string()));
        }
        if response.existing_names.iter().any(|n| n == name) {
            return Err(PromptError::Rejected(format!("{name} already exists")));
        }
        let mut names = response.existing_names;
        names.push(name.to_string());
        runtime.set_variables(kind, names);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
