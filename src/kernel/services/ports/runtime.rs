use thiserror::Error;

use crate::kernel::bridge::RuntimeEventKind;
use crate::kernel::model::{EditTarget, ProgramMode, VariableKind};
use crate::kernel::services::bus::{KernelBusSender, KernelMessage};

/// Handle returned by [`Runtime::add_listener`], used to remove exactly that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("target not found: {0}")]
    TargetNotFound(String),
    #[error("invalid blocks payload: {0}")]
    InvalidBlocks(String),
}

/// Completion handle for [`Runtime::set_locale`].
///
/// The runtime calls [`LocaleCompletion::complete`] once the locale is applied;
/// the controller picks the message up on its next tick.
pub struct LocaleCompletion {
    sink: KernelBusSender,
    locale: String,
    refresh_workspace: bool,
}

impl LocaleCompletion {
    pub(crate) fn new(sink: KernelBusSender, locale: String, refresh_workspace: bool) -> Self {
        Self {
            sink,
            locale,
            refresh_workspace,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn complete(self) {
        let msg = KernelMessage::LocaleApplied {
            locale: self.locale,
            refresh_workspace: self.refresh_workspace,
        };
        if self.sink.send(msg).is_err() {
            tracing::debug!("locale completion dropped: controller gone");
        }
    }
}

/// The execution runtime the editor drives.
pub trait Runtime {
    fn add_listener(&mut self, event: RuntimeEventKind, sink: KernelBusSender) -> ListenerId;
    fn remove_listener(&mut self, event: RuntimeEventKind, id: ListenerId) -> bool;

    fn editing_target(&self) -> Option<EditTarget>;
    fn stage(&self) -> Option<EditTarget>;

    fn set_locale(&mut self, locale: &str, done: LocaleCompletion);
    fn locale(&self) -> String;

    fn refresh_workspace(&mut self);
    fn share_blocks_to_target(&mut self, blocks: &str, target_id: &str) -> Result<(), RuntimeError>;
    fn variable_names(&self, kind: VariableKind) -> Vec<String>;
    fn set_program_mode(&mut self, mode: ProgramMode);
}
