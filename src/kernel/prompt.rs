//! Naming prompt for variables, lists and procedures.
//!
//! `Idle -> Open -> Idle`. Confirmation forwards the runtime's current names of
//! the requested kind; collision checks belong to the callback.

use thiserror::Error;

use super::model::VariableKind;
use super::services::ports::Runtime;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("a prompt is already open")]
    AlreadyOpen,
    #[error("no prompt is open")]
    NotOpen,
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VariableScope {
    #[default]
    Global,
    Local,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableOptions {
    pub scope: VariableScope,
    pub is_cloud: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptPurpose {
    #[default]
    Create,
    Rename,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptResponse {
    pub input: String,
    pub existing_names: Vec<String>,
    pub options: VariableOptions,
}

pub type PromptCallback = Box<dyn FnMut(PromptResponse) -> Result<(), PromptError>>;

pub struct PromptRequest {
    pub message: String,
    pub default_value: String,
    pub title: Option<String>,
    pub kind: VariableKind,
    pub purpose: PromptPurpose,
    callback: PromptCallback,
}

impl PromptRequest {
    pub fn new(
        message: impl Into<String>,
        default_value: impl Into<String>,
        callback: impl FnMut(PromptResponse) -> Result<(), PromptError> + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            default_value: default_value.into(),
            title: None,
            kind: VariableKind::Scalar,
            purpose: PromptPurpose::Create,
            callback: Box::new(callback),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_kind(mut self, kind: VariableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn renaming(mut self) -> Self {
        self.purpose = PromptPurpose::Rename;
        self
    }
}

impl std::fmt::Debug for PromptRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRequest")
            .field("message", &self.message)
            .field("default_value", &self.default_value)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("purpose", &self.purpose)
            .finish_non_exhaustive()
    }
}

/// What the shell renders for an open prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptView {
    pub title: String,
    pub message: String,
    pub default_value: String,
    pub kind: VariableKind,
    pub show_variable_options: bool,
    pub show_cloud_option: bool,
    pub show_list_message: bool,
}

impl PromptView {
    fn for_request(request: &PromptRequest, can_use_cloud: bool) -> Self {
        let title = request
            .title
            .clone()
            .unwrap_or_else(|| default_title(request.kind, request.purpose).to_string());
        Self {
            title,
            message: request.message.clone(),
            default_value: request.default_value.clone(),
            kind: request.kind,
            show_variable_options: request.kind != VariableKind::BroadcastMessage
                && request.purpose != PromptPurpose::Rename,
            show_cloud_option: request.kind == VariableKind::Scalar && can_use_cloud,
            show_list_message: request.kind == VariableKind::List,
        }
    }
}

fn default_title(kind: VariableKind, purpose: PromptPurpose) -> &'static str {
    match (kind, purpose) {
        (VariableKind::List, PromptPurpose::Rename) => "Rename List",
        (_, PromptPurpose::Rename) => "Rename Variable",
        (VariableKind::BroadcastMessage, _) => "New Message",
        _ => "New Variable",
    }
}

struct OpenPrompt {
    request: PromptRequest,
    view: PromptView,
}

#[derive(Default)]
enum PromptState {
    #[default]
    Idle,
    Open(Box<OpenPrompt>),
}

#[derive(Default)]
pub struct PromptController {
    state: PromptState,
    can_use_cloud: bool,
}

impl PromptController {
    pub fn new(can_use_cloud: bool) -> Self {
        Self {
            state: PromptState::Idle,
            can_use_cloud,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PromptState::Open(_))
    }

    pub fn view(&self) -> Option<&PromptView> {
        match &self.state {
            PromptState::Open(open) => Some(&open.view),
            PromptState::Idle => None,
        }
    }

    pub fn open(&mut self, request: PromptRequest) -> Result<&PromptView, PromptError> {
        if self.is_open() {
            tracing::warn!(message = %request.message, "prompt rejected: another prompt is open");
            return Err(PromptError::AlreadyOpen);
        }
        let view = PromptView::for_request(&request, self.can_use_cloud);
        self.state = PromptState::Open(Box::new(OpenPrompt { request, view }));
        match &self.state {
            PromptState::Open(open) => Ok(&open.view),
            PromptState::Idle => Err(PromptError::NotOpen),
        }
    }

    /// Forwards `input` with the live names of its kind. The prompt closes only
    /// when the callback accepts; a rejected input leaves it open for retry.
    pub fn confirm(
        &mut self,
        input: &str,
        options: VariableOptions,
        runtime: &dyn Runtime,
    ) -> Result<(), PromptError> {
        let PromptState::Open(open) = &mut self.state else {
            return Err(PromptError::NotOpen);
        };
        let response = PromptResponse {
            input: input.to_string(),
            existing_names: runtime.variable_names(open.request.kind),
            options,
        };
        if let Err(err) = (open.request.callback)(response) {
            tracing::debug!(error = %err, "prompt input rejected");
            return Err(err);
        }
        self.state = PromptState::Idle;
        Ok(())
    }

    pub fn cancel(&mut self) -> bool {
        matches!(std::mem::take(&mut self.state), PromptState::Open(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/prompt.rs"]
mod tests;
