//! Service ports: collaborator traits + data contracts.

pub mod canvas;
pub mod runtime;
pub mod settings;
pub mod shell;

pub use canvas::{Canvas, CanvasError, Palette};
pub use runtime::{ListenerId, LocaleCompletion, Runtime, RuntimeError};
pub use settings::{GridOptions, Settings, WorkspaceColours, WorkspaceOptions, ZoomOptions};
pub use shell::Shell;
