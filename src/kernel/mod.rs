//! Headless editor core: the blocks controller and the pieces it drives.

pub mod blocks;
pub mod bridge;
pub mod devices;
pub mod extension;
pub mod model;
pub mod prompt;
pub mod schedule;
pub mod services;
pub mod state;
pub mod toolbox;

pub use blocks::{Blocks, BlocksParts, ModeError, ToolboxCallback};
pub use bridge::{EventBridge, RuntimeEvent, RuntimeEventKind};
pub use model::{DeviceDescriptor, EditTarget, ProgramMode, WorkspaceViewport};
pub use prompt::{PromptController, PromptError, PromptRequest, PromptView};
pub use schedule::{Scheduler, TaskSlot};
pub use state::BlocksState;
pub use toolbox::{synthesize_toolbox, ToolboxDescriptor};
