//! In-memory collaborators for replay and tests.
//!
//! Each adapter keeps its state behind `Rc<RefCell<..>>`; cloning a handle
//! shares that state, so the owner of the controller can still inspect it.

mod canvas;
mod runtime;
mod shell;

pub use canvas::{HeadlessCanvas, ITEM_HEIGHT, LABEL_HEIGHT};
pub use runtime::HeadlessRuntime;
pub use shell::{HeadlessShell, ShellRecord};

use crate::kernel::blocks::BlocksParts;

/// Handles to one headless setup; `parts()` hands clones to the controller.
#[derive(Clone, Default)]
pub struct HeadlessRig {
    pub runtime: HeadlessRuntime,
    pub canvas: HeadlessCanvas,
    pub shell: HeadlessShell,
}

impl HeadlessRig {
    pub fn new(locale: &str) -> Self {
        Self {
            runtime: HeadlessRuntime::new(locale),
            canvas: HeadlessCanvas::new(),
            shell: HeadlessShell::new(),
        }
    }

    pub fn parts(&self) -> BlocksParts {
        BlocksParts {
            runtime: Box::new(self.runtime.clone()),
            canvas: Box::new(self.canvas.clone()),
            palette: Box::new(self.canvas.clone()),
            shell: Box::new(self.shell.clone()),
        }
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/headless.rs"]
mod tests;
