//! blockwork - headless controller for a block-based program editor
//!
//! Modules:
//! - kernel: controller, toolbox synthesis, runtime bridge, ports/adapters
//! - session: scripted sessions replayed against the headless adapters

pub mod kernel;
pub mod session;
