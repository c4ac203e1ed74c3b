//! Services layer (ports + adapters).
//!
//! - `ports`: collaborator traits the controller drives (runtime, canvas, shell).
//! - `adapters`: settings file access and the headless in-memory collaborators.

pub mod adapters;
pub mod bus;
pub mod ports;

pub use bus::{kernel_bus, KernelBusReceiver, KernelBusSender, KernelMessage};
