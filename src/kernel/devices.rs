//! Connected device set and the program-mode policy it implies.

use super::model::{ConnectedDevice, DeviceDescriptor, ProgramMode};

/// Mode settings after a device-set change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    /// `None` leaves the current mode untouched.
    pub mode: Option<ProgramMode>,
    pub support_switch: bool,
}

impl ModePolicy {
    pub const RESET: ModePolicy = ModePolicy {
        mode: Some(ProgramMode::Interactive),
        support_switch: false,
    };
}

/// Policy for adding `device` to a set that was empty (`was_empty`) or not.
pub fn policy_for_added(was_empty: bool, device: &DeviceDescriptor) -> ModePolicy {
    if !was_empty {
        return ModePolicy::RESET;
    }

    let interactive = device.supports(ProgramMode::Interactive);
    let deploy = device.supports(ProgramMode::Deploy);
    if interactive && deploy {
        return ModePolicy {
            mode: device
                .default_program_mode
                .filter(|mode| device.supports(*mode)),
            support_switch: true,
        };
    }

    ModePolicy {
        mode: Some(if deploy {
            ProgramMode::Deploy
        } else {
            ProgramMode::Interactive
        }),
        support_switch: false,
    }
}

/// Devices added to the session, in insertion order.
#[derive(Debug, Default, Clone)]
pub struct DeviceSet {
    devices: Vec<ConnectedDevice>,
}

pub enum DeviceInsert {
    Added { was_empty: bool },
    AlreadyPresent,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn as_slice(&self) -> &[ConnectedDevice] {
        &self.devices
    }

    pub fn first(&self) -> Option<&ConnectedDevice> {
        self.devices.first()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d.device_id == device_id)
    }

    pub fn insert(&mut self, device: &DeviceDescriptor) -> DeviceInsert {
        if self.contains(&device.device_id) {
            return DeviceInsert::AlreadyPresent;
        }
        let was_empty = self.devices.is_empty();
        self.devices.push(ConnectedDevice::from(device));
        DeviceInsert::Added { was_empty }
    }

    pub fn remove(&mut self, device_id: &str) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.device_id != device_id);
        self.devices.len() != before
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/devices.rs"]
mod tests;
