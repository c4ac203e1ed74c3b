//! Plain data shared by the kernel: targets, devices, modes, viewports.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Costume {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sound {
    pub name: String,
}

/// A sprite or the stage, as seen by the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditTarget {
    pub id: String,
    #[serde(default)]
    pub is_stage: bool,
    #[serde(default)]
    pub costumes: Vec<Costume>,
    #[serde(default)]
    pub sounds: Vec<Sound>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl EditTarget {
    pub fn last_costume_name(&self) -> &str {
        self.costumes.last().map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn last_sound_name(&self) -> &str {
        self.sounds.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Position rounded half-up, as shown in the motion block fields.
    pub fn rounded_position(&self) -> (String, String) {
        (round_half_up(self.x), round_half_up(self.y))
    }
}

fn round_half_up(value: f64) -> String {
    ((value + 0.5).floor() as i64).to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramMode {
    #[default]
    #[serde(alias = "realtime")]
    Interactive,
    #[serde(alias = "upload")]
    Deploy,
}

impl ProgramMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgramMode::Interactive => "interactive",
            ProgramMode::Deploy => "deploy",
        }
    }
}

/// Catalog entry for a hardware device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub device_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub program_modes: Vec<ProgramMode>,
    #[serde(default)]
    pub default_program_mode: Option<ProgramMode>,
    #[serde(default)]
    pub default_baud_rate: Option<u32>,
    #[serde(default)]
    pub launch_peripheral_connection_flow: bool,
}

impl DeviceDescriptor {
    pub fn supports(&self, mode: ProgramMode) -> bool {
        self.program_modes.contains(&mode)
    }
}

/// A device currently added to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedDevice {
    pub device_id: String,
    pub name: String,
    pub device_type: String,
    pub monitoring: bool,
}

impl From<&DeviceDescriptor> for ConnectedDevice {
    fn from(device: &DeviceDescriptor) -> Self {
        Self {
            device_id: device.device_id.clone(),
            name: device.name.clone(),
            device_type: device.device_type.clone(),
            monitoring: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceViewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub scale: f64,
}

impl Default for WorkspaceViewport {
    fn default() -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            scale: DEFAULT_SCALE,
        }
    }
}

pub const DEFAULT_SCALE: f64 = 0.675;

/// Viewport reported for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetMetrics {
    pub target_id: String,
    pub viewport: WorkspaceViewport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    #[default]
    Scalar,
    List,
    BroadcastMessage,
}

/// Maps a device type to the name of the code generator it uses.
pub fn generator_for_device_type(device_type: &str) -> &str {
    match device_type {
        "arduino" | "esp32" | "esp8266" => "arduino",
        "microbit" | "microPython" => "python",
        other => other,
    }
}
