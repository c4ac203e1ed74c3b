use serde::{Deserialize, Serialize};

use crate::kernel::model::DEFAULT_SCALE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub can_use_cloud: bool,
    #[serde(default = "default_targets_debounce_ms")]
    pub targets_debounce_ms: u64,
    #[serde(default)]
    pub workspace: WorkspaceOptions,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_targets_debounce_ms() -> u64 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            can_use_cloud: false,
            targets_debounce_ms: default_targets_debounce_ms(),
            workspace: WorkspaceOptions::default(),
        }
    }
}

/// Options handed to the canvas when it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceOptions {
    pub rtl: bool,
    pub zoom: ZoomOptions,
    pub grid: GridOptions,
    pub colours: WorkspaceColours,
    pub comments: bool,
    pub collapse: bool,
    pub sounds: bool,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            rtl: false,
            zoom: ZoomOptions::default(),
            grid: GridOptions::default(),
            colours: WorkspaceColours::default(),
            comments: true,
            collapse: false,
            sounds: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomOptions {
    pub controls: bool,
    pub wheel: bool,
    pub start_scale: f64,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            controls: true,
            wheel: true,
            start_scale: DEFAULT_SCALE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub spacing: u32,
    pub length: u32,
    pub colour: String,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            spacing: 40,
            length: 2,
            colour: "#ddd".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceColours {
    pub workspace: String,
    pub flyout: String,
    pub toolbox: String,
    pub toolbox_selected: String,
    pub scrollbar: String,
    pub scrollbar_hover: String,
    pub insertion_marker: String,
    pub insertion_marker_opacity: f64,
    pub field_shadow: String,
    pub drag_shadow_opacity: f64,
}

impl Default for WorkspaceColours {
    fn default() -> Self {
        Self {
            workspace: "#F9F9F9".to_string(),
            flyout: "#F9F9F9".to_string(),
            toolbox: "#FFFFFF".to_string(),
            toolbox_selected: "#E9EEF2".to_string(),
            scrollbar: "#CECDCE".to_string(),
            scrollbar_hover: "#CECDCE".to_string(),
            insertion_marker: "#000000".to_string(),
            insertion_marker_opacity: 0.2,
            field_shadow: "rgba(255, 255, 255, 0.3)".to_string(),
            drag_shadow_opacity: 0.6,
        }
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/settings.rs"]
mod tests;
