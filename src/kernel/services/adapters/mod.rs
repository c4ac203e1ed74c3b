//! Service adapters: settings file access and headless collaborators.

pub mod headless;
pub mod settings;

pub use headless::{HeadlessCanvas, HeadlessRig, HeadlessRuntime, HeadlessShell, ShellRecord};
pub use settings::{
    ensure_settings_file, get_cache_dir, get_settings_path, load_settings, load_settings_from,
    SettingsError,
};
