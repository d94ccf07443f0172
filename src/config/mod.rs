//! Configuration management
//!
//! - **manager**: ManagerConfig, the manager's own JSON config file
//! - **settings_store**: the persisted key-value settings holding applet declarations
//! - **instance_files**: per-instance applet config files

pub mod instance_files;
pub mod manager;
pub mod settings_store;

pub use instance_files::{instance_config_path, remove_instance_config};
pub use manager::{ManagerConfig, PanelConfig};
pub use settings_store::{JsonSettings, MemorySettings, SettingsStore, SettingsWrite};
