//! Manager configuration file
//!
//! Locations of the settings store and per-instance applet configs, the
//! log level, and the panel/package tables the CLI uses to stand in for a
//! running shell.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::host::MemoryPanelHost;
use crate::packages::PackageManifest;
use crate::types::{PanelGeometry, PanelId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Settings store file; defaults to the XDG config dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
    /// Root of `<package>/<instance>.json` applet configs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_config_dir: Option<PathBuf>,
    #[serde(default = "default_panels")]
    pub panels: Vec<PanelConfig>,
    #[serde(default)]
    pub packages: HashMap<String, PackageManifest>,
}

/// A panel as the CLI simulates it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PanelConfig {
    pub id: PanelId,
    #[serde(default)]
    pub bottom: bool,
    #[serde(default = "default_panel_height")]
    pub height: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_panel_height() -> u32 {
    40
}

fn default_panels() -> Vec<PanelConfig> {
    vec![PanelConfig {
        id: 1,
        bottom: true,
        height: default_panel_height(),
    }]
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            settings_path: None,
            instance_config_dir: None,
            panels: default_panels(),
            packages: HashMap::new(),
        }
    }
}

impl ManagerConfig {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from `path`, falling back to defaults when the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: ManagerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;

        info!(
            panels = config.panels.len(),
            packages = config.packages.len(),
            "Loaded manager config"
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(crate::config::JsonSettings::default_path)
    }

    pub fn instance_config_dir(&self) -> PathBuf {
        self.instance_config_dir.clone().unwrap_or_else(|| {
            let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(crate::constants::config::APP_DIR);
            path.push(crate::constants::config::INSTANCE_CONFIG_DIR);
            path
        })
    }

    /// Build an in-memory panel host with the configured panels
    pub fn panel_host(&self) -> MemoryPanelHost {
        let mut host = MemoryPanelHost::new();
        for panel in &self.panels {
            host.add_panel(PanelGeometry::new(panel.id, panel.bottom, panel.height));
        }
        host
    }
}
