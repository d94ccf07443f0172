//! Applet packages and the loader that activates them
//!
//! Loading package code is the loader's business. The manager only asks for
//! a package to be loaded or unloaded, observes its [`PackageState`], and
//! uses an active package as a factory for new applet instances.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::constants::manifest::{DEFAULT_MAX_INSTANCES, UNLIMITED_INSTANCES};
use crate::registry::{Applet, InertApplet};
use crate::roles::Role;
use crate::types::{Orientation, PanelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    Unloaded,
    Loading,
    Active,
    Failed,
}

/// Metadata a package declares about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// `-1` means unlimited
    #[serde(default = "default_max_instances")]
    pub max_instances: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

fn default_max_instances() -> i32 {
    DEFAULT_MAX_INSTANCES
}

impl Default for PackageManifest {
    fn default() -> Self {
        Self {
            max_instances: default_max_instances(),
            role: None,
        }
    }
}

impl PackageManifest {
    pub fn unlimited() -> Self {
        Self {
            max_instances: UNLIMITED_INSTANCES,
            role: None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_instances == UNLIMITED_INSTANCES
    }

    /// Would one more instance fit next to `current` existing ones?
    pub fn allows_another(&self, current: usize) -> bool {
        self.is_unlimited() || (current as i64) < i64::from(self.max_instances)
    }
}

/// What the factory is told about the instance it creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppletParams<'a> {
    pub package_id: &'a str,
    pub instance_id: &'a str,
    pub panel_id: PanelId,
    pub orientation: Orientation,
    pub panel_height: u32,
}

pub trait PackageLoader {
    /// Start loading a package. Returns the state reached right away:
    /// `Active` for synchronous loads, `Loading` when the shell will report
    /// completion later. Idempotent for packages already active.
    fn load(&mut self, package_id: &str) -> PackageState;

    /// Tear the package code down entirely
    fn unload(&mut self, package_id: &str);

    fn state(&self, package_id: &str) -> PackageState;

    fn is_loaded(&self, package_id: &str) -> bool {
        self.state(package_id) == PackageState::Active
    }

    /// Manifest of a known package
    fn manifest(&self, package_id: &str) -> Option<PackageManifest>;

    /// Run an active package's factory
    fn instantiate(&mut self, params: &AppletParams<'_>) -> Result<Box<dyn Applet>>;
}

/// Loader backed by a fixed manifest table. Known packages activate
/// synchronously; unknown ones fail to load.
#[derive(Debug, Default)]
pub struct StaticPackageLoader {
    manifests: HashMap<String, PackageManifest>,
    states: HashMap<String, PackageState>,
}

impl StaticPackageLoader {
    pub fn new(manifests: HashMap<String, PackageManifest>) -> Self {
        Self {
            manifests,
            states: HashMap::new(),
        }
    }

    pub fn with_package(mut self, package_id: &str, manifest: PackageManifest) -> Self {
        self.manifests.insert(package_id.to_string(), manifest);
        self
    }
}

impl PackageLoader for StaticPackageLoader {
    fn load(&mut self, package_id: &str) -> PackageState {
        let state = if self.manifests.contains_key(package_id) {
            PackageState::Active
        } else {
            PackageState::Failed
        };
        let previous = self.states.insert(package_id.to_string(), state);
        if previous != Some(state) {
            info!(package = %package_id, state = ?state, "Package load");
        }
        state
    }

    fn unload(&mut self, package_id: &str) {
        if self.states.remove(package_id).is_some() {
            info!(package = %package_id, "Package unloaded");
        }
    }

    fn state(&self, package_id: &str) -> PackageState {
        self.states.get(package_id).copied().unwrap_or(PackageState::Unloaded)
    }

    fn manifest(&self, package_id: &str) -> Option<PackageManifest> {
        self.manifests.get(package_id).cloned()
    }

    fn instantiate(&mut self, params: &AppletParams<'_>) -> Result<Box<dyn Applet>> {
        if !self.is_loaded(params.package_id) {
            bail!("package {} is not active", params.package_id);
        }
        debug!(package = %params.package_id, instance = %params.instance_id, "Creating applet");
        Ok(Box::new(InertApplet))
    }
}
