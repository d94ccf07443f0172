//! Shared fixtures for unit tests: a recording applet, a scriptable package
//! loader and a shell bundling every collaborator in memory.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config::MemorySettings;
use crate::host::MemoryPanelHost;
use crate::manager::ShellContext;
use crate::notify::LogNotifier;
use crate::packages::{AppletParams, PackageLoader, PackageManifest, PackageState};
use crate::registry::Applet;
use crate::roles::RoleTable;
use crate::types::{Orientation, PanelGeometry};

/// Hook calls, formatted as `"<instance>:<hook>"`
pub type HookLog = Rc<RefCell<Vec<String>>>;

pub struct RecordingApplet {
    instance_id: String,
    log: HookLog,
    fail_removal: bool,
}

impl Applet for RecordingApplet {
    fn on_added_to_panel(&mut self, startup_complete: bool) {
        self.log
            .borrow_mut()
            .push(format!("{}:added:{}", self.instance_id, startup_complete));
    }

    fn on_removed_from_panel(&mut self) -> Result<()> {
        self.log.borrow_mut().push(format!("{}:removed", self.instance_id));
        if self.fail_removal {
            bail!("teardown exploded");
        }
        Ok(())
    }

    fn on_instances_changed(&mut self) {
        self.log.borrow_mut().push(format!("{}:instances_changed", self.instance_id));
    }

    fn set_panel_height(&mut self, height: u32) {
        self.log.borrow_mut().push(format!("{}:height:{}", self.instance_id, height));
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.log
            .borrow_mut()
            .push(format!("{}:orientation:{:?}", self.instance_id, orientation));
    }
}

/// Loader whose behaviour per package is set up by the test
#[derive(Default)]
pub struct ScriptedLoader {
    pub manifests: HashMap<String, PackageManifest>,
    pub states: HashMap<String, PackageState>,
    /// Packages whose load completes later (stay `Loading`)
    pub deferred: HashSet<String>,
    /// Packages whose factory fails
    pub broken: HashSet<String>,
    /// Instances whose removal hook fails
    pub fragile: HashSet<String>,
    pub created: Vec<String>,
    pub unloaded: Vec<String>,
    pub log: HookLog,
}

impl ScriptedLoader {
    pub fn package(&mut self, package_id: &str, manifest: PackageManifest) {
        self.manifests.insert(package_id.to_string(), manifest);
    }

    /// Finish a deferred load
    pub fn complete(&mut self, package_id: &str) {
        self.deferred.remove(package_id);
        self.states.insert(package_id.to_string(), PackageState::Active);
    }
}

impl PackageLoader for ScriptedLoader {
    fn load(&mut self, package_id: &str) -> PackageState {
        let state = if self.state(package_id) == PackageState::Active {
            PackageState::Active
        } else if self.deferred.contains(package_id) {
            PackageState::Loading
        } else if self.manifests.contains_key(package_id) {
            PackageState::Active
        } else {
            PackageState::Failed
        };
        self.states.insert(package_id.to_string(), state);
        state
    }

    fn unload(&mut self, package_id: &str) {
        self.states.remove(package_id);
        self.unloaded.push(package_id.to_string());
    }

    fn state(&self, package_id: &str) -> PackageState {
        self.states.get(package_id).copied().unwrap_or(PackageState::Unloaded)
    }

    fn manifest(&self, package_id: &str) -> Option<PackageManifest> {
        self.manifests.get(package_id).cloned()
    }

    fn instantiate(&mut self, params: &AppletParams<'_>) -> Result<Box<dyn Applet>> {
        if self.broken.contains(params.package_id) {
            bail!("main() threw for {}", params.package_id);
        }
        self.created.push(params.instance_id.to_string());
        Ok(Box::new(RecordingApplet {
            instance_id: params.instance_id.to_string(),
            log: self.log.clone(),
            fail_removal: self.fragile.contains(params.instance_id),
        }))
    }
}

/// Every collaborator of the manager, in memory
#[derive(Default)]
pub struct TestShell {
    pub panels: MemoryPanelHost,
    pub loader: ScriptedLoader,
    pub roles: RoleTable,
    pub settings: MemorySettings,
    pub notifier: LogNotifier,
}

impl TestShell {
    /// Shell with panels 0 (top) and 1 (bottom) and the given declarations
    pub fn new(declarations: &[&str], next_id: i64) -> Self {
        let mut shell = Self {
            settings: MemorySettings::with_declarations(declarations, next_id),
            ..Self::default()
        };
        shell.panels.add_panel(PanelGeometry::new(0, false, 30));
        shell.panels.add_panel(PanelGeometry::new(1, true, 40));
        shell
    }

    pub fn ctx(&mut self) -> ShellContext<'_> {
        ShellContext {
            panels: &mut self.panels,
            packages: &mut self.loader,
            roles: &mut self.roles,
            settings: &mut self.settings,
            notifier: &mut self.notifier,
        }
    }

    pub fn hooks(&self) -> Vec<String> {
        self.loader.log.borrow().clone()
    }

    pub fn clear_hooks(&self) {
        self.loader.log.borrow_mut().clear();
    }
}
