//! Applet lifecycle manager
//!
//! Owns the current [`DefinitionSet`] and the live instances, and keeps the
//! panels in line with the persisted declarations. Every operation receives
//! a [`ShellContext`] with the shell collaborators it may touch; the manager
//! never holds on to them between calls.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::clipboard::{clear_panel, Clipboard, PasteReport};
use crate::config::{remove_instance_config, ManagerConfig, SettingsStore};
use crate::constants::{messages, settings::ENABLED_APPLETS};
use crate::definition::{encode_record, AppletDefinition};
use crate::definition_set::DefinitionSet;
use crate::error::AppletError;
use crate::host::PanelHost;
use crate::notify::Notifier;
use crate::packages::{AppletParams, PackageLoader, PackageState};
use crate::placement::{detach_applet, place_applet};
use crate::reconcile::{self, Instruction};
use crate::registry::{InstanceRegistry, LiveApplet};
use crate::roles::{Role, RoleLock, RoleRegistry};
use crate::types::{ContainerId, Location, PanelGeometry, PanelId};

/// Shell collaborators borrowed for the duration of one operation
pub struct ShellContext<'a> {
    pub panels: &'a mut dyn PanelHost,
    pub packages: &'a mut dyn PackageLoader,
    pub roles: &'a mut dyn RoleRegistry,
    pub settings: &'a mut dyn SettingsStore,
    pub notifier: &'a mut dyn Notifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// The instance sits in its container
    Placed,
    /// The target panel doesn't exist yet; nothing was done
    Deferred,
}

/// What a reconciliation (or a package/panel load) changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    pub unloaded: Vec<String>,
    pub placed: Vec<String>,
    pub failed: Vec<AppletError>,
}

pub struct AppletManager {
    instance_config_dir: PathBuf,
    definitions: DefinitionSet,
    registry: InstanceRegistry,
    /// package id -> definitions of the instances it has placed
    loaded: HashMap<String, BTreeMap<String, AppletDefinition>>,
    clipboard: Clipboard,
    startup_complete: bool,
}

impl AppletManager {
    pub fn new(instance_config_dir: impl Into<PathBuf>) -> Self {
        Self {
            instance_config_dir: instance_config_dir.into(),
            definitions: DefinitionSet::empty(),
            registry: InstanceRegistry::new(),
            loaded: HashMap::new(),
            clipboard: Clipboard::new(),
            startup_complete: false,
        }
    }

    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::new(config.instance_config_dir())
    }

    pub fn definitions(&self) -> &DefinitionSet {
        &self.definitions
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn instance_config_dir(&self) -> &Path {
        &self.instance_config_dir
    }

    /// Instance ids a package currently has placed
    pub fn loaded_instances(&self, package_id: &str) -> Vec<&str> {
        self.loaded
            .get(package_id)
            .map(|defs| defs.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    // ==========================================================================
    // Startup and change handling
    // ==========================================================================

    /// Read the declarations and load every package they reference.
    /// Packages that activate right away get their applets placed now; the
    /// rest come in through [`AppletManager::finish_package_load`].
    pub fn initialize(&mut self, ctx: &mut ShellContext<'_>) -> ReconcileReport {
        self.startup_complete = false;
        self.definitions = DefinitionSet::load(&mut *ctx.settings, &*ctx.panels);

        let mut report = ReconcileReport::default();
        let packages: Vec<String> = self.definitions.packages().map(str::to_string).collect();
        for package_id in &packages {
            self.ensure_loaded(ctx, package_id, &mut report);
        }
        self.startup_complete = true;

        info!(
            definitions = self.definitions.len(),
            packages = packages.len(),
            placed = report.placed.len(),
            "Applet manager initialized"
        );
        report
    }

    /// Run [`AppletManager::handle_declarations_changed`] if the declaration
    /// list changed since the last call
    pub fn pump(&mut self, ctx: &mut ShellContext<'_>) -> Option<ReconcileReport> {
        if ctx.settings.take_changed(ENABLED_APPLETS) {
            Some(self.handle_declarations_changed(ctx))
        } else {
            None
        }
    }

    /// The declaration list changed: rebuild the snapshot and reconcile
    /// against the previous one. The status area is refreshed whatever the
    /// outcome.
    pub fn handle_declarations_changed(&mut self, ctx: &mut ShellContext<'_>) -> ReconcileReport {
        let new = DefinitionSet::load(&mut *ctx.settings, &*ctx.panels);
        let report = self.reconcile(ctx, new);
        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "Failed to refresh some applets");
        }
        ctx.notifier.redisplay_status();
        report
    }

    /// Make the live applets match `new`, then keep `new` as the current set
    pub fn reconcile(&mut self, ctx: &mut ShellContext<'_>, new: DefinitionSet) -> ReconcileReport {
        let old = std::mem::replace(&mut self.definitions, new);
        let plan = reconcile::plan(&old, &self.definitions);
        debug!(
            removals = plan.removals().count(),
            unloads = plan.unloads().count(),
            placements = plan.placements().count(),
            loads = plan.loads().count(),
            "Planned applet reconciliation"
        );
        let mut report = ReconcileReport::default();

        // Removals first; each package hears about its changed instance set
        // once, after all of its removals
        let mut touched: Vec<String> = Vec::new();
        for definition in plan.removals() {
            if let Some(package_id) = self.remove_instance(ctx, &definition.instance_id, false) {
                report.removed.push(definition.instance_id.clone());
                if !touched.contains(&package_id) {
                    touched.push(package_id);
                }
            }
        }
        for package_id in &touched {
            self.notify_instances_changed(package_id);
        }

        for instruction in &plan.instructions {
            match instruction {
                Instruction::Remove(_) => {}
                Instruction::UnloadPackage(package_id) => {
                    self.unload_package(ctx, package_id);
                    report.unloaded.push(package_id.clone());
                }
                Instruction::Place(definition) => {
                    // Packages still loading place their applets when they finish
                    if ctx.packages.is_loaded(&definition.package_id) {
                        self.try_add(ctx, definition, &mut report);
                    }
                }
                Instruction::EnsureLoaded(package_id) => {
                    self.ensure_loaded(ctx, package_id, &mut report);
                }
            }
        }

        info!(
            removed = report.removed.len(),
            unloaded = report.unloaded.len(),
            placed = report.placed.len(),
            failed = report.failed.len(),
            "Reconciled applet definitions"
        );
        report
    }

    // ==========================================================================
    // Packages
    // ==========================================================================

    fn ensure_loaded(&mut self, ctx: &mut ShellContext<'_>, package_id: &str, report: &mut ReconcileReport) {
        match ctx.packages.state(package_id) {
            PackageState::Active | PackageState::Loading => return,
            PackageState::Unloaded | PackageState::Failed => {}
        }

        match ctx.packages.load(package_id) {
            PackageState::Active => {
                debug!(
                    package = %package_id,
                    declared = self.definitions.package_count(package_id),
                    "Package active, adding its applets"
                );
                self.place_package(ctx, package_id, report);
            }
            PackageState::Loading => {
                debug!(package = %package_id, "Package loading, applets will be added when it finishes");
            }
            state => {
                warn!(package = %package_id, state = ?state, "Package failed to load");
            }
        }
    }

    /// A package finished loading: place every declared instance of it.
    /// Returns false if any of them failed.
    pub fn finish_package_load(&mut self, ctx: &mut ShellContext<'_>, package_id: &str) -> bool {
        let mut report = ReconcileReport::default();
        self.place_package(ctx, package_id, &mut report);
        report.failed.is_empty()
    }

    fn place_package(&mut self, ctx: &mut ShellContext<'_>, package_id: &str, report: &mut ReconcileReport) {
        let definitions: Vec<AppletDefinition> = self
            .definitions
            .package(package_id)
            .filter(|definition| {
                self.definitions
                    .instance(&definition.instance_id)
                    .is_some_and(|winner| std::ptr::eq(winner, *definition))
            })
            .cloned()
            .collect();

        for definition in &definitions {
            self.try_add(ctx, definition, report);
        }
    }

    /// A package is about to be unloaded: remove every instance it placed
    pub fn prepare_package_unload(&mut self, ctx: &mut ShellContext<'_>, package_id: &str) {
        let instance_ids: Vec<String> = self
            .loaded
            .get(package_id)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default();

        for instance_id in &instance_ids {
            self.remove_instance(ctx, instance_id, false);
        }
        if !instance_ids.is_empty() {
            self.notify_instances_changed(package_id);
        }
    }

    fn unload_package(&mut self, ctx: &mut ShellContext<'_>, package_id: &str) {
        self.prepare_package_unload(ctx, package_id);
        if let Some(role) = ctx.packages.manifest(package_id).and_then(|m| m.role) {
            ctx.roles.unlock(role, package_id);
        }
        ctx.packages.unload(package_id);
        info!(package = %package_id, "Unloaded applet package");
    }

    // ==========================================================================
    // Adding and removing instances
    // ==========================================================================

    fn try_add(&mut self, ctx: &mut ShellContext<'_>, definition: &AppletDefinition, report: &mut ReconcileReport) {
        match self.add_applet(ctx, definition) {
            Ok(PlaceOutcome::Placed) => report.placed.push(definition.instance_id.clone()),
            Ok(PlaceOutcome::Deferred) => {}
            Err(err) => {
                error!(
                    package = %definition.package_id,
                    instance = %definition.instance_id,
                    error = %err,
                    "Failed to load applet"
                );
                report.failed.push(err);
            }
        }
    }

    /// Create (or reuse) the instance for `definition` and put it in place.
    ///
    /// The package's role is claimed before the instance is created. A role
    /// held by another package refuses the instance; a factory failure
    /// releases a role this call acquired.
    pub fn add_applet(
        &mut self,
        ctx: &mut ShellContext<'_>,
        definition: &AppletDefinition,
    ) -> Result<PlaceOutcome, AppletError> {
        let (Some(container), Some(geometry)) = (definition.container(), definition.panel) else {
            return Ok(PlaceOutcome::Deferred);
        };

        let manifest = ctx.packages.manifest(&definition.package_id).unwrap_or_default();
        let mut acquired: Option<Role> = None;
        if let Some(role) = manifest.role {
            if ctx.roles.lock(role, &definition.package_id)? == RoleLock::Acquired {
                acquired = Some(role);
            }
        }

        if let Err(err) = self.create_or_reuse(ctx, definition, geometry) {
            if let Some(role) = acquired {
                ctx.roles.unlock(role, &definition.package_id);
            }
            return Err(err);
        }

        place_applet(
            &mut *ctx.panels,
            &mut self.registry,
            &definition.instance_id,
            container,
            definition.order,
        );
        self.loaded
            .entry(definition.package_id.clone())
            .or_default()
            .insert(definition.instance_id.clone(), definition.clone());

        if let Some(live) = self.registry.get_mut(&definition.instance_id) {
            live.applet_mut().on_added_to_panel(self.startup_complete);
        }
        Ok(PlaceOutcome::Placed)
    }

    fn create_or_reuse(
        &mut self,
        ctx: &mut ShellContext<'_>,
        definition: &AppletDefinition,
        geometry: PanelGeometry,
    ) -> Result<(), AppletError> {
        let instance_id = &definition.instance_id;

        match self.registry.get_mut(instance_id) {
            Some(live) if live.package_id == definition.package_id => {
                debug!(instance = %instance_id, "Applet already loaded");
                live.update_geometry(geometry.height, geometry.orientation(), false);
                return Ok(());
            }
            Some(live) => {
                warn!(
                    instance = %instance_id,
                    old_package = %live.package_id,
                    new_package = %definition.package_id,
                    "Instance id now belongs to another package, replacing applet"
                );
                self.remove_instance(ctx, instance_id, true);
            }
            None => {}
        }

        let params = AppletParams {
            package_id: &definition.package_id,
            instance_id,
            panel_id: definition.panel_id,
            orientation: geometry.orientation(),
            panel_height: geometry.height,
        };
        let applet = ctx
            .packages
            .instantiate(&params)
            .map_err(|err| AppletError::PackageLoadFailure {
                package_id: definition.package_id.clone(),
                instance_id: instance_id.clone(),
                reason: format!("{err:#}"),
            })?;

        self.registry.insert(LiveApplet::new(
            instance_id,
            &definition.package_id,
            definition.panel_id,
            geometry.height,
            geometry.orientation(),
            applet,
        ));
        info!(package = %definition.package_id, instance = %instance_id, "Created applet");
        Ok(())
    }

    /// Tear down a live instance. The removal hook may fail; detaching,
    /// bookkeeping and config cleanup happen regardless.
    /// Returns the instance's package, or `None` if it wasn't live.
    fn remove_instance(&mut self, ctx: &mut ShellContext<'_>, instance_id: &str, notify: bool) -> Option<String> {
        let live = self.registry.get_mut(instance_id)?;
        let package_id = live.package_id.clone();

        if let Err(err) = live.applet_mut().on_removed_from_panel() {
            let failure = AppletError::RemovalHookFailure {
                package_id: package_id.clone(),
                instance_id: instance_id.to_string(),
                reason: format!("{err:#}"),
            };
            error!(error = %failure, "Removal hook failed, removing applet anyway");
        }

        detach_applet(&mut *ctx.panels, &mut self.registry, instance_id);

        if let Some(defs) = self.loaded.get_mut(&package_id) {
            defs.remove(instance_id);
            if defs.is_empty() {
                self.loaded.remove(&package_id);
            }
        }
        self.registry.remove(instance_id);

        if let Err(err) = remove_instance_config(&self.instance_config_dir, &package_id, instance_id) {
            error!(error = ?err, "Failed to remove applet config file");
        }

        info!(package = %package_id, instance = %instance_id, "Removed applet");
        if notify {
            self.notify_instances_changed(&package_id);
        }
        Some(package_id)
    }

    /// Tell every declared, live instance of a package that the set changed
    fn notify_instances_changed(&mut self, package_id: &str) {
        for definition in self.definitions.instances() {
            if definition.package_id != package_id {
                continue;
            }
            if let Some(live) = self.registry.get_mut(&definition.instance_id) {
                if live.package_id == package_id {
                    live.applet_mut().on_instances_changed();
                }
            }
        }
    }

    /// Drop one declaration from the persisted list. The instance goes away
    /// when the resulting change is reconciled.
    pub fn remove_applet_from_panel(
        &mut self,
        ctx: &mut ShellContext<'_>,
        package_id: &str,
        instance_id: &str,
    ) -> Result<bool> {
        let raw = self.definitions.raw();
        let position = raw.iter().position(|record| {
            AppletDefinition::parse(record)
                .is_ok_and(|d| d.package_id == package_id && d.instance_id == instance_id)
        });

        let Some(position) = position else {
            debug!(package = %package_id, instance = %instance_id, "No declaration to remove");
            return Ok(false);
        };

        let mut records = raw.to_vec();
        records.remove(position);
        ctx.settings.set_string_list(ENABLED_APPLETS, records)?;
        Ok(true)
    }

    // ==========================================================================
    // Panels
    // ==========================================================================

    /// A panel was (re)built: resolve its definitions and add the applets of
    /// active packages
    pub fn load_applets_on_panel(&mut self, ctx: &mut ShellContext<'_>, panel_id: PanelId) -> ReconcileReport {
        self.definitions.resolve_panel(panel_id, &*ctx.panels);

        let definitions: Vec<AppletDefinition> = self.definitions.on_panel(panel_id).cloned().collect();
        let mut report = ReconcileReport::default();
        for definition in &definitions {
            if ctx.packages.is_loaded(&definition.package_id) {
                self.try_add(ctx, definition, &mut report);
            }
        }
        info!(panel = panel_id, placed = report.placed.len(), "Loaded applets on panel");
        report
    }

    /// Panel geometry changed: refresh definitions and push height and
    /// orientation into its applets
    pub fn update_applets_on_panel(&mut self, ctx: &mut ShellContext<'_>, panel_id: PanelId) {
        self.definitions.resolve_panel(panel_id, &*ctx.panels);
        let Some(geometry) = ctx.panels.panel(panel_id) else {
            return;
        };

        let instance_ids: Vec<String> = self
            .definitions
            .on_panel(panel_id)
            .map(|d| d.instance_id.clone())
            .collect();
        for instance_id in &instance_ids {
            if let Some(live) = self.registry.get_mut(instance_id) {
                live.update_geometry(geometry.height, geometry.orientation(), true);
            }
        }
    }

    /// A panel is going away: remove its applets. Declarations stay.
    pub fn unload_applets_on_panel(&mut self, ctx: &mut ShellContext<'_>, panel_id: PanelId) {
        let instance_ids: Vec<String> = self
            .definitions
            .on_panel(panel_id)
            .map(|d| d.instance_id.clone())
            .collect();
        for instance_id in &instance_ids {
            self.remove_instance(ctx, instance_id, true);
        }
        self.definitions.resolve_panel(panel_id, &*ctx.panels);
        info!(panel = panel_id, "Unloaded applets on panel");
    }

    /// Push current panel heights into every live applet
    pub fn update_applet_panel_heights(&mut self, ctx: &mut ShellContext<'_>, force_recalc: bool) {
        for definition in self.definitions.instances() {
            let Some(height) = ctx.panels.panel(definition.panel_id).map(|p| p.height) else {
                continue;
            };
            if let Some(live) = self.registry.get_mut(&definition.instance_id) {
                live.update_panel_height(height, force_recalc);
            }
        }
    }

    // ==========================================================================
    // Positions
    // ==========================================================================

    /// Record a drag-and-drop destination to be written by
    /// [`AppletManager::save_applet_positions`]
    pub fn stage_move(
        &mut self,
        instance_id: &str,
        container: ContainerId,
        order: i32,
    ) -> Result<(), AppletError> {
        let live = self
            .registry
            .get_mut(instance_id)
            .ok_or_else(|| AppletError::UnknownInstance(instance_id.to_string()))?;
        live.pending_container = Some(container);
        live.pending_order = Some(order);
        Ok(())
    }

    /// Write the live layout back as the declaration list.
    ///
    /// Panels are walked in id order, zones left to right; staged moves win
    /// over the current spot. Declarations without a live applet (panel not
    /// built, package not loaded) are kept as they were.
    pub fn save_applet_positions(&mut self, ctx: &mut ShellContext<'_>) -> Result<()> {
        let panel_ids = ctx.panels.panel_ids();

        let mut live_ids: Vec<String> = Vec::new();
        for &panel_id in &panel_ids {
            for location in Location::ALL {
                for child in ctx.panels.children(ContainerId::new(panel_id, location)) {
                    if let Some(id) = child.applet_id() {
                        if self.registry.contains(id) {
                            live_ids.push(id.to_string());
                        }
                    }
                }
            }
        }

        let mut records = Vec::new();
        let mut saved: HashSet<&str> = HashSet::new();
        for &panel_id in &panel_ids {
            for location in Location::ALL {
                let zone = ContainerId::new(panel_id, location);
                for id in &live_ids {
                    let Some(live) = self.registry.get(id) else {
                        continue;
                    };
                    if live.effective_container() == Some(zone) {
                        records.push(encode_record(
                            panel_id,
                            location,
                            live.effective_order(),
                            &live.package_id,
                            id,
                        ));
                        saved.insert(id.as_str());
                    }
                }
            }
        }

        for record in self.definitions.raw() {
            if let Ok(definition) = AppletDefinition::parse(record) {
                if !saved.contains(definition.instance_id.as_str()) {
                    records.push(record.clone());
                }
            }
        }

        for live in self.registry.iter_mut() {
            live.clear_pending();
        }

        info!(records = records.len(), "Saving applet positions");
        ctx.settings.set_string_list(ENABLED_APPLETS, records)
    }

    // ==========================================================================
    // Clipboard
    // ==========================================================================

    pub fn copy_applet_configuration(&mut self, panel_id: PanelId) {
        self.clipboard.copy(&self.definitions, panel_id);
    }

    pub fn clear_applet_configuration(&mut self, ctx: &mut ShellContext<'_>, panel_id: PanelId) -> Result<usize> {
        clear_panel(&mut *ctx.settings, panel_id)
    }

    /// Replace a panel's applets with the clipboard. Entries over their
    /// package's instance limit are skipped and reported to the user once.
    pub fn paste_applet_configuration(
        &mut self,
        ctx: &mut ShellContext<'_>,
        panel_id: PanelId,
    ) -> Result<PasteReport> {
        if self.clipboard.is_empty() {
            warn!(panel = panel_id, "Clipboard is empty, pasting clears the panel");
        }
        let report = self
            .clipboard
            .paste(&mut *ctx.settings, &self.definitions, &*ctx.packages, panel_id)?;
        if report.any_skipped() {
            ctx.notifier.notify_user(messages::PASTE_SKIPPED);
        }
        Ok(report)
    }

    // ==========================================================================
    // Lookups
    // ==========================================================================

    pub fn instance(&self, instance_id: &str) -> Option<&LiveApplet> {
        self.registry.get(instance_id)
    }

    /// Live instances of a package that are still declared
    pub fn instances_for_package(&self, package_id: &str) -> Vec<&LiveApplet> {
        self.definitions
            .instances()
            .filter_map(|d| self.registry.get(&d.instance_id))
            .filter(|live| live.package_id == package_id)
            .collect()
    }

    /// Any live instance of a package
    pub fn first_instance_for_package(&self, package_id: &str) -> Option<&LiveApplet> {
        self.registry.iter().find(|live| live.package_id == package_id)
    }

    pub fn role_provider(&self, roles: &dyn RoleRegistry, role: Role) -> Option<String> {
        roles.provider(role)
    }

    pub fn role_provider_exists(&self, roles: &dyn RoleRegistry, role: Role) -> bool {
        roles.provider(role).is_some()
    }
}
