//! Snapshot of all declared applets, indexed by package and by instance
//!
//! A set is built wholesale from the raw declaration list and never edited
//! afterwards, except for re-resolving live panel fields when panels come
//! and go. Any change to the declarations produces a new set.

use std::collections::HashMap;
use tracing::{debug, error, warn};

use crate::config::{SettingsStore, SettingsWrite};
use crate::constants::settings::{ENABLED_APPLETS, NEXT_APPLET_ID};
use crate::definition::{upgrade_legacy_records, AppletDefinition};
use crate::host::PanelHost;
use crate::types::PanelId;

#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    raw: Vec<String>,
    definitions: Vec<AppletDefinition>,
    /// instance id -> index into `definitions`; later duplicates win
    by_instance: HashMap<String, usize>,
    /// package id -> indices into `definitions`, in declaration order
    by_package: HashMap<String, Vec<usize>>,
    package_order: Vec<String>,
}

impl DefinitionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode every record. Bad records are logged and skipped.
    pub fn build(raw: Vec<String>, panels: &dyn PanelHost) -> Self {
        let mut set = Self {
            raw,
            ..Self::default()
        };

        for record in &set.raw {
            let definition = match AppletDefinition::decode(record, panels) {
                Ok(definition) => definition,
                Err(err) => {
                    warn!(error = %err, "Skipping applet definition");
                    continue;
                }
            };

            let index = set.definitions.len();
            if let Some(previous) = set.by_instance.insert(definition.instance_id.clone(), index) {
                debug!(instance = %definition.instance_id, previous, "Duplicate instance id, later definition wins");
            }
            match set.by_package.get_mut(&definition.package_id) {
                Some(indices) => indices.push(index),
                None => {
                    set.by_package.insert(definition.package_id.clone(), vec![index]);
                    set.package_order.push(definition.package_id.clone());
                }
            }
            set.definitions.push(definition);
        }

        set
    }

    /// Read the declaration list from settings, upgrading legacy records
    /// first. The upgraded list and the advanced id counter are written back
    /// in one batch before anything is decoded.
    pub fn load(settings: &mut dyn SettingsStore, panels: &dyn PanelHost) -> Self {
        let mut raw = settings.string_list(ENABLED_APPLETS);
        let mut next_id = settings.int(NEXT_APPLET_ID);

        if upgrade_legacy_records(&mut raw, &mut next_id) {
            let writes = vec![
                SettingsWrite::int(NEXT_APPLET_ID, next_id),
                SettingsWrite::string_list(ENABLED_APPLETS, raw.clone()),
            ];
            if let Err(err) = settings.apply(writes) {
                error!(error = ?err, "Failed to persist upgraded applet definitions");
            }
        }

        Self::build(raw, panels)
    }

    /// The persisted form this set was built from
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn instance(&self, instance_id: &str) -> Option<&AppletDefinition> {
        self.by_instance
            .get(instance_id)
            .map(|&index| &self.definitions[index])
    }

    pub fn contains_instance(&self, instance_id: &str) -> bool {
        self.by_instance.contains_key(instance_id)
    }

    pub fn contains_package(&self, package_id: &str) -> bool {
        self.by_package.contains_key(package_id)
    }

    /// Definitions of one package in declaration order
    pub fn package(&self, package_id: &str) -> impl Iterator<Item = &AppletDefinition> {
        self.by_package
            .get(package_id)
            .into_iter()
            .flatten()
            .map(|&index| &self.definitions[index])
    }

    pub fn package_count(&self, package_id: &str) -> usize {
        self.by_package.get(package_id).map_or(0, Vec::len)
    }

    /// Package ids in order of first appearance
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.package_order.iter().map(String::as_str)
    }

    /// One definition per instance id, in declaration order
    pub fn instances(&self) -> impl Iterator<Item = &AppletDefinition> {
        self.definitions
            .iter()
            .enumerate()
            .filter(|(index, definition)| self.by_instance.get(&definition.instance_id) == Some(index))
            .map(|(_, definition)| definition)
    }

    pub fn on_panel(&self, panel_id: PanelId) -> impl Iterator<Item = &AppletDefinition> {
        self.instances().filter(move |definition| definition.panel_id == panel_id)
    }

    pub fn len(&self) -> usize {
        self.by_instance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_instance.is_empty()
    }

    /// Re-derive live fields of the definitions declared on one panel
    pub fn resolve_panel(&mut self, panel_id: PanelId, panels: &dyn PanelHost) {
        for definition in self.definitions.iter_mut().filter(|d| d.panel_id == panel_id) {
            definition.resolve(panels);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;
    use crate::host::MemoryPanelHost;
    use crate::types::PanelGeometry;

    fn host() -> MemoryPanelHost {
        let mut host = MemoryPanelHost::new();
        host.add_panel(PanelGeometry::new(0, false, 30));
        host.add_panel(PanelGeometry::new(1, true, 40));
        host
    }

    fn raw(records: &[&str]) -> Vec<String> {
        records.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_build_indices() {
        let set = DefinitionSet::build(
            raw(&[
                "panel1:left:0:menu@shell:1",
                "panel1:right:0:clock@shell:2",
                "panel0:right:1:clock@shell:3",
            ]),
            &host(),
        );

        assert_eq!(set.len(), 3);
        assert_eq!(set.packages().collect::<Vec<_>>(), vec!["menu@shell", "clock@shell"]);
        let clocks: Vec<&str> = set.package("clock@shell").map(|d| d.instance_id.as_str()).collect();
        assert_eq!(clocks, vec!["2", "3"]);
        assert_eq!(set.instance("3").map(|d| d.panel_id), Some(0));
        assert_eq!(set.package_count("missing"), 0);
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let set = DefinitionSet::build(
            raw(&["garbage", "panel1:left:0:menu@shell:1", "panelZ:left:0:a:2"]),
            &host(),
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.raw().len(), 3);
        assert!(set.contains_instance("1"));
    }

    #[test]
    fn test_duplicate_instance_later_wins() {
        let set = DefinitionSet::build(
            raw(&["panel1:left:0:menu@shell:1", "panel0:right:4:menu@shell:1"]),
            &host(),
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.instance("1").map(|d| d.order), Some(4));
        assert_eq!(set.instances().count(), 1);
        assert_eq!(set.package_count("menu@shell"), 2);
    }

    #[test]
    fn test_on_panel() {
        let set = DefinitionSet::build(
            raw(&[
                "panel1:left:0:menu@shell:1",
                "panel0:left:0:clock@shell:2",
                "panel1:right:0:clock@shell:3",
            ]),
            &host(),
        );
        let ids: Vec<&str> = set.on_panel(1).map(|d| d.instance_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_load_upgrades_legacy_records() {
        let mut settings =
            MemorySettings::with_declarations(&["panel0:left:3:pkg.x", "panel1:left:0:pkg.y:2"], 7);

        let set = DefinitionSet::load(&mut settings, &host());

        assert_eq!(
            settings.string_list(ENABLED_APPLETS),
            vec!["panel0:left:3:pkg.x:7", "panel1:left:0:pkg.y:2"]
        );
        assert_eq!(settings.int(NEXT_APPLET_ID), 8);
        assert_eq!(settings.batches(), 1);
        assert!(set.contains_instance("7"));
    }

    #[test]
    fn test_load_without_legacy_does_not_write() {
        let mut settings = MemorySettings::with_declarations(&["panel1:left:0:pkg.y:2"], 3);
        let set = DefinitionSet::load(&mut settings, &host());
        assert_eq!(settings.batches(), 0);
        assert!(!settings.take_changed(ENABLED_APPLETS));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_resolve_panel_after_creation() {
        let mut host = MemoryPanelHost::new();
        let mut set = DefinitionSet::build(raw(&["panel2:center:0:menu@shell:1"]), &host);
        assert!(set.instance("1").unwrap().container().is_none());

        host.add_panel(PanelGeometry::new(2, true, 40));
        set.resolve_panel(2, &host);
        assert!(set.instance("1").unwrap().container().is_some());
    }
}
