//! Copying a panel's applet layout onto another panel
//!
//! There is one global clipboard. `copy` snapshots the definitions of a
//! panel, `paste` wipes the destination panel's declarations and appends a
//! fresh instance for every clipboard entry the package's instance limit
//! still allows.

use anyhow::Result;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::{SettingsStore, SettingsWrite};
use crate::constants::settings::{ENABLED_APPLETS, NEXT_APPLET_ID};
use crate::definition::{encode_record, record_on_panel, AppletDefinition};
use crate::definition_set::DefinitionSet;
use crate::packages::PackageLoader;
use crate::types::PanelId;

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    entries: Vec<AppletDefinition>,
}

/// What a paste did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteReport {
    /// Records appended to the declaration list
    pub pasted: Vec<String>,
    /// Packages of entries dropped for exceeding their instance limit
    pub skipped: Vec<String>,
}

impl PasteReport {
    pub fn any_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clipboard with the definitions declared on `panel_id`
    pub fn copy(&mut self, definitions: &DefinitionSet, panel_id: PanelId) {
        self.entries = definitions.on_panel(panel_id).cloned().collect();
        info!(panel = panel_id, entries = self.entries.len(), "Copied panel applets");
    }

    pub fn entries(&self) -> &[AppletDefinition] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the declarations on `panel_id` with the clipboard contents.
    ///
    /// `definitions` is the current snapshot, used to count how many
    /// instances of each package exist outside the destination panel.
    /// New instance ids come from the persisted counter, which is written
    /// together with the new list.
    pub fn paste(
        &self,
        settings: &mut dyn SettingsStore,
        definitions: &DefinitionSet,
        packages: &dyn PackageLoader,
        panel_id: PanelId,
    ) -> Result<PasteReport> {
        let mut raw = settings.string_list(ENABLED_APPLETS);
        raw.retain(|record| !record_on_panel(record, panel_id));

        let mut next_id = settings.int(NEXT_APPLET_ID);
        let mut pasted_per_package: HashMap<&str, usize> = HashMap::new();
        let mut report = PasteReport::default();

        for entry in &self.entries {
            let manifest = packages.manifest(&entry.package_id).unwrap_or_default();
            let pasted_so_far = pasted_per_package.get(entry.package_id.as_str()).copied().unwrap_or(0);

            let allowed = manifest.is_unlimited() || {
                let remaining = definitions
                    .instances()
                    .filter(|d| d.package_id == entry.package_id && d.panel_id != panel_id)
                    .count();
                manifest.allows_another(remaining + pasted_so_far)
            };

            if !allowed {
                warn!(package = %entry.package_id, max = manifest.max_instances, "Not pasting applet, instance limit reached");
                report.skipped.push(entry.package_id.clone());
                continue;
            }

            let Some(following) = next_id.checked_add(1) else {
                warn!(
                    package = %entry.package_id,
                    "Instance id counter exhausted, not pasting applet"
                );
                continue;
            };
            let record = encode_record(
                panel_id,
                entry.location,
                entry.order,
                &entry.package_id,
                &next_id.to_string(),
            );
            next_id = following;
            *pasted_per_package.entry(entry.package_id.as_str()).or_default() += 1;
            raw.push(record.clone());
            report.pasted.push(record);
        }

        settings.apply(vec![
            SettingsWrite::int(NEXT_APPLET_ID, next_id),
            SettingsWrite::string_list(ENABLED_APPLETS, raw),
        ])?;

        info!(
            panel = panel_id,
            pasted = report.pasted.len(),
            skipped = report.skipped.len(),
            "Pasted panel applets"
        );
        Ok(report)
    }
}

/// Drop every persisted declaration on `panel_id`, leaving the others
/// untouched. Returns how many were removed.
pub fn clear_panel(settings: &mut dyn SettingsStore, panel_id: PanelId) -> Result<usize> {
    let mut raw = settings.string_list(ENABLED_APPLETS);
    let before = raw.len();
    raw.retain(|record| !record_on_panel(record, panel_id));
    let removed = before - raw.len();

    settings.set_string_list(ENABLED_APPLETS, raw)?;
    info!(panel = panel_id, removed, "Cleared panel applets");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;
    use crate::host::MemoryPanelHost;
    use crate::packages::{PackageManifest, StaticPackageLoader};
    use crate::types::PanelGeometry;

    fn host() -> MemoryPanelHost {
        let mut host = MemoryPanelHost::new();
        for id in 0..3 {
            host.add_panel(PanelGeometry::new(id, true, 40));
        }
        host
    }

    fn loader() -> StaticPackageLoader {
        StaticPackageLoader::default()
            .with_package("menu@shell", PackageManifest::default())
            .with_package("launcher@shell", PackageManifest::unlimited())
            .with_package("tray@shell", PackageManifest { max_instances: 2, role: None })
    }

    #[test]
    fn test_copy_snapshots_panel() {
        let host = host();
        let set = DefinitionSet::build(
            vec![
                "panel1:left:0:menu@shell:1".into(),
                "panel2:left:0:launcher@shell:2".into(),
                "panel1:right:3:launcher@shell:3".into(),
            ],
            &host,
        );
        let mut clipboard = Clipboard::new();
        clipboard.copy(&set, 1);
        let ids: Vec<&str> = clipboard.entries().iter().map(|d| d.instance_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        clipboard.copy(&set, 2);
        assert_eq!(clipboard.entries().len(), 1);
    }

    #[test]
    fn test_clear_panel_leaves_others_untouched() {
        let records = [
            "panel2:left:0:menu@shell:1",
            "panel1:left:0:launcher@shell:2",
            "panel2:right:1:launcher@shell:3",
            "panel12:left:0:launcher@shell:4",
            "junk",
        ];
        let mut settings = MemorySettings::with_declarations(&records, 5);

        let removed = clear_panel(&mut settings, 2).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            settings.string_list(ENABLED_APPLETS),
            vec!["panel1:left:0:launcher@shell:2", "panel12:left:0:launcher@shell:4", "junk"]
        );
    }

    #[test]
    fn test_paste_allocates_ids_and_replaces_destination() {
        let host = host();
        let records = [
            "panel1:left:0:launcher@shell:1",
            "panel1:right:4:launcher@shell:2",
            "panel2:left:0:launcher@shell:3",
        ];
        let mut settings = MemorySettings::with_declarations(&records, 10);
        let set = DefinitionSet::build(settings.string_list(ENABLED_APPLETS), &host);
        let mut clipboard = Clipboard::new();
        clipboard.copy(&set, 1);

        let report = clipboard.paste(&mut settings, &set, &loader(), 2).unwrap();

        assert_eq!(
            report.pasted,
            vec!["panel2:left:0:launcher@shell:10", "panel2:right:4:launcher@shell:11"]
        );
        assert!(!report.any_skipped());
        assert_eq!(
            settings.string_list(ENABLED_APPLETS),
            vec![
                "panel1:left:0:launcher@shell:1",
                "panel1:right:4:launcher@shell:2",
                "panel2:left:0:launcher@shell:10",
                "panel2:right:4:launcher@shell:11",
            ]
        );
        assert_eq!(settings.int(NEXT_APPLET_ID), 12);
        assert_eq!(settings.batches(), 1);
    }

    #[test]
    fn test_paste_single_instance_package_is_skipped() {
        let host = host();
        let records = ["panel1:left:0:menu@shell:1"];
        let mut settings = MemorySettings::with_declarations(&records, 2);
        let set = DefinitionSet::build(settings.string_list(ENABLED_APPLETS), &host);
        let mut clipboard = Clipboard::new();
        clipboard.copy(&set, 1);

        let report = clipboard.paste(&mut settings, &set, &loader(), 0).unwrap();

        assert!(report.pasted.is_empty());
        assert_eq!(report.skipped, vec!["menu@shell"]);
        assert_eq!(settings.int(NEXT_APPLET_ID), 2);
    }

    #[test]
    fn test_paste_limit_counts_vacated_and_pasted_instances() {
        let host = host();
        // Two clipboard entries for a single-instance package
        let records = ["panel1:left:0:menu@shell:1", "panel1:left:1:menu@shell:2"];
        let mut settings = MemorySettings::with_declarations(&records, 4);
        let set = DefinitionSet::build(settings.string_list(ENABLED_APPLETS), &host);
        let mut clipboard = Clipboard::new();
        clipboard.copy(&set, 1);

        // The source panel still holds its copies, so another panel has no room
        let report = clipboard.paste(&mut settings.clone(), &set, &loader(), 2).unwrap();
        assert!(report.pasted.is_empty());
        assert_eq!(report.skipped, vec!["menu@shell", "menu@shell"]);

        // Pasting back onto panel 1 vacates both: one fits, the second is skipped
        let report = clipboard.paste(&mut settings, &set, &loader(), 1).unwrap();
        assert_eq!(report.pasted, vec!["panel1:left:0:menu@shell:4"]);
        assert_eq!(report.skipped, vec!["menu@shell"]);
    }

    #[test]
    fn test_paste_respects_limit_above_one() {
        let host = host();
        let records = [
            "panel1:left:0:tray@shell:1",
            "panel1:left:1:tray@shell:2",
        ];
        let mut settings = MemorySettings::with_declarations(&records, 3);
        let set = DefinitionSet::build(settings.string_list(ENABLED_APPLETS), &host);
        let mut clipboard = Clipboard::new();
        clipboard.copy(&set, 1);

        let report = clipboard.paste(&mut settings, &set, &loader(), 0).unwrap();

        assert!(report.pasted.is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_paste_stops_at_exhausted_id_counter() {
        let host = host();
        let records = ["panel1:left:0:launcher@shell:1"];
        let mut settings = MemorySettings::with_declarations(&records, i64::MAX);
        let set = DefinitionSet::build(settings.string_list(ENABLED_APPLETS), &host);
        let mut clipboard = Clipboard::new();
        clipboard.copy(&set, 1);

        let report = clipboard.paste(&mut settings, &set, &loader(), 2).unwrap();

        assert!(report.pasted.is_empty());
        assert!(!report.any_skipped());
        assert_eq!(settings.int(NEXT_APPLET_ID), i64::MAX);
        assert_eq!(settings.string_list(ENABLED_APPLETS), vec!["panel1:left:0:launcher@shell:1"]);
    }
}
