//! Diff between two definition snapshots
//!
//! [`plan`] turns an old and a new [`DefinitionSet`] into the ordered list of
//! instructions that make the live applets match the new declarations. The
//! order of the phases matters: removals first, then package unloads, then
//! placements for new or moved instances, then package loads.

use crate::definition::AppletDefinition;
use crate::definition_set::DefinitionSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Instance no longer declared
    Remove(AppletDefinition),
    /// No instance of this package is declared any more
    UnloadPackage(String),
    /// Instance is new, or its placement changed
    Place(AppletDefinition),
    /// Make sure the package is loaded (idempotent)
    EnsureLoaded(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub instructions: Vec<Instruction>,
}

impl ReconcilePlan {
    pub fn removals(&self) -> impl Iterator<Item = &AppletDefinition> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::Remove(definition) => Some(definition),
            _ => None,
        })
    }

    pub fn unloads(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::UnloadPackage(package) => Some(package.as_str()),
            _ => None,
        })
    }

    pub fn placements(&self) -> impl Iterator<Item = &AppletDefinition> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::Place(definition) => Some(definition),
            _ => None,
        })
    }

    pub fn loads(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::EnsureLoaded(package) => Some(package.as_str()),
            _ => None,
        })
    }

    /// Number of instructions that change live state (everything except
    /// the idempotent load requests)
    pub fn change_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| !matches!(i, Instruction::EnsureLoaded(_)))
            .count()
    }
}

pub fn plan(old: &DefinitionSet, new: &DefinitionSet) -> ReconcilePlan {
    let mut instructions = Vec::new();

    for definition in old.instances() {
        if !new.contains_instance(&definition.instance_id) {
            instructions.push(Instruction::Remove(definition.clone()));
        }
    }

    for package in old.packages() {
        if !new.contains_package(package) {
            instructions.push(Instruction::UnloadPackage(package.to_string()));
        }
    }

    for definition in new.instances() {
        let unchanged = old
            .instance(&definition.instance_id)
            .is_some_and(|previous| previous.same_placement(definition));
        if !unchanged {
            instructions.push(Instruction::Place(definition.clone()));
        }
    }

    for package in new.packages() {
        instructions.push(Instruction::EnsureLoaded(package.to_string()));
    }

    ReconcilePlan { instructions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryPanelHost;
    use crate::types::PanelGeometry;

    fn host() -> MemoryPanelHost {
        let mut host = MemoryPanelHost::new();
        host.add_panel(PanelGeometry::new(1, true, 40));
        host.add_panel(PanelGeometry::new(2, false, 30));
        host
    }

    fn set(host: &MemoryPanelHost, records: &[&str]) -> DefinitionSet {
        DefinitionSet::build(records.iter().map(|r| r.to_string()).collect(), host)
    }

    fn ids<'a>(defs: impl Iterator<Item = &'a AppletDefinition>) -> Vec<&'a str> {
        defs.map(|d| d.instance_id.as_str()).collect()
    }

    #[test]
    fn test_same_snapshot_is_noop() {
        let host = host();
        let snapshot = set(&host, &["panel1:left:0:menu:1", "panel1:right:0:clock:2"]);

        let plan = plan(&snapshot, &snapshot);

        assert_eq!(plan.change_count(), 0);
        assert_eq!(plan.loads().collect::<Vec<_>>(), vec!["menu", "clock"]);
    }

    #[test]
    fn test_add_and_remove() {
        let host = host();
        let old = set(&host, &["panel1:left:0:pkg.a:A", "panel1:left:1:pkg.b:B"]);
        let new = set(&host, &["panel1:left:1:pkg.b:B", "panel1:left:2:pkg.c:C"]);

        let plan = plan(&old, &new);

        assert_eq!(ids(plan.removals()), vec!["A"]);
        assert_eq!(ids(plan.placements()), vec!["C"]);
        assert_eq!(plan.unloads().collect::<Vec<_>>(), vec!["pkg.a"]);
        assert_eq!(plan.loads().collect::<Vec<_>>(), vec!["pkg.b", "pkg.c"]);
    }

    #[test]
    fn test_phase_order() {
        let host = host();
        let old = set(&host, &["panel1:left:0:pkg.a:A"]);
        let new = set(&host, &["panel1:left:0:pkg.c:C"]);

        let plan = plan(&old, &new);

        assert_eq!(
            plan.instructions,
            vec![
                Instruction::Remove(old.instance("A").unwrap().clone()),
                Instruction::UnloadPackage("pkg.a".into()),
                Instruction::Place(new.instance("C").unwrap().clone()),
                Instruction::EnsureLoaded("pkg.c".into()),
            ]
        );
    }

    #[test]
    fn test_moves_detected() {
        let host = host();
        let old = set(
            &host,
            &[
                "panel1:left:0:pkg:1",
                "panel1:left:1:pkg:2",
                "panel1:left:2:pkg:3",
                "panel1:left:3:pkg:4",
            ],
        );
        let new = set(
            &host,
            &[
                "panel1:left:5:pkg:1",
                "panel2:left:1:pkg:2",
                "panel1:right:2:pkg:3",
                "panel1:left:3:other:4",
            ],
        );

        let plan = plan(&old, &new);

        // Package change alone is not a placement change
        assert_eq!(ids(plan.placements()), vec!["1", "2", "3"]);
        assert_eq!(plan.removals().count(), 0);
    }

    #[test]
    fn test_package_kept_while_any_instance_remains() {
        let host = host();
        let old = set(&host, &["panel1:left:0:pkg:1", "panel1:left:1:pkg:2"]);
        let new = set(&host, &["panel1:left:1:pkg:2"]);

        let plan = plan(&old, &new);

        assert_eq!(ids(plan.removals()), vec!["1"]);
        assert_eq!(plan.unloads().count(), 0);
    }

    #[test]
    fn test_from_empty() {
        let host = host();
        let new = set(&host, &["panel1:left:0:pkg:1", "panel9:left:0:pkg:2"]);

        let plan = plan(&DefinitionSet::empty(), &new);

        assert_eq!(ids(plan.placements()), vec!["1", "2"]);
    }
}
