//! Panel host: the live panels and their zone containers
//!
//! The widget toolkit is outside this crate. The manager only needs to read
//! panel geometry and perform append-only surgery on a container's children,
//! which is what [`PanelHost`] exposes.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::types::{Align, ContainerId, Location, PanelGeometry, PanelId};

/// A child actor of a zone container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Child {
    /// Actor of a live applet instance
    Applet(String),
    /// Any other actor the panel put in the box
    Widget(String),
}

impl Child {
    pub fn applet_id(&self) -> Option<&str> {
        match self {
            Child::Applet(id) => Some(id),
            Child::Widget(_) => None,
        }
    }
}

pub trait PanelHost {
    /// Ids of all existing panels, ascending
    fn panel_ids(&self) -> Vec<PanelId>;

    /// Geometry of a panel, `None` if it hasn't been created
    fn panel(&self, panel_id: PanelId) -> Option<PanelGeometry>;

    /// Current children of a container, first to last
    fn children(&self, container: ContainerId) -> Vec<Child>;

    /// Detach a child; no-op if it isn't there
    fn remove_child(&mut self, container: ContainerId, child: &Child);

    /// Append a child at the end of a container
    fn add_child(&mut self, container: ContainerId, child: Child, align: Align);
}

#[derive(Debug)]
struct MemoryPanel {
    geometry: PanelGeometry,
    boxes: HashMap<Location, Vec<(Child, Align)>>,
}

/// Panel host kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryPanelHost {
    panels: BTreeMap<PanelId, MemoryPanel>,
}

impl MemoryPanelHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_panel(&mut self, geometry: PanelGeometry) {
        debug!(panel = geometry.panel_id, height = geometry.height, "Adding panel");
        self.panels.insert(
            geometry.panel_id,
            MemoryPanel { geometry, boxes: HashMap::new() },
        );
    }

    /// Drop a panel and everything in it
    pub fn remove_panel(&mut self, panel_id: PanelId) -> bool {
        self.panels.remove(&panel_id).is_some()
    }

    pub fn set_height(&mut self, panel_id: PanelId, height: u32) {
        if let Some(panel) = self.panels.get_mut(&panel_id) {
            panel.geometry.height = height;
        }
    }

    pub fn set_bottom_position(&mut self, panel_id: PanelId, bottom: bool) {
        if let Some(panel) = self.panels.get_mut(&panel_id) {
            panel.geometry.bottom_position = bottom;
        }
    }

    /// Instance ids of the applet children of a container, in order
    pub fn applet_ids(&self, container: ContainerId) -> Vec<String> {
        self.children(container)
            .into_iter()
            .filter_map(|child| child.applet_id().map(str::to_string))
            .collect()
    }

    /// Alignment a child was added with
    pub fn alignment(&self, container: ContainerId, child: &Child) -> Option<Align> {
        self.panels
            .get(&container.panel_id)?
            .boxes
            .get(&container.location)?
            .iter()
            .find(|(existing, _)| existing == child)
            .map(|(_, align)| *align)
    }
}

impl PanelHost for MemoryPanelHost {
    fn panel_ids(&self) -> Vec<PanelId> {
        self.panels.keys().copied().collect()
    }

    fn panel(&self, panel_id: PanelId) -> Option<PanelGeometry> {
        self.panels.get(&panel_id).map(|panel| panel.geometry)
    }

    fn children(&self, container: ContainerId) -> Vec<Child> {
        self.panels
            .get(&container.panel_id)
            .and_then(|panel| panel.boxes.get(&container.location))
            .map(|children| children.iter().map(|(child, _)| child.clone()).collect())
            .unwrap_or_default()
    }

    fn remove_child(&mut self, container: ContainerId, child: &Child) {
        if let Some(children) = self
            .panels
            .get_mut(&container.panel_id)
            .and_then(|panel| panel.boxes.get_mut(&container.location))
        {
            children.retain(|(existing, _)| existing != child);
        }
    }

    fn add_child(&mut self, container: ContainerId, child: Child, align: Align) {
        match self.panels.get_mut(&container.panel_id) {
            Some(panel) => panel.boxes.entry(container.location).or_default().push((child, align)),
            None => warn!(container = %container, child = ?child, "Cannot add child to missing panel"),
        }
    }
}
