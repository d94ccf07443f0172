//! Live applet instances
//!
//! The [`InstanceRegistry`] is the single owner of every running applet,
//! keyed by instance id. Exactly one [`LiveApplet`] exists per instance id.

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;

use crate::types::{ContainerId, Orientation, PanelId};

/// Hooks a running applet exposes to the manager
pub trait Applet {
    /// Called after every successful placement
    fn on_added_to_panel(&mut self, _startup_complete: bool) {}

    /// Teardown before the instance is detached and dropped
    fn on_removed_from_panel(&mut self) -> Result<()> {
        Ok(())
    }

    /// The set of instances of this applet's package changed
    fn on_instances_changed(&mut self) {}

    fn set_panel_height(&mut self, _height: u32) {}

    fn set_orientation(&mut self, _orientation: Orientation) {}
}

/// An applet that ignores every hook
#[derive(Debug, Default)]
pub struct InertApplet;

impl Applet for InertApplet {}

pub struct LiveApplet {
    pub instance_id: String,
    pub package_id: String,
    pub panel_id: PanelId,
    /// Container the applet actor currently sits in
    pub container: Option<ContainerId>,
    pub order: i32,
    /// Drag-and-drop destination not yet written back to settings
    pub pending_container: Option<ContainerId>,
    pub pending_order: Option<i32>,
    pub panel_height: u32,
    pub orientation: Orientation,
    applet: Box<dyn Applet>,
}

impl fmt::Debug for LiveApplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveApplet")
            .field("instance_id", &self.instance_id)
            .field("package_id", &self.package_id)
            .field("panel_id", &self.panel_id)
            .field("container", &self.container)
            .field("order", &self.order)
            .field("pending_container", &self.pending_container)
            .field("pending_order", &self.pending_order)
            .finish_non_exhaustive()
    }
}

impl LiveApplet {
    pub fn new(
        instance_id: &str,
        package_id: &str,
        panel_id: PanelId,
        panel_height: u32,
        orientation: Orientation,
        applet: Box<dyn Applet>,
    ) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            package_id: package_id.to_string(),
            panel_id,
            container: None,
            order: 0,
            pending_container: None,
            pending_order: None,
            panel_height,
            orientation,
            applet,
        }
    }

    pub fn applet_mut(&mut self) -> &mut dyn Applet {
        self.applet.as_mut()
    }

    /// Push new panel geometry into the applet if it differs
    pub fn update_geometry(&mut self, height: u32, orientation: Orientation, force: bool) {
        self.update_panel_height(height, force);
        if force || self.orientation != orientation {
            self.orientation = orientation;
            self.applet.set_orientation(orientation);
        }
    }

    pub fn update_panel_height(&mut self, height: u32, force: bool) {
        if force || self.panel_height != height {
            self.panel_height = height;
            self.applet.set_panel_height(height);
        }
    }

    /// Container the applet will be saved into: the pending move if any
    pub fn effective_container(&self) -> Option<ContainerId> {
        self.pending_container.or(self.container)
    }

    pub fn effective_order(&self) -> i32 {
        self.pending_order.unwrap_or(self.order)
    }

    pub fn clear_pending(&mut self) {
        self.pending_container = None;
        self.pending_order = None;
    }
}

#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: HashMap<String, LiveApplet>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instance_id: &str) -> Option<&LiveApplet> {
        self.instances.get(instance_id)
    }

    pub fn get_mut(&mut self, instance_id: &str) -> Option<&mut LiveApplet> {
        self.instances.get_mut(instance_id)
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.instances.contains_key(instance_id)
    }

    pub fn insert(&mut self, applet: LiveApplet) {
        self.instances.insert(applet.instance_id.clone(), applet);
    }

    pub fn remove(&mut self, instance_id: &str) -> Option<LiveApplet> {
        self.instances.remove(instance_id)
    }

    /// Order of a live applet, used when ranking container siblings
    pub fn order_of(&self, instance_id: &str) -> Option<i32> {
        self.instances.get(instance_id).map(|applet| applet.order)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveApplet> {
        self.instances.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LiveApplet> {
        self.instances.values_mut()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
