//! Ordered insertion of applet actors into zone containers
//!
//! Containers only support append. To land an applet at its ordinal slot,
//! the applet siblings ranked after it are detached, the applet is appended,
//! and the detached siblings are appended again in their original relative
//! order. Only the k siblings after the insertion point move.

use tracing::debug;

use crate::host::{Child, PanelHost};
use crate::registry::InstanceRegistry;
use crate::types::ContainerId;

/// Move a live applet into `container` at rank `order`.
///
/// Afterwards the applet children of `container` are ascending by order;
/// applets with an equal order keep their place before the new one.
/// Returns false if the instance isn't live.
pub fn place_applet(
    panels: &mut dyn PanelHost,
    registry: &mut InstanceRegistry,
    instance_id: &str,
    container: ContainerId,
    order: i32,
) -> bool {
    let Some(applet) = registry.get_mut(instance_id) else {
        return false;
    };
    let actor = Child::Applet(instance_id.to_string());

    // Always detach from the old spot, even within the same container
    if let Some(previous) = applet.container.take() {
        panels.remove_child(previous, &actor);
    }

    let displaced: Vec<Child> = panels
        .children(container)
        .into_iter()
        .filter(|child| match child.applet_id() {
            Some(id) if id != instance_id => registry.order_of(id).is_some_and(|rank| rank > order),
            _ => false,
        })
        .collect();

    for child in &displaced {
        panels.remove_child(container, child);
    }

    let align = container.align();
    panels.add_child(container, actor, align);
    for child in displaced.iter().cloned() {
        panels.add_child(container, child, align);
    }

    if let Some(applet) = registry.get_mut(instance_id) {
        applet.container = Some(container);
        applet.panel_id = container.panel_id;
        applet.order = order;
    }

    debug!(
        instance = %instance_id,
        container = %container,
        order,
        moved = displaced.len(),
        "Placed applet"
    );
    true
}

/// Take a live applet out of its container
pub fn detach_applet(panels: &mut dyn PanelHost, registry: &mut InstanceRegistry, instance_id: &str) {
    if let Some(applet) = registry.get_mut(instance_id) {
        if let Some(container) = applet.container.take() {
            panels.remove_child(container, &Child::Applet(instance_id.to_string()));
        }
    }
}
