//! Value types shared by the codec, placement engine and panel host

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a panel in the panel registry
pub type PanelId = u32;

/// Zone of a panel an applet is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Left,
    Center,
    Right,
}

impl Location {
    /// Zones in the order they are laid out (and saved)
    pub const ALL: [Location; 3] = [Location::Left, Location::Center, Location::Right];

    pub fn label(&self) -> &'static str {
        match self {
            Location::Left => "left",
            Location::Center => "center",
            Location::Right => "right",
        }
    }

    /// Parse a location label; anything unknown lands on the left
    pub fn from_label(label: &str) -> Self {
        match label {
            "center" => Location::Center,
            "right" => Location::Right,
            _ => Location::Left,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Screen edge the applet's panel sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Top,
    Bottom,
}

impl Orientation {
    pub fn from_bottom_position(bottom: bool) -> Self {
        if bottom { Orientation::Bottom } else { Orientation::Top }
    }
}

/// One zone box of one panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId {
    pub panel_id: PanelId,
    pub location: Location,
}

impl ContainerId {
    pub fn new(panel_id: PanelId, location: Location) -> Self {
        Self { panel_id, location }
    }

    /// Center boxes keep their applets centered; the others pack from the start
    pub fn align(&self) -> Align {
        match self.location {
            Location::Center => Align::CenterSpecial,
            _ => Align::Start,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel{}:{}", self.panel_id, self.location)
    }
}

/// Alignment requested when appending a child to a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Start,
    CenterSpecial,
}

/// Live panel properties the manager derives placements from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    pub panel_id: PanelId,
    pub bottom_position: bool,
    pub height: u32,
}

impl PanelGeometry {
    pub fn new(panel_id: PanelId, bottom_position: bool, height: u32) -> Self {
        Self { panel_id, bottom_position, height }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_bottom_position(self.bottom_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_labels() {
        for location in Location::ALL {
            assert_eq!(Location::from_label(location.label()), location);
        }
        assert_eq!(Location::from_label("middle"), Location::Left);
        assert_eq!(Location::from_label(""), Location::Left);
    }

    #[test]
    fn test_orientation_from_panel() {
        assert_eq!(PanelGeometry::new(0, true, 40).orientation(), Orientation::Bottom);
        assert_eq!(PanelGeometry::new(1, false, 25).orientation(), Orientation::Top);
    }

    #[test]
    fn test_container_alignment() {
        assert_eq!(ContainerId::new(0, Location::Center).align(), Align::CenterSpecial);
        assert_eq!(ContainerId::new(0, Location::Right).align(), Align::Start);
        assert_eq!(ContainerId::new(3, Location::Right).to_string(), "panel3:right");
    }
}
