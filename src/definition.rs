//! Applet declaration codec
//!
//! The persisted form of a declaration is
//! `panel<N>:<location>:<order>:<package>:<instance>`, where `order` is the
//! applet's rank inside its panel zone and `instance` is the id assigned when
//! the applet was added. Older settings lack the instance id; those records
//! are upgraded by [`upgrade_legacy_records`] before decoding.

use tracing::{debug, info, warn};

use crate::constants::record;
use crate::error::{AppletError, Result};
use crate::host::PanelHost;
use crate::types::{ContainerId, Location, Orientation, PanelGeometry, PanelId};

/// One declared applet placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppletDefinition {
    pub panel_id: PanelId,
    pub location: Location,
    pub order: i32,
    pub package_id: String,
    pub instance_id: String,
    /// Live panel this definition points at; `None` until the panel exists
    pub panel: Option<PanelGeometry>,
}

impl AppletDefinition {
    /// Decode a record without resolving it against live panels
    pub fn parse(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split(record::SEPARATOR).collect();
        if fields.len() < record::FIELD_COUNT {
            return Err(AppletError::malformed(
                raw,
                format!("expected {} fields, found {}", record::FIELD_COUNT, fields.len()),
            ));
        }

        let panel_id = parse_panel_field(fields[0])
            .ok_or_else(|| AppletError::malformed(raw, format!("bad panel field '{}'", fields[0])))?;
        let order = fields[2].trim().parse::<i32>().unwrap_or(0);

        Ok(Self {
            panel_id,
            location: Location::from_label(fields[1]),
            order,
            package_id: fields[3].to_string(),
            instance_id: fields[4].to_string(),
            panel: None,
        })
    }

    /// Decode a record and resolve its panel, zone and orientation
    pub fn decode(raw: &str, panels: &dyn PanelHost) -> Result<Self> {
        let mut definition = Self::parse(raw)?;
        definition.resolve(panels);
        Ok(definition)
    }

    /// Re-derive the live panel fields. Panels that don't exist yet leave the
    /// definition unresolved; it is kept for when the panel shows up.
    pub fn resolve(&mut self, panels: &dyn PanelHost) {
        self.panel = panels.panel(self.panel_id);
        if self.panel.is_none() {
            debug!(panel = self.panel_id, instance = %self.instance_id, "Panel not present, definition left unresolved");
        }
    }

    pub fn encode(&self) -> String {
        encode_record(
            self.panel_id,
            self.location,
            self.order,
            &self.package_id,
            &self.instance_id,
        )
    }

    /// Target container, if the panel is live
    pub fn container(&self) -> Option<ContainerId> {
        self.panel.map(|_| ContainerId::new(self.panel_id, self.location))
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.panel.map(|panel| panel.orientation())
    }

    pub fn panel_height(&self) -> Option<u32> {
        self.panel.map(|panel| panel.height)
    }

    /// Equality on the fields that decide where the instance sits:
    /// panel, orientation, container and order. Panel height is not part of it.
    pub fn same_placement(&self, other: &AppletDefinition) -> bool {
        self.panel_id == other.panel_id
            && self.location == other.location
            && self.order == other.order
            && self.container() == other.container()
            && self.orientation() == other.orientation()
    }
}

pub fn encode_record(
    panel_id: PanelId,
    location: Location,
    order: i32,
    package_id: &str,
    instance_id: &str,
) -> String {
    format!(
        "{}{}:{}:{}:{}:{}",
        record::PANEL_PREFIX,
        panel_id,
        location.label(),
        order,
        package_id,
        instance_id
    )
}

/// Panel index from a `panel<N>` field: the fixed-width prefix is stripped
/// and the remainder parsed
fn parse_panel_field(field: &str) -> Option<PanelId> {
    field.get(record::PANEL_PREFIX.len()..)?.parse().ok()
}

/// Does this raw record live on `panel_id`? Records with an unreadable panel
/// field never match.
pub fn record_on_panel(raw: &str, panel_id: PanelId) -> bool {
    raw.split(record::SEPARATOR)
        .next()
        .and_then(parse_panel_field)
        .is_some_and(|id| id == panel_id)
}

/// Give every 4-field record an instance id taken from `next_id`.
///
/// Returns true if anything was rewritten; the caller must then persist the
/// list together with the advanced counter.
pub fn upgrade_legacy_records(records: &mut [String], next_id: &mut i64) -> bool {
    let mut upgraded = false;
    for raw in records.iter_mut() {
        if raw.split(record::SEPARATOR).count() == record::LEGACY_FIELD_COUNT {
            let Some(following) = next_id.checked_add(1) else {
                warn!(record = %raw, "Instance id counter exhausted, leaving legacy record");
                continue;
            };
            raw.push(record::SEPARATOR);
            raw.push_str(&next_id.to_string());
            info!(record = %raw, "Upgraded legacy applet definition");
            *next_id = following;
            upgraded = true;
        }
    }
    upgraded
}
