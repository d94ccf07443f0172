//! Application-wide constants
//!
//! Settings keys, record format details and file locations live here so the
//! codec, clipboard and manager agree on a single source of truth.

/// Keys in the persisted settings store
pub mod settings {
    /// Ordered list of applet declarations
    pub const ENABLED_APPLETS: &str = "enabled-applets";

    /// Next unused instance id (monotonic counter)
    pub const NEXT_APPLET_ID: &str = "next-applet-id";
}

/// Declaration record format (`panel<N>:<location>:<order>:<package>:<instance>`)
pub mod record {
    /// Field separator
    pub const SEPARATOR: char = ':';

    /// Prefix of the panel field, stripped before parsing the panel index
    pub const PANEL_PREFIX: &str = "panel";

    /// Number of fields in a current-format record
    pub const FIELD_COUNT: usize = 5;

    /// Number of fields in a legacy record (no instance id)
    pub const LEGACY_FIELD_COUNT: usize = 4;
}

/// Package manifest defaults
pub mod manifest {
    /// Max instance count meaning "no limit"
    pub const UNLIMITED_INSTANCES: i32 = -1;

    /// Max instance count for packages that don't declare one
    pub const DEFAULT_MAX_INSTANCES: i32 = 1;
}

/// Config and per-instance file locations
pub mod config {
    /// Directory under the XDG config dir
    pub const APP_DIR: &str = "applet-manager";

    /// Manager config filename
    pub const FILENAME: &str = "config.json";

    /// Settings store filename
    pub const SETTINGS_FILENAME: &str = "settings.json";

    /// Directory holding per-instance applet configs
    pub const INSTANCE_CONFIG_DIR: &str = "configs";

    /// Extension of per-instance config files
    pub const INSTANCE_CONFIG_EXT: &str = "json";
}

/// User-facing messages
pub mod messages {
    /// Shown once after a paste that skipped entries over their instance limit
    pub const PASTE_SKIPPED: &str =
        "Certain applets do not allow multiple instances and were not copied";
}
