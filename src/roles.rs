//! Singleton roles an applet package can claim
//!
//! A role is a capability like "notifications provider" that the shell looks
//! up by name instead of hardcoding a package. At most one package provides
//! a role at a time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::error::{AppletError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Notifications,
    WindowList,
    PanelLauncher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Notifications => "notifications",
            Role::WindowList => "windowlist",
            Role::PanelLauncher => "panellauncher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLock {
    /// The role was free and now belongs to the caller
    Acquired,
    /// The caller already held the role (another instance of the same package)
    AlreadyHeld,
}

pub trait RoleRegistry {
    /// Claim `role` for `package_id`. Fails fast if another package holds it.
    fn lock(&mut self, role: Role, package_id: &str) -> Result<RoleLock>;

    /// Release `role` if `package_id` currently holds it
    fn unlock(&mut self, role: Role, package_id: &str);

    fn provider(&self, role: Role) -> Option<String>;
}

/// In-process role table
#[derive(Debug, Default)]
pub struct RoleTable {
    providers: HashMap<Role, String>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleRegistry for RoleTable {
    fn lock(&mut self, role: Role, package_id: &str) -> Result<RoleLock> {
        match self.providers.get(&role) {
            Some(holder) if holder == package_id => Ok(RoleLock::AlreadyHeld),
            Some(holder) => Err(AppletError::RoleConflict {
                role,
                holder: holder.clone(),
                package_id: package_id.to_string(),
            }),
            None => {
                info!(role = %role, package = %package_id, "Role provider set");
                self.providers.insert(role, package_id.to_string());
                Ok(RoleLock::Acquired)
            }
        }
    }

    fn unlock(&mut self, role: Role, package_id: &str) {
        if self.providers.get(&role).is_some_and(|holder| holder == package_id) {
            debug!(role = %role, package = %package_id, "Role released");
            self.providers.remove(&role);
        }
    }

    fn provider(&self, role: Role) -> Option<String> {
        self.providers.get(&role).cloned()
    }
}
