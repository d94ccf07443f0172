use thiserror::Error;

use crate::roles::Role;

/// Failures isolated to a single declaration or applet instance.
///
/// None of these abort a reconciliation pass; the caller logs them and
/// moves on to the next definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppletError {
    #[error("Bad applet definition '{record}': {reason}")]
    MalformedDeclaration { record: String, reason: String },

    #[error("Failed to load applet {package_id}/{instance_id}: {reason}")]
    PackageLoadFailure {
        package_id: String,
        instance_id: String,
        reason: String,
    },

    #[error("Role '{role}' is already provided by {holder}, refusing {package_id}")]
    RoleConflict {
        role: Role,
        holder: String,
        package_id: String,
    },

    #[error("Error during removal hook of applet {package_id}/{instance_id}: {reason}")]
    RemovalHookFailure {
        package_id: String,
        instance_id: String,
        reason: String,
    },

    #[error("No live applet with instance id {0}")]
    UnknownInstance(String),
}

impl AppletError {
    pub fn malformed(record: &str, reason: impl Into<String>) -> Self {
        AppletError::MalformedDeclaration {
            record: record.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppletError>;
