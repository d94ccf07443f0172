//! Per-instance applet config files (`<root>/<package>/<instance>.json`)

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::config::INSTANCE_CONFIG_EXT;

pub fn instance_config_path(root: &Path, package_id: &str, instance_id: &str) -> PathBuf {
    root.join(package_id)
        .join(format!("{}.{}", instance_id, INSTANCE_CONFIG_EXT))
}

/// Delete an instance's config file. Returns false if there was none.
pub fn remove_instance_config(root: &Path, package_id: &str, instance_id: &str) -> Result<bool> {
    let path = instance_config_path(root, package_id, instance_id);
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path).with_context(|| {
        format!(
            "Problem removing applet config file during cleanup. Package is {} and filename is {:?}",
            package_id, path
        )
    })?;
    debug!(path = %path.display(), "Removed applet config file");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let path = instance_config_path(Path::new("/cfg"), "clock@shell", "14");
        assert_eq!(path, PathBuf::from("/cfg/clock@shell/14.json"));
    }

    #[test]
    fn test_remove_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = instance_config_path(dir.path(), "clock@shell", "14");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();

        assert!(remove_instance_config(dir.path(), "clock@shell", "14").unwrap());
        assert!(!path.exists());
        assert!(!remove_instance_config(dir.path(), "clock@shell", "14").unwrap());
    }
}
