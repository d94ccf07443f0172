//! Persisted key-value settings holding the declaration list
//!
//! Every write is a whole-value replace. A batch passed to
//! [`SettingsStore::apply`] lands together, which is how the legacy upgrade
//! and paste persist the declaration list and the id counter as one step.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsWrite {
    StringList { key: String, value: Vec<String> },
    Int { key: String, value: i64 },
}

impl SettingsWrite {
    pub fn string_list(key: &str, value: Vec<String>) -> Self {
        SettingsWrite::StringList { key: key.to_string(), value }
    }

    pub fn int(key: &str, value: i64) -> Self {
        SettingsWrite::Int { key: key.to_string(), value }
    }

    fn key(&self) -> &str {
        match self {
            SettingsWrite::StringList { key, .. } | SettingsWrite::Int { key, .. } => key,
        }
    }

    fn into_value(self) -> Value {
        match self {
            SettingsWrite::StringList { value, .. } => {
                Value::Array(value.into_iter().map(Value::String).collect())
            }
            SettingsWrite::Int { value, .. } => Value::from(value),
        }
    }
}

pub trait SettingsStore {
    /// String list under `key`; empty if unset or of another type
    fn string_list(&self, key: &str) -> Vec<String>;

    /// Integer under `key`; zero if unset
    fn int(&self, key: &str) -> i64;

    /// Apply all writes as one atomic update
    fn apply(&mut self, writes: Vec<SettingsWrite>) -> Result<()>;

    /// Consume the change notification for `key`
    fn take_changed(&mut self, key: &str) -> bool;

    fn set_string_list(&mut self, key: &str, value: Vec<String>) -> Result<()> {
        self.apply(vec![SettingsWrite::string_list(key, value)])
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.apply(vec![SettingsWrite::int(key, value)])
    }
}

/// Values plus the set of keys changed since last polled
#[derive(Debug, Default, Clone)]
struct SettingsValues {
    values: BTreeMap<String, Value>,
    changed: HashSet<String>,
}

impl SettingsValues {
    fn string_list(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn int(&self, key: &str) -> i64 {
        self.values.get(key).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Apply writes in memory; returns the updated map without committing it
    fn staged(&self, writes: Vec<SettingsWrite>) -> (BTreeMap<String, Value>, Vec<String>) {
        let mut values = self.values.clone();
        let mut touched = Vec::new();
        for write in writes {
            let key = write.key().to_string();
            let value = write.into_value();
            if values.get(&key) != Some(&value) {
                values.insert(key.clone(), value);
                touched.push(key);
            }
        }
        (values, touched)
    }

    fn commit(&mut self, values: BTreeMap<String, Value>, touched: Vec<String>) {
        self.values = values;
        self.changed.extend(touched);
    }

    fn take_changed(&mut self, key: &str) -> bool {
        self.changed.remove(key)
    }
}

/// Settings kept in memory only
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    inner: SettingsValues,
    batches: usize,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_declarations(declarations: &[&str], next_id: i64) -> Self {
        let mut settings = Self::new();
        settings.inner.values.insert(
            crate::constants::settings::ENABLED_APPLETS.to_string(),
            Value::Array(declarations.iter().map(|d| Value::String(d.to_string())).collect()),
        );
        settings.inner.values.insert(
            crate::constants::settings::NEXT_APPLET_ID.to_string(),
            Value::from(next_id),
        );
        settings
    }

    /// Number of batches that changed something
    pub fn batches(&self) -> usize {
        self.batches
    }
}

impl SettingsStore for MemorySettings {
    fn string_list(&self, key: &str) -> Vec<String> {
        self.inner.string_list(key)
    }

    fn int(&self, key: &str) -> i64 {
        self.inner.int(key)
    }

    fn apply(&mut self, writes: Vec<SettingsWrite>) -> Result<()> {
        let (values, touched) = self.inner.staged(writes);
        if !touched.is_empty() {
            self.batches += 1;
        }
        self.inner.commit(values, touched);
        Ok(())
    }

    fn take_changed(&mut self, key: &str) -> bool {
        self.inner.take_changed(key)
    }
}

/// Settings persisted to a flat JSON object on disk
#[derive(Debug)]
pub struct JsonSettings {
    path: PathBuf,
    inner: SettingsValues,
}

impl JsonSettings {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::SETTINGS_FILENAME);
        path
    }

    /// Open the settings file, starting empty if it doesn't exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut inner = SettingsValues::default();

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            inner.values = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings JSON from {:?}", path))?;
            info!(path = %path.display(), keys = inner.values.len(), "Loaded settings");
        } else {
            warn!(path = %path.display(), "Settings file not found, starting empty");
        }

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(values)
            .context("Failed to serialize settings to JSON")?;

        // Write next to the target then rename so readers never see half a batch
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write settings to {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to move settings into place at {:?}", self.path))?;

        debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}

impl SettingsStore for JsonSettings {
    fn string_list(&self, key: &str) -> Vec<String> {
        self.inner.string_list(key)
    }

    fn int(&self, key: &str) -> i64 {
        self.inner.int(key)
    }

    fn apply(&mut self, writes: Vec<SettingsWrite>) -> Result<()> {
        let (values, touched) = self.inner.staged(writes);
        if touched.is_empty() {
            return Ok(());
        }
        // Disk first: a failed write leaves memory untouched as well
        self.write_file(&values)?;
        self.inner.commit(values, touched);
        Ok(())
    }

    fn take_changed(&mut self, key: &str) -> bool {
        self.inner.take_changed(key)
    }
}
