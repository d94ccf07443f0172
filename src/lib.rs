//! Applet lifecycle management for a desktop panel shell
//!
//! Applet declarations are persisted as `panel<N>:<location>:<order>:<package>:<instance>`
//! records. The [`manager::AppletManager`] turns changes to that list into
//! the minimal set of instance removals, package unloads, placements and
//! package loads, and keeps the panel containers ordered.

#![forbid(unsafe_code)]

pub mod clipboard;
pub mod config;
pub mod constants;
pub mod definition;
pub mod definition_set;
pub mod error;
pub mod host;
pub mod manager;
pub mod notify;
pub mod packages;
pub mod placement;
pub mod reconcile;
pub mod registry;
pub mod roles;
pub mod types;

#[cfg(test)]
mod testing;

pub use definition::AppletDefinition;
pub use definition_set::DefinitionSet;
pub use error::AppletError;
pub use manager::{AppletManager, PlaceOutcome, ReconcileReport, ShellContext};
