//! Published view of the catalogue.
//!
//! [`CatalogSnapshot`] is an **owned**, read-only copy of the registry at the
//! end of a pass. It is what [`Publisher`](crate::publish::Publisher) hands to
//! listeners, and is cheap enough to clone for fan-out.
//!
//! # Semantics
//! - Entries are in registry order (first observation).
//! - A snapshot is **immutable**. Activity flags set after it was taken are
//!   not reflected; take a new one.
//! - Entries share preparsed descriptors with the registry, so on-demand
//!   usage lookups stay valid for as long as the snapshot is alive.
//!
//! # Example
//! ```no_run
//! use padcat::CatalogSnapshot;
//!
//! fn print_devices(snap: &CatalogSnapshot) {
//!     for e in snap.iter() {
//!         println!("{} [{}] axes={} buttons={}", e.display_name, e.id, e.caps.axes, e.caps.buttons);
//!     }
//! }
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::registry::{DeviceRegistry, RegistryKey, UnifiedDeviceEntry};
use crate::sources::SourceKind;

/// Owned snapshot of the unified catalogue.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CatalogSnapshot {
    /// Pass counter of the catalogue that produced this snapshot.
    pub generation: u64,
    pub entries: Vec<UnifiedDeviceEntry>,
}

impl CatalogSnapshot {
    pub fn of(registry: &DeviceRegistry, generation: u64) -> Self {
        Self {
            generation,
            entries: registry.iter().cloned().collect(),
        }
    }

    /// Entry for a specific key.
    pub fn get(&self, key: &RegistryKey) -> Option<&UnifiedDeviceEntry> {
        self.entries
            .iter()
            .find(|e| e.source == key.source && e.id.to_string() == key.id)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &UnifiedDeviceEntry> {
        self.entries.iter()
    }

    /// Entries from one source.
    pub fn from_source(&self, source: SourceKind) -> impl Iterator<Item = &UnifiedDeviceEntry> {
        self.entries.iter().filter(move |e| e.source == source)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty-printed JSON, for diagnostics and UI bridges.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Consume the snapshot and return the entries.
    #[inline]
    pub fn into_inner(self) -> Vec<UnifiedDeviceEntry> {
        self.entries
    }
}
