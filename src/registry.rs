//! Unified device registry.
//!
//! [`DeviceRegistry`] merges the per-source batches of one pass into a single
//! ordered collection keyed by `(source, canonical id)`. It owns existence and
//! descriptive fields only; the four [`ActivityFlags`] belong to whoever reads
//! live input, and are the only state that survives re-enumeration.
//!
//! # Merge
//! 1. Key every incoming record (a later record with the same key wins).
//! 2. Remove entries whose key is absent from the pass.
//! 3. Overwrite present entries in place, keeping their activity flags.
//! 4. Insert new entries with all flags clear.
//! 5. Re-apply cosmetic name decoration.
//!
//! Entries keep the order in which they were first observed.
//!
//! # Example
//! ```
//! use padcat::device::DeviceRecord;
//! use padcat::identity::CanonicalId;
//! use padcat::registry::{DeviceRegistry, RegistryKey};
//! use padcat::sources::SourceKind;
//!
//! let id = CanonicalId { vendor: 0x046D, product: 0xC08B, ..Default::default() };
//! let rec = DeviceRecord::new(SourceKind::RawInput, "0x00010043", id);
//!
//! let mut reg = DeviceRegistry::new();
//! reg.merge(vec![vec![rec.clone()]]);
//! let key = RegistryKey::new(SourceKind::RawInput, "VID_046D&PID_C08B");
//! reg.set_button_active(&key, true);
//!
//! let report = reg.merge(vec![vec![rec]]);
//! assert!(report.added.is_empty() && report.removed.is_empty());
//! assert!(reg.get(&key).unwrap().activity.button);
//! ```

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;

use crate::capability::CapabilityRecord;
use crate::device::{DescriptorHandle, DeviceClass, DeviceRecord};
use crate::identity::CanonicalId;
use crate::sources::SourceKind;

/// `(source, canonical id string)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegistryKey {
    pub source: SourceKind,
    pub id: String,
}

impl RegistryKey {
    pub fn new(source: SourceKind, id: impl Into<String>) -> Self {
        Self {
            source,
            id: id.into(),
        }
    }

    pub fn of(rec: &DeviceRecord) -> Self {
        Self::new(rec.source, rec.key())
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.id)
    }
}

/// "Currently active" flags, set by live-input readers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActivityFlags {
    pub axis: bool,
    pub slider: bool,
    pub button: bool,
    pub pov: bool,
}

/// One row of the unified catalogue.
#[derive(Clone, Debug, Serialize)]
pub struct UnifiedDeviceEntry {
    pub source: SourceKind,
    pub id: CanonicalId,
    pub handle: String,
    /// Name as reported by the source.
    pub name: String,
    /// `name`, possibly prefixed with a matching name from the donor source.
    pub display_name: String,
    pub vendor: u32,
    pub product: u32,
    pub interface_path: Option<String>,
    pub class: DeviceClass,
    pub caps: CapabilityRecord,
    pub online: bool,
    pub activity: ActivityFlags,
    #[serde(skip)]
    descriptor: Option<DescriptorHandle>,
}

impl UnifiedDeviceEntry {
    fn from_record(rec: DeviceRecord) -> Self {
        Self {
            source: rec.source,
            display_name: rec.name.clone(),
            id: rec.id,
            handle: rec.handle,
            name: rec.name,
            vendor: rec.vendor,
            product: rec.product,
            interface_path: rec.interface_path,
            class: rec.class,
            caps: rec.caps,
            online: rec.online,
            activity: ActivityFlags::default(),
            descriptor: rec.descriptor,
        }
    }

    /// Replace every descriptive field; activity flags are untouched.
    fn overwrite(&mut self, rec: DeviceRecord) {
        let activity = self.activity;
        *self = Self::from_record(rec);
        self.activity = activity;
    }

    pub fn key(&self) -> RegistryKey {
        RegistryKey::new(self.source, self.id.to_string())
    }

    /// On-demand lookup against the retained preparsed descriptor.
    ///
    /// `false` if the source exposed no descriptor.
    pub fn has_input_usage(&self, usage_page: u16, usage: u16) -> bool {
        self.descriptor
            .as_ref()
            .is_some_and(|d| d.has_input_usage(usage_page, usage))
    }

    pub fn descriptor(&self) -> Option<&DescriptorHandle> {
        self.descriptor.as_ref()
    }
}

/// Keys touched by one merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub added: Vec<RegistryKey>,
    pub updated: Vec<RegistryKey>,
    pub removed: Vec<RegistryKey>,
}

impl MergeReport {
    /// No entry appeared or disappeared.
    pub fn is_stable(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Cosmetic name decoration: entries from `recipients` borrow the name of a
/// `donor` entry whose id shares the first `key_len` characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameDecoration {
    pub key_len: usize,
    pub donor: SourceKind,
    pub recipients: Vec<SourceKind>,
}

impl Default for NameDecoration {
    fn default() -> Self {
        Self {
            // len("VID_xxxx&PID_xxxx")
            key_len: 17,
            donor: SourceKind::DirectInput,
            recipients: vec![SourceKind::RawInput, SourceKind::Hid],
        }
    }
}

impl NameDecoration {
    fn prefix<'a>(&self, id: &'a str) -> &'a str {
        id.get(..self.key_len).unwrap_or(id)
    }
}

/// Ordered `(source, id)` → entry collection.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    entries: IndexMap<RegistryKey, UnifiedDeviceEntry>,
    naming: NameDecoration,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_naming(naming: NameDecoration) -> Self {
        Self {
            entries: IndexMap::new(),
            naming,
        }
    }

    /// Merge one pass worth of batches.
    pub fn merge<I>(&mut self, batches: I) -> MergeReport
    where
        I: IntoIterator<Item = Vec<DeviceRecord>>,
    {
        let mut incoming: IndexMap<RegistryKey, DeviceRecord> = IndexMap::new();
        for rec in batches.into_iter().flatten() {
            incoming.insert(RegistryKey::of(&rec), rec);
        }

        let mut report = MergeReport::default();

        let absent: Vec<RegistryKey> = self
            .entries
            .keys()
            .filter(|k| !incoming.contains_key(*k))
            .cloned()
            .collect();
        for key in absent {
            self.entries.shift_remove(&key);
            debug!("[REGISTRY] removed {key}");
            report.removed.push(key);
        }

        for (key, rec) in incoming {
            match self.entries.get_mut(&key) {
                Some(entry) => {
                    entry.overwrite(rec);
                    report.updated.push(key);
                }
                None => {
                    debug!("[REGISTRY] added {key}");
                    self.entries
                        .insert(key.clone(), UnifiedDeviceEntry::from_record(rec));
                    report.added.push(key);
                }
            }
        }

        self.decorate_names();

        info!(
            "[REGISTRY] merge: {} added, {} updated, {} removed ({} entries)",
            report.added.len(),
            report.updated.len(),
            report.removed.len(),
            self.entries.len()
        );
        report
    }

    fn decorate_names(&mut self) {
        let naming = &self.naming;
        let mut donors: HashMap<String, String> = HashMap::new();
        for e in self.entries.values() {
            if e.source == naming.donor && e.vendor != 0 && e.product != 0 && !e.name.is_empty() {
                let id = e.id.to_string();
                donors
                    .entry(naming.prefix(&id).to_owned())
                    .or_insert_with(|| e.name.clone());
            }
        }

        for e in self.entries.values_mut() {
            e.display_name = e.name.clone();
            if !naming.recipients.contains(&e.source) {
                continue;
            }
            let id = e.id.to_string();
            if let Some(donor) = donors.get(naming.prefix(&id)) {
                if e.name.is_empty() {
                    e.display_name = donor.clone();
                } else if !e.name.starts_with(donor.as_str()) {
                    e.display_name = format!("{donor} - {}", e.name);
                }
            }
        }
    }

    pub fn get(&self, key: &RegistryKey) -> Option<&UnifiedDeviceEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnifiedDeviceEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RegistryKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Activity flags of one entry, for live-input readers.
    pub fn activity_mut(&mut self, key: &RegistryKey) -> Option<&mut ActivityFlags> {
        self.entries.get_mut(key).map(|e| &mut e.activity)
    }

    /// Returns `false` if the key is not present.
    pub fn set_axis_active(&mut self, key: &RegistryKey, active: bool) -> bool {
        self.activity_mut(key).map(|a| a.axis = active).is_some()
    }

    pub fn set_slider_active(&mut self, key: &RegistryKey, active: bool) -> bool {
        self.activity_mut(key).map(|a| a.slider = active).is_some()
    }

    pub fn set_button_active(&mut self, key: &RegistryKey, active: bool) -> bool {
        self.activity_mut(key).map(|a| a.button = active).is_some()
    }

    pub fn set_pov_active(&mut self, key: &RegistryKey, active: bool) -> bool {
        self.activity_mut(key).map(|a| a.pov = active).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(vendor: u32, product: u32) -> CanonicalId {
        CanonicalId {
            vendor,
            product,
            ..Default::default()
        }
    }

    fn rec(source: SourceKind, vendor: u32, product: u32, buttons: u32) -> DeviceRecord {
        DeviceRecord::new(source, format!("{source}:{product:04x}"), id(vendor, product)).with_caps(
            CapabilityRecord {
                buttons,
                ..Default::default()
            },
        )
    }

    #[test]
    fn button_flag_survives_updated_counts() {
        let mut reg = DeviceRegistry::new();
        reg.merge(vec![vec![rec(SourceKind::RawInput, 0x046D, 0xC08B, 6)]]);
        let key = RegistryKey::new(SourceKind::RawInput, "VID_046D&PID_C08B");
        assert!(reg.set_button_active(&key, true));

        let report = reg.merge(vec![vec![rec(SourceKind::RawInput, 0x046D, 0xC08B, 11)]]);
        assert!(report.is_stable());
        assert_eq!(report.updated, vec![key.clone()]);

        let entry = reg.get(&key).unwrap();
        assert!(entry.activity.button);
        assert_eq!(entry.caps.buttons, 11);
    }

    #[test]
    fn unchanged_batch_is_stable() {
        let batch = vec![
            rec(SourceKind::Hid, 0x044F, 0xB10A, 16),
            rec(SourceKind::Hid, 0x044F, 0xB687, 14),
        ];
        let mut reg = DeviceRegistry::new();
        let first = reg.merge(vec![batch.clone()]);
        assert_eq!(first.added.len(), 2);

        let key = RegistryKey::new(SourceKind::Hid, "VID_044F&PID_B687");
        reg.set_axis_active(&key, true);
        reg.set_pov_active(&key, true);
        let before: Vec<ActivityFlags> = reg.iter().map(|e| e.activity).collect();

        let again = reg.merge(vec![batch]);
        assert!(again.is_stable());
        let after: Vec<ActivityFlags> = reg.iter().map(|e| e.activity).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn absent_keys_are_removed_and_order_kept() {
        let mut reg = DeviceRegistry::new();
        reg.merge(vec![vec![
            rec(SourceKind::Hid, 1, 1, 0),
            rec(SourceKind::Hid, 1, 2, 0),
            rec(SourceKind::Hid, 1, 3, 0),
        ]]);
        let report = reg.merge(vec![vec![
            rec(SourceKind::Hid, 1, 3, 0),
            rec(SourceKind::Hid, 1, 1, 0),
            rec(SourceKind::Hid, 1, 4, 0),
        ]]);
        assert_eq!(
            report.removed,
            vec![RegistryKey::new(SourceKind::Hid, "VID_0001&PID_0002")]
        );
        let order: Vec<String> = reg.keys().map(|k| k.id.clone()).collect();
        assert_eq!(
            order,
            ["VID_0001&PID_0001", "VID_0001&PID_0003", "VID_0001&PID_0004"]
        );
    }

    #[test]
    fn new_entries_start_inactive() {
        let mut reg = DeviceRegistry::new();
        reg.merge(vec![vec![rec(SourceKind::XInput, 0x045E, 0x028E, 10)]]);
        assert!(reg.iter().all(|e| e.activity == ActivityFlags::default()));
        assert!(!reg.set_slider_active(&RegistryKey::new(SourceKind::XInput, "nope"), true));
    }

    #[test]
    fn same_id_from_two_sources_is_two_entries() {
        let mut reg = DeviceRegistry::new();
        reg.merge(vec![
            vec![rec(SourceKind::RawInput, 0x045E, 0x028E, 10)],
            vec![rec(SourceKind::Hid, 0x045E, 0x028E, 10)],
        ]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn later_duplicate_in_a_pass_wins() {
        let mut reg = DeviceRegistry::new();
        reg.merge(vec![vec![
            rec(SourceKind::Hid, 2, 2, 4),
            rec(SourceKind::Hid, 2, 2, 8),
        ]]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.iter().next().unwrap().caps.buttons, 8);
    }

    #[test]
    fn recipients_borrow_donor_names() {
        let donor = rec(SourceKind::DirectInput, 0x046D, 0xC21D, 10).with_name("Logitech F310");
        let raw = rec(SourceKind::RawInput, 0x046D, 0xC21D, 10);
        let hid = DeviceRecord::new(
            SourceKind::Hid,
            "p",
            CanonicalId {
                collection: Some("01".into()),
                ..id(0x046D, 0xC21D)
            },
        )
        .with_name("USB Gamepad");
        let xinput = rec(SourceKind::XInput, 0x046D, 0xC21D, 10).with_name("XInput Controller 0");

        let mut reg = DeviceRegistry::new();
        reg.merge(vec![vec![donor], vec![raw], vec![hid], vec![xinput]]);

        let names: Vec<&str> = reg.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Logitech F310",
                "Logitech F310",
                "Logitech F310 - USB Gamepad",
                "XInput Controller 0"
            ]
        );
        // Decoration is cosmetic only.
        assert!(reg
            .get(&RegistryKey::new(SourceKind::Hid, "VID_046D&PID_C21D&COL_01"))
            .is_some());
    }
}
