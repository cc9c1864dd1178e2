//! Per-source device records.
//!
//! A [`DeviceRecord`] describes one endpoint as seen by one enumeration
//! source during one pass. Collectors build it fresh every pass and never
//! mutate it afterwards; re-enumeration replaces it.
//!
//! # Conventions
//! - `handle` is the source-specific instance handle (device path, instance
//!   GUID, XInput slot). Opaque; useful for diagnostics and for re-opening.
//! - `name` is best effort. Sources that cannot report a product name leave a
//!   generic one; the registry may decorate it later.
//! - `vendor` / `product` are `0` when unresolved (see [`crate::identity`]).
//! - `descriptor` keeps the preparsed descriptor alive for on-demand usage
//!   lookups. It is released when the last record or entry holding it drops.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::capability::CapabilityRecord;
use crate::caps::types::{CapsSource, ReportKind, UsageSpec};
use crate::caps::usage::{
    GD_GAMEPAD, GD_JOYSTICK, GD_KEYBOARD, GD_KEYPAD, GD_MOUSE, GD_MULTI_AXIS, GD_POINTER,
    PAGE_DIGITIZER, PAGE_GENERIC_DESKTOP, PAGE_SIMULATION,
};
use crate::identity::{CanonicalId, IdMethod};
use crate::sources::SourceKind;

/// Coarse device class, from the top-level usage or the source's own report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Gamepad,
    Joystick,
    Wheel,
    Keyboard,
    Mouse,
    Digitizer,
    #[default]
    Other,
}

impl DeviceClass {
    /// Classify a top-level collection usage.
    pub fn from_usage(usage_page: u16, usage: u16) -> Self {
        match (usage_page, usage) {
            (PAGE_GENERIC_DESKTOP, GD_GAMEPAD) => DeviceClass::Gamepad,
            (PAGE_GENERIC_DESKTOP, GD_JOYSTICK | GD_MULTI_AXIS) => DeviceClass::Joystick,
            (PAGE_GENERIC_DESKTOP, GD_KEYBOARD | GD_KEYPAD) => DeviceClass::Keyboard,
            (PAGE_GENERIC_DESKTOP, GD_MOUSE | GD_POINTER) => DeviceClass::Mouse,
            (PAGE_DIGITIZER, _) => DeviceClass::Digitizer,
            (PAGE_SIMULATION, _) => DeviceClass::Wheel,
            _ => DeviceClass::Other,
        }
    }

    /// Keyboards and mice are exempt from transport-node filtering.
    #[inline]
    pub fn is_keyboard_or_mouse(self) -> bool {
        matches!(self, DeviceClass::Keyboard | DeviceClass::Mouse)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceClass::Gamepad => "gamepad",
            DeviceClass::Joystick => "joystick",
            DeviceClass::Wheel => "wheel",
            DeviceClass::Keyboard => "keyboard",
            DeviceClass::Mouse => "mouse",
            DeviceClass::Digitizer => "digitizer",
            DeviceClass::Other => "other",
        };
        f.write_str(s)
    }
}

/// Shared owner of a preparsed descriptor.
///
/// Cloning shares the descriptor; the OS resource behind it (if any) is
/// released exactly once, when the last clone drops.
#[derive(Clone)]
pub struct DescriptorHandle(Arc<dyn CapsSource>);

impl DescriptorHandle {
    pub fn new<S: CapsSource + 'static>(source: S) -> Self {
        DescriptorHandle(Arc::new(source))
    }

    pub fn caps(&self) -> &dyn CapsSource {
        self.0.as_ref()
    }

    /// `true` if an input button or value capability covers `(usage_page, usage)`.
    ///
    /// A descriptor query failure reads as "not present".
    pub fn has_input_usage(&self, usage_page: u16, usage: u16) -> bool {
        let covers = |page: u16, spec: UsageSpec| {
            page == usage_page
                && match spec {
                    UsageSpec::Single(u) => u == usage,
                    UsageSpec::Range { min, max } => (min..=max).contains(&usage),
                }
        };

        let buttons = self.0.button_caps(ReportKind::Input).unwrap_or_default();
        if buttons.iter().any(|c| covers(c.usage_page, c.usage)) {
            return true;
        }
        let values = self.0.value_caps(ReportKind::Input).unwrap_or_default();
        values.iter().any(|c| covers(c.usage_page, c.usage))
    }

    /// Number of live owners (records, entries, pending lookups).
    pub fn owners(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl fmt::Debug for DescriptorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorHandle")
            .field("owners", &self.owners())
            .finish()
    }
}

/// One endpoint as reported by one source in one pass.
#[derive(Clone, Debug)]
pub struct DeviceRecord {
    pub source: SourceKind,
    /// Source-specific handle / instance id.
    pub handle: String,
    pub name: String,
    pub vendor: u32,
    pub product: u32,
    pub interface_path: Option<String>,
    pub id: CanonicalId,
    /// How `vendor` / `product` were obtained.
    pub id_method: IdMethod,
    pub class: DeviceClass,
    pub caps: CapabilityRecord,
    pub online: bool,
    pub descriptor: Option<DescriptorHandle>,
}

impl DeviceRecord {
    /// Bare record for an already-resolved identifier; collectors fill the rest.
    pub fn new(source: SourceKind, handle: impl Into<String>, id: CanonicalId) -> Self {
        Self {
            source,
            handle: handle.into(),
            name: String::new(),
            vendor: id.vendor,
            product: id.product,
            interface_path: None,
            id,
            id_method: IdMethod::Unresolved,
            class: DeviceClass::Other,
            caps: CapabilityRecord::default(),
            online: true,
            descriptor: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_caps(mut self, caps: CapabilityRecord) -> Self {
        self.caps = caps;
        self
    }

    /// Canonical identifier string, the registry key within a source.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({})",
            self.name, self.source, self.id, self.class
        )
    }
}
