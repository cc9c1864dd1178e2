//! Vendor / product / interface / collection identity.
//!
//! Every enumeration source exposes a different subset of identity fields:
//! some hand over numeric ids directly, most only a device path or PnP
//! instance id, a few only a binary product GUID. [`resolve_ids`] tries the
//! extraction methods in priority order and stops at the first one that yields
//! two non-zero values; [`canonical_id`] combines the result with the
//! interface (`MI_xx`) and collection (`COL_xx`) markers into a
//! [`CanonicalId`] that is stable across sources.
//!
//! # Canonical form
//! `VID_xxxx&PID_xxxx[&MI_xx][&COL_xx]`, uppercase hex, at least 4 digits.
//! `&MI_xx` is omitted for the primary interface (`00`); `&COL_xx` carries the
//! literal value found. Unresolved ids render as `0000`.
//!
//! # Example
//! ```
//! use padcat::identity::{canonical_id, IdentityHints};
//!
//! let hints = IdentityHints {
//!     interface_path: Some(r"\\?\HID#VID_045E&PID_028E&MI_00&COL02#7&1a2b".into()),
//!     ..Default::default()
//! };
//! assert_eq!(canonical_id(&hints).to_string(), "VID_045E&PID_028E&COL_02");
//! ```

use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

static VID_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)VID_([0-9A-F]{4})"));
static PID_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)PID_([0-9A-F]{4})"));
static BT_IDS_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)VID&[0-9A-F]{4}([0-9A-F]{4})_PID&([0-9A-F]{4})"));
static VEN_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)VEN_([0-9A-F]{4})"));
static DEV_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)DEV_([0-9A-F]{4})"));
static ANY_MARKER_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)VID_|PID_|VID&|VEN_|DEV_"));
static MI_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)(?:^|[&#\\])MI_([0-9A-F]{2})"));
static COL_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)(?:^|[&#\\])COL_?([0-9A-F]{2,4})"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are literals; an invalid one is a programming error.
        Err(e) => panic!("invalid identity pattern {pattern}: {e}"),
    }
}

/// Identity-bearing fields a source record may expose.
///
/// Every accessor defaults to "not available", so an adapter only overrides
/// what its source actually carries.
pub trait IdentityFields {
    /// Vendor / product reported as numbers by the source itself.
    fn structured_ids(&self) -> Option<(u32, u32)> {
        None
    }
    /// PnP instance id (`HID\VID_045E&PID_028E&MI_00\7&...`).
    fn instance_id(&self) -> Option<&str> {
        None
    }
    /// First hardware-id string.
    fn hardware_id(&self) -> Option<&str> {
        None
    }
    /// Device interface path (`\\?\HID#VID_...#{guid}`).
    fn interface_path(&self) -> Option<&str> {
        None
    }
    /// Location / container string.
    fn location(&self) -> Option<&str> {
        None
    }
    /// Raw product GUID bytes in memory order (`Data1` little-endian).
    fn product_guid(&self) -> Option<[u8; 16]> {
        None
    }
}

/// Plain bag of identity fields; the adapter for sources whose records are
/// supplied as data rather than read from an OS handle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityHints {
    pub structured: Option<(u32, u32)>,
    pub instance_id: Option<String>,
    pub hardware_id: Option<String>,
    pub interface_path: Option<String>,
    pub location: Option<String>,
    pub product_guid: Option<[u8; 16]>,
}

impl IdentityFields for IdentityHints {
    fn structured_ids(&self) -> Option<(u32, u32)> {
        self.structured
    }
    fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }
    fn hardware_id(&self) -> Option<&str> {
        self.hardware_id.as_deref()
    }
    fn interface_path(&self) -> Option<&str> {
        self.interface_path.as_deref()
    }
    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
    fn product_guid(&self) -> Option<[u8; 16]> {
        self.product_guid
    }
}

/// Which extraction method produced a [`ResolvedIds`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMethod {
    /// Numeric ids supplied by the source.
    Structured,
    /// `VID_xxxx` / `PID_xxxx` (or Bluetooth `VID&xxxxxxxx_PID&xxxx`).
    UsbMarkers,
    /// `VEN_xxxx` / `DEV_xxxx`.
    BusMarkers,
    /// Alphabetic vendor tag + hex product (`ACPI\DLLK0A05`).
    CompositeTag,
    /// Low 32 bits of the product GUID.
    ProductGuid,
    /// Every method failed.
    Unresolved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedIds {
    pub vendor: u32,
    pub product: u32,
    pub method: IdMethod,
}

impl ResolvedIds {
    pub const UNRESOLVED: ResolvedIds = ResolvedIds {
        vendor: 0,
        product: 0,
        method: IdMethod::Unresolved,
    };

    fn found(vendor: u32, product: u32, method: IdMethod) -> Option<Self> {
        (vendor != 0 && product != 0).then_some(ResolvedIds {
            vendor,
            product,
            method,
        })
    }
}

/// Canonical cross-source identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct CanonicalId {
    pub vendor: u32,
    pub product: u32,
    /// Interface number as found (`"00"` included; omitted only when rendering).
    pub interface: Option<String>,
    /// Collection number as found.
    pub collection: Option<String>,
}

impl CanonicalId {
    #[inline]
    pub fn has_interface_marker(&self) -> bool {
        self.interface.is_some()
    }

    #[inline]
    pub fn has_collection_marker(&self) -> bool {
        self.collection.is_some()
    }

    /// `VID_xxxx&PID_xxxx`, the prefix shared by every endpoint of a device.
    pub fn vid_pid(&self) -> String {
        format!("VID_{:04X}&PID_{:04X}", self.vendor, self.product)
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VID_{:04X}&PID_{:04X}", self.vendor, self.product)?;
        if let Some(mi) = self.interface.as_deref().filter(|mi| *mi != "00") {
            write!(f, "&MI_{mi}")?;
        }
        if let Some(col) = &self.collection {
            write!(f, "&COL_{col}")?;
        }
        Ok(())
    }
}

impl Serialize for CanonicalId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// String fields in marker-search priority order.
fn text_fields(f: &dyn IdentityFields) -> [Option<&str>; 4] {
    [
        f.instance_id(),
        f.hardware_id(),
        f.interface_path(),
        f.location(),
    ]
}

fn hex_capture(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| u32::from_str_radix(m.as_str(), 16).ok())
}

fn usb_markers(text: &str) -> Option<(u32, u32)> {
    if let (Some(v), Some(p)) = (hex_capture(&VID_RE, text), hex_capture(&PID_RE, text)) {
        return Some((v, p));
    }
    let c = BT_IDS_RE.captures(text)?;
    let v = u32::from_str_radix(c.get(1)?.as_str(), 16).ok()?;
    let p = u32::from_str_radix(c.get(2)?.as_str(), 16).ok()?;
    Some((v, p))
}

fn bus_markers(text: &str) -> Option<(u32, u32)> {
    Some((hex_capture(&VEN_RE, text)?, hex_capture(&DEV_RE, text)?))
}

/// Second segment of a path or instance id (`ACPI\DLLK0A05\...` → `DLLK0A05`).
fn tag_segment(text: &str) -> Option<&str> {
    let sep = if text.contains('#') { '#' } else { '\\' };
    text.trim_start_matches(['\\', '?'])
        .split(sep)
        .nth(1)
        .filter(|s| !s.is_empty())
}

/// Split a composite tag into a packed alphabetic vendor and a hex product.
///
/// The vendor part is the longest leading alphabetic run that still leaves at
/// least two hex digits; it must fit in 32 bits (4 ASCII bytes).
pub fn split_composite_tag(tag: &str) -> Option<(u32, u32)> {
    let alpha_len = tag.bytes().take_while(u8::is_ascii_alphabetic).count();
    let split = (1..=alpha_len).rev().find(|&at| {
        let rest = &tag[at..];
        rest.len() >= 2 && rest.bytes().all(|b| b.is_ascii_hexdigit())
    })?;

    let (alpha, rest) = tag.split_at(split);
    if alpha.len() > 4 || rest.len() > 8 {
        return None;
    }
    let vendor = alpha
        .bytes()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(b.to_ascii_uppercase()));
    let product = u32::from_str_radix(rest, 16).ok()?;
    Some((vendor, product))
}

fn composite_tag(text: &str) -> Option<(u32, u32)> {
    if ANY_MARKER_RE.is_match(text) {
        return None;
    }
    split_composite_tag(tag_segment(text)?)
}

/// Product GUID `Data1` rendered as `PPPPVVVV`: first 4 digits product, next 4 vendor.
fn guid_ids(guid: [u8; 16]) -> (u32, u32) {
    let data1 = u32::from_le_bytes([guid[0], guid[1], guid[2], guid[3]]);
    (data1 & 0xFFFF, data1 >> 16)
}

/// Resolve vendor / product ids, stopping at the first method that yields two
/// non-zero values.
pub fn resolve_ids(f: &dyn IdentityFields) -> ResolvedIds {
    let texts = text_fields(f);
    let each = |extract: fn(&str) -> Option<(u32, u32)>, method: IdMethod| {
        texts
            .iter()
            .flatten()
            .filter_map(|t| extract(t))
            .find_map(|(v, p)| ResolvedIds::found(v, p, method))
    };

    let resolved = f
        .structured_ids()
        .and_then(|(v, p)| ResolvedIds::found(v, p, IdMethod::Structured))
        .or_else(|| each(usb_markers, IdMethod::UsbMarkers))
        .or_else(|| each(bus_markers, IdMethod::BusMarkers))
        .or_else(|| each(composite_tag, IdMethod::CompositeTag))
        .or_else(|| {
            f.product_guid()
                .map(guid_ids)
                .and_then(|(v, p)| ResolvedIds::found(v, p, IdMethod::ProductGuid))
        })
        .unwrap_or(ResolvedIds::UNRESOLVED);

    debug!(
        "[IDENT] {:04X}:{:04X} via {:?}",
        resolved.vendor, resolved.product, resolved.method
    );
    resolved
}

fn first_marker(re: &Regex, f: &dyn IdentityFields) -> Option<String> {
    text_fields(f)
        .into_iter()
        .flatten()
        .find_map(|t| re.captures(t).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Interface (`MI_xx`) and collection (`COL_xx`) markers.
///
/// Each is taken from the most authoritative field carrying it: instance id,
/// then hardware id, then interface path, then location.
pub fn find_markers(f: &dyn IdentityFields) -> (Option<String>, Option<String>) {
    (first_marker(&MI_RE, f), first_marker(&COL_RE, f))
}

/// Full canonical identifier for a record.
pub fn canonical_id(f: &dyn IdentityFields) -> CanonicalId {
    let ids = resolve_ids(f);
    let (interface, collection) = find_markers(f);
    CanonicalId {
        vendor: ids.vendor,
        product: ids.product,
        interface,
        collection,
    }
}
