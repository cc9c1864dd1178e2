//! Enumeration sources and the per-source collector.
//!
//! Windows exposes the same physical controller through five independent
//! subsystems, each with its own record shape. This module hides that
//! behind two traits:
//!
//! - [`InstanceFields`]: the handful of fields the identity resolver and the
//!   registry need, implemented by one small adapter per source
//!   ([`hid`], [`raw_input`], [`direct_input`], [`xinput`], [`gaming_input`]).
//! - [`EnumerationSource`]: "list instances" + "get descriptor for instance".
//!
//! [`Collector`] turns one source into one filtered, identity-tagged batch of
//! [`DeviceRecord`]s. It never fails: an unavailable source yields an empty
//! batch, a failing instance is skipped, and a descriptor that cannot be
//! parsed leaves the device in the batch with zero capability counts.

pub mod direct_input;
pub mod gaming_input;
pub mod hid;
pub mod raw_input;
pub mod xinput;

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilityRecord;
use crate::caps::{parse_capabilities, ParseOptions};
use crate::device::{DescriptorHandle, DeviceClass, DeviceRecord};
use crate::error::SourceError;
use crate::filter::filter_transport_nodes;
use crate::identity::{find_markers, resolve_ids, CanonicalId, IdentityFields};

/// The five enumeration subsystems.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    RawInput,
    DirectInput,
    #[serde(rename = "xinput")]
    XInput,
    GamingInput,
    Hid,
}

impl SourceKind {
    /// Every source, in collection order.
    pub const ALL: [SourceKind; 5] = [
        SourceKind::RawInput,
        SourceKind::DirectInput,
        SourceKind::XInput,
        SourceKind::GamingInput,
        SourceKind::Hid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::RawInput => "raw_input",
            SourceKind::DirectInput => "direct_input",
            SourceKind::XInput => "xinput",
            SourceKind::GamingInput => "gaming_input",
            SourceKind::Hid => "hid",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of one listed instance.
pub trait InstanceFields: IdentityFields {
    /// Source-specific handle (path, instance GUID, slot).
    fn handle(&self) -> String;

    /// Product name, if the source reports one.
    fn name(&self) -> Option<String>;

    /// Class as reported by the source itself.
    fn class_hint(&self) -> Option<DeviceClass> {
        None
    }

    fn online(&self) -> bool {
        true
    }

    /// Capability counts for sources that expose no descriptor.
    fn known_caps(&self) -> Option<CapabilityRecord> {
        None
    }
}

/// One enumeration subsystem.
pub trait EnumerationSource {
    type Instance: InstanceFields;

    fn kind(&self) -> SourceKind;

    /// List current instances.
    ///
    /// ### Errors
    /// [`SourceError::Unavailable`] when the subsystem cannot be queried at all.
    fn list_instances(&mut self) -> Result<Vec<Self::Instance>, SourceError>;

    /// Preparsed descriptor for an instance, `Ok(None)` if the source has none.
    ///
    /// ### Errors
    /// [`SourceError::Descriptor`] keeps the instance with zero counts;
    /// any other error skips it.
    fn descriptor(
        &mut self,
        instance: &Self::Instance,
    ) -> Result<Option<DescriptorHandle>, SourceError>;
}

/// Object-safe view of a source, as stored by the catalogue.
pub trait BatchSource {
    fn kind(&self) -> SourceKind;

    /// Run the collector over this source.
    fn collect(&mut self, opts: &ParseOptions) -> Vec<DeviceRecord>;
}

impl<S: EnumerationSource> BatchSource for S {
    fn kind(&self) -> SourceKind {
        EnumerationSource::kind(self)
    }

    fn collect(&mut self, opts: &ParseOptions) -> Vec<DeviceRecord> {
        Collector::new(opts).collect(self)
    }
}

/// Turns one source into one filtered batch.
pub struct Collector<'a> {
    opts: &'a ParseOptions,
}

impl<'a> Collector<'a> {
    pub fn new(opts: &'a ParseOptions) -> Self {
        Self { opts }
    }

    pub fn collect<S: EnumerationSource>(&self, source: &mut S) -> Vec<DeviceRecord> {
        let kind = EnumerationSource::kind(source);
        let instances = match source.list_instances() {
            Ok(list) => list,
            Err(e) => {
                warn!("[SOURCE] {kind}: {e}; contributing an empty batch");
                return Vec::new();
            }
        };

        let mut batch = Vec::with_capacity(instances.len());
        for inst in &instances {
            match self.record(kind, source, inst) {
                Ok(rec) => batch.push(rec),
                Err(e) => warn!("[SOURCE] {kind}: skipping {}: {e}", inst.handle()),
            }
        }

        let listed = batch.len();
        let batch = filter_transport_nodes(batch);
        debug!(
            "[SOURCE] {kind}: {} listed, {listed} built, {} after transport filter",
            instances.len(),
            batch.len()
        );
        batch
    }

    fn record<S: EnumerationSource>(
        &self,
        kind: SourceKind,
        source: &mut S,
        inst: &S::Instance,
    ) -> Result<DeviceRecord, SourceError> {
        let handle = inst.handle();

        let (descriptor, desc_class) = match source.descriptor(inst) {
            Ok(Some(d)) => {
                let class = d
                    .caps()
                    .report_lengths()
                    .ok()
                    .map(|l| DeviceClass::from_usage(l.usage_page, l.usage));
                (Some(d), class)
            }
            Ok(None) => (None, None),
            Err(SourceError::Descriptor(e)) => {
                warn!("[CAPS] {kind} {handle}: {e}; keeping device with zero counts");
                (None, None)
            }
            Err(e) => return Err(e),
        };

        let caps = match &descriptor {
            Some(d) => parse_capabilities(d.caps(), self.opts).unwrap_or_else(|e| {
                warn!("[CAPS] {kind} {handle}: {e}; keeping device with zero counts");
                CapabilityRecord::default()
            }),
            None => inst.known_caps().unwrap_or_default(),
        };

        let ids = resolve_ids(inst);
        let (interface, collection) = find_markers(inst);
        let id = CanonicalId {
            vendor: ids.vendor,
            product: ids.product,
            interface,
            collection,
        };

        let class = inst
            .class_hint()
            .or(desc_class)
            .unwrap_or(DeviceClass::Other);
        let name = inst
            .name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{kind} device {}", id.vid_pid()));

        debug!(
            "[SOURCE] {kind} {handle} -> {id} ({class}) axes={} sliders={} buttons={} povs={}",
            caps.axes, caps.sliders, caps.buttons, caps.povs
        );

        Ok(DeviceRecord {
            source: kind,
            handle,
            name,
            vendor: ids.vendor,
            product: ids.product,
            interface_path: inst.interface_path().map(str::to_owned),
            id,
            id_method: ids.method,
            class,
            caps,
            online: inst.online(),
            descriptor,
        })
    }
}

/// A source whose instances are supplied by the host.
///
/// Used for subsystems enumerated outside this crate (DirectInput and
/// Windows.Gaming.Input are COM / WinRT surfaces) and in tests.
#[derive(Clone, Debug)]
pub struct StaticSource<I> {
    kind: SourceKind,
    instances: Vec<I>,
    unavailable: Option<String>,
}

impl<I: InstanceFields + Clone> StaticSource<I> {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            instances: Vec::new(),
            unavailable: None,
        }
    }

    pub fn with_instances(kind: SourceKind, instances: Vec<I>) -> Self {
        Self {
            kind,
            instances,
            unavailable: None,
        }
    }

    /// Replace the instance list reported by the next pass.
    pub fn set_instances(&mut self, instances: Vec<I>) {
        self.instances = instances;
        self.unavailable = None;
    }

    /// Report the source as unavailable until the next `set_instances`.
    pub fn set_unavailable(&mut self, reason: impl Into<String>) {
        self.unavailable = Some(reason.into());
    }
}

impl<I: InstanceFields + Clone> EnumerationSource for StaticSource<I> {
    type Instance = I;

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn list_instances(&mut self) -> Result<Vec<I>, SourceError> {
        match &self.unavailable {
            Some(reason) => Err(SourceError::Unavailable {
                kind: self.kind,
                reason: reason.clone(),
            }),
            None => Ok(self.instances.clone()),
        }
    }

    fn descriptor(&mut self, _instance: &I) -> Result<Option<DescriptorHandle>, SourceError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::descriptor::ReportDescriptor;
    use crate::capability::Count;
    use crate::error::DescriptorError;
    use crate::sources::hid::HidInstance;

    const PAD: &[u8] = &[
        0x05, 0x01, 0x09, 0x05, 0xA1, 0x01, //
        0x05, 0x09, 0x19, 0x01, 0x29, 0x0A, 0x15, 0x00, 0x25, 0x01, 0x75, 0x01, 0x95, 0x0A,
        0x81, 0x02, 0x75, 0x06, 0x95, 0x01, 0x81, 0x03, //
        0x05, 0x01, 0x09, 0x30, 0x09, 0x31, 0x09, 0x32, 0x09, 0x35, 0x15, 0x00, 0x26, 0xFF,
        0x00, 0x75, 0x08, 0x95, 0x04, 0x81, 0x02, //
        0xC0,
    ];

    /// Test source: HID instances whose descriptors come from raw bytes.
    struct BytesSource {
        instances: Vec<(HidInstance, Result<Vec<u8>, &'static str>)>,
    }

    impl EnumerationSource for BytesSource {
        type Instance = HidInstance;

        fn kind(&self) -> SourceKind {
            SourceKind::Hid
        }

        fn list_instances(&mut self) -> Result<Vec<HidInstance>, SourceError> {
            Ok(self.instances.iter().map(|(i, _)| i.clone()).collect())
        }

        fn descriptor(
            &mut self,
            instance: &HidInstance,
        ) -> Result<Option<DescriptorHandle>, SourceError> {
            let (_, bytes) = self
                .instances
                .iter()
                .find(|(i, _)| i.path == instance.path)
                .ok_or_else(|| SourceError::Instance {
                    handle: instance.path.clone(),
                    reason: "gone".into(),
                })?;
            match *bytes {
                Ok(ref b) => Ok(Some(DescriptorHandle::new(ReportDescriptor::parse(b)?))),
                Err("open") => Err(SourceError::Instance {
                    handle: instance.path.clone(),
                    reason: "access denied".into(),
                }),
                Err(why) => Err(DescriptorError::Unavailable(why.into()).into()),
            }
        }
    }

    fn hid(path: &str, vendor_id: u16, product_id: u16) -> HidInstance {
        HidInstance {
            path: path.into(),
            product_string: Some("Pad".into()),
            vendor_id,
            product_id,
            usage_page: 1,
            usage: 5,
        }
    }

    #[test]
    fn builds_records_with_caps_and_identity() {
        let mut src = BytesSource {
            instances: vec![(hid(r"\\?\HID#VID_045E&PID_028E#1", 0x045E, 0x028E), Ok(PAD.to_vec()))],
        };
        let batch = Collector::new(&ParseOptions::default()).collect(&mut src);
        assert_eq!(batch.len(), 1);
        let rec = &batch[0];
        assert_eq!(rec.key(), "VID_045E&PID_028E");
        assert_eq!(rec.class, DeviceClass::Gamepad);
        assert_eq!(rec.caps.buttons, 10);
        assert_eq!(rec.caps.axes, Count::Measured(4));
        assert!(rec.descriptor.is_some());
    }

    #[test]
    fn descriptor_failure_keeps_device_with_zero_counts() {
        let mut src = BytesSource {
            instances: vec![
                (hid(r"\\?\HID#VID_045E&PID_028E#1", 0x045E, 0x028E), Err("no preparsed data")),
                (hid(r"\\?\HID#VID_045E&PID_028F#1", 0x045E, 0x028F), Ok(vec![0xC0])),
            ],
        };
        let batch = Collector::new(&ParseOptions::default()).collect(&mut src);
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|r| r.caps.is_empty()));
    }

    #[test]
    fn failing_instance_is_skipped() {
        let mut src = BytesSource {
            instances: vec![
                (hid(r"\\?\HID#VID_045E&PID_028E#1", 0x045E, 0x028E), Err("open")),
                (hid(r"\\?\HID#VID_046D&PID_C21D#1", 0x046D, 0xC21D), Ok(PAD.to_vec())),
            ],
        };
        let batch = Collector::new(&ParseOptions::default()).collect(&mut src);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].product, 0xC21D);
    }

    #[test]
    fn unavailable_source_contributes_empty_batch() {
        let mut src: StaticSource<HidInstance> =
            StaticSource::with_instances(SourceKind::Hid, vec![hid("x", 0x045E, 0x028E)]);
        src.set_unavailable("hid.dll not loaded");
        assert!(src.collect(&ParseOptions::default()).is_empty());

        src.set_instances(vec![hid(r"\\?\HID#VID_045E&PID_028E#1", 0x045E, 0x028E)]);
        assert_eq!(src.collect(&ParseOptions::default()).len(), 1);
    }

    #[test]
    fn source_names_round_trip() {
        for kind in SourceKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
            let back: SourceKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }
}
