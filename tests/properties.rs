//! Property-based tests for the parser arithmetic, identity normalisation,
//! the transport-node rule and merge stability.

use std::collections::BTreeSet;

use padcat::caps::{
    button_offset, count_buttons, parse_capabilities, ButtonCap, CapsSource, LinkCollectionNode,
    ParseOptions, ReportKind, ReportLengths, UsageSpec, ValueCap,
};
use padcat::error::DescriptorError;
use padcat::filter::filter_transport_nodes;
use padcat::identity::{canonical_id, IdentityHints};
use padcat::{CanonicalId, DeviceClass, DeviceRecord, DeviceRegistry, RegistryKey, SourceKind};
use proptest::prelude::*;

fn value(bit_size: u16, report_count: u16, is_alias: bool) -> ValueCap {
    ValueCap {
        usage_page: 0x01,
        usage: UsageSpec::Single(0x30),
        report_id: 0,
        is_alias,
        bit_size,
        report_count,
        logical_min: 0,
        logical_max: 255,
        link_collection: 0,
        link_usage_page: 0x01,
        link_usage: 0x04,
    }
}

fn button(page: u16, usage: UsageSpec, is_alias: bool) -> ButtonCap {
    ButtonCap {
        usage_page: page,
        usage,
        report_id: 0,
        is_alias,
        link_collection: 0,
        link_usage_page: 0x01,
        link_usage: 0x04,
    }
}

/// Fixed capability tables, for driving the parser without a descriptor.
struct Tables {
    input_len: usize,
    buttons: Vec<ButtonCap>,
    values: Vec<ValueCap>,
}

impl CapsSource for Tables {
    fn report_lengths(&self) -> Result<ReportLengths, DescriptorError> {
        Ok(ReportLengths {
            input: self.input_len,
            usage_page: 0x01,
            usage: 0x04,
            ..Default::default()
        })
    }

    fn button_caps(&self, kind: ReportKind) -> Result<Vec<ButtonCap>, DescriptorError> {
        Ok(match kind {
            ReportKind::Input => self.buttons.clone(),
            _ => Vec::new(),
        })
    }

    fn value_caps(&self, kind: ReportKind) -> Result<Vec<ValueCap>, DescriptorError> {
        Ok(match kind {
            ReportKind::Input => self.values.clone(),
            _ => Vec::new(),
        })
    }

    fn link_collections(&self) -> Result<Vec<LinkCollectionNode>, DescriptorError> {
        Ok(Vec::new())
    }

    fn probe_input_value(&self, _usage_page: u16, _usage: u16, _report: &[u8]) -> bool {
        false
    }
}

fn no_heuristics() -> ParseOptions {
    ParseOptions {
        low_confidence_probe: false,
        flight_stick_estimate: false,
        ..Default::default()
    }
}

fn id(vendor: u32, product: u32, mi: Option<u8>, col: Option<u8>) -> CanonicalId {
    CanonicalId {
        vendor,
        product,
        interface: mi.map(|m| format!("{m:02X}")),
        collection: col.map(|c| format!("{c:02X}")),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_button_offset_sums_non_alias_value_bits(
        caps in prop::collection::vec((2u16..=32, 1u16..=16, any::<bool>()), 0..12),
        rid in 0usize..=1,
        slack in 1usize..8,
    ) {
        let values: Vec<ValueCap> = caps.iter().map(|&(b, n, a)| value(b, n, a)).collect();
        let bits: u64 = caps
            .iter()
            .filter(|(_, _, alias)| !alias)
            .map(|&(b, n, _)| u64::from(b) * u64::from(n))
            .sum();
        let expected = rid + bits.div_ceil(8) as usize;

        prop_assert_eq!(button_offset(&values, rid, expected + slack), expected);
        // Not strictly inside the report: fall back to the id byte count.
        prop_assert_eq!(button_offset(&values, rid, expected), rid);
    }

    #[test]
    fn prop_alias_duplicates_never_add_buttons(
        ranges in prop::collection::vec((1u16..64, 0u16..16), 1..6),
    ) {
        let caps: Vec<ButtonCap> = ranges
            .iter()
            .map(|&(min, len)| button(0x09, UsageSpec::Range { min, max: min + len }, false))
            .collect();
        let base = count_buttons(&caps);

        let mut aliased = caps.clone();
        aliased.extend(caps.iter().map(|c| ButtonCap { is_alias: true, ..c.clone() }));
        prop_assert_eq!(count_buttons(&aliased), base);

        // Repeating a counted usage without the alias flag does not add either.
        let mut repeated = caps.clone();
        repeated.push(button(0x09, UsageSpec::Single(ranges[0].0), false));
        prop_assert_eq!(count_buttons(&repeated), base);
    }

    #[test]
    fn prop_button_range_contributes_span(min in 1u16..0x200, len in 0u16..0x80) {
        let caps = [button(0x09, UsageSpec::Range { min, max: min + len }, false)];
        prop_assert_eq!(count_buttons(&caps), u32::from(len) + 1);
    }

    #[test]
    fn prop_value_range_contributes_max_of_count_and_span(span in 1u16..=6, count in 1u16..=10) {
        // X..=X+span-1 stays within the axis usages 0x30..=0x35.
        let cap = ValueCap {
            usage: UsageSpec::Range { min: 0x30, max: 0x30 + span - 1 },
            bit_size: 8,
            report_count: count,
            ..value(8, count, false)
        };
        let tables = Tables {
            input_len: 1 + usize::from(count) + 2,
            buttons: Vec::new(),
            values: vec![cap],
        };
        let caps = parse_capabilities(&tables, &no_heuristics()).unwrap();
        prop_assert_eq!(caps.axes.value(), u32::from(span.max(count)));
        prop_assert_eq!(caps.sliders.value(), 0);
    }

    #[test]
    fn prop_same_ids_in_different_fields_agree(
        vendor in 1u16..=u16::MAX,
        product in 1u16..=u16::MAX,
        mi in prop::option::of(0u8..16),
        col in prop::option::of(1u8..32),
    ) {
        let mut tail = String::new();
        if let Some(m) = mi {
            tail.push_str(&format!("&MI_{m:02X}"));
        }
        if let Some(c) = col {
            tail.push_str(&format!("&COL{c:02X}"));
        }

        let from_instance = IdentityHints {
            instance_id: Some(format!(r"HID\VID_{vendor:04X}&PID_{product:04X}{tail}\7&2A1B&0&0000")),
            ..Default::default()
        };
        let from_path = IdentityHints {
            interface_path: Some(
                format!(r"\\?\HID#VID_{vendor:04X}&PID_{product:04X}{tail}#7&2a1b&0&0000#{{4d1e55b2}}")
                    .to_lowercase(),
            ),
            ..Default::default()
        };
        let from_struct = IdentityHints {
            structured: Some((u32::from(vendor), u32::from(product))),
            hardware_id: Some(format!(r"HID\Vid_{vendor:04x}&Pid_{product:04x}{tail}")),
            ..Default::default()
        };

        let prefix = format!("VID_{vendor:04X}&PID_{product:04X}");
        let a = canonical_id(&from_instance).to_string();
        prop_assert_eq!(&a, &canonical_id(&from_path).to_string());
        prop_assert_eq!(&a, &canonical_id(&from_struct).to_string());
        prop_assert!(a.starts_with(&prefix));
    }

    #[test]
    fn prop_transport_node_rule(
        nodes in prop::collection::vec(
            (1u32..=2, 1u32..=2, prop::option::of(0u8..=2), prop::option::of(1u8..=2), any::<bool>()),
            0..10,
        ),
    ) {
        let batch: Vec<DeviceRecord> = nodes
            .iter()
            .enumerate()
            .map(|(i, &(v, p, mi, col, keyboard))| {
                let class = if keyboard { DeviceClass::Keyboard } else { DeviceClass::Joystick };
                DeviceRecord::new(SourceKind::Hid, format!("node{i}"), id(v, p, mi, col))
                    .with_class(class)
            })
            .collect();

        let kept: BTreeSet<String> = filter_transport_nodes(batch.clone())
            .into_iter()
            .map(|r| r.handle)
            .collect();

        for (i, &(v, p, mi, col, keyboard)) in nodes.iter().enumerate() {
            let has_sibling = mi.is_some()
                && nodes.iter().any(|&(v2, p2, mi2, col2, _)| {
                    v2 == v && p2 == p && mi2 == mi && col2.is_some()
                });
            let dropped = !keyboard && mi.is_some() && col.is_none() && has_sibling;
            let handle = format!("node{i}");
            prop_assert_eq!(kept.contains(&handle), !dropped);
        }
    }

    #[test]
    fn prop_remerge_keeps_flags(
        devices in prop::collection::btree_set((1u32..0x100, 1u32..0x100), 1..8),
        flags in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()), 8),
    ) {
        let batch: Vec<DeviceRecord> = devices
            .iter()
            .map(|&(v, p)| {
                DeviceRecord::new(SourceKind::RawInput, format!("{v:x}:{p:x}"), id(v, p, None, None))
            })
            .collect();

        let mut reg = DeviceRegistry::new();
        reg.merge(vec![batch.clone()]);
        prop_assert!(reg.iter().all(|e| e.activity == Default::default()));

        let keys: Vec<RegistryKey> = reg.keys().cloned().collect();
        for (key, &(axis, slider, btn, pov)) in keys.iter().zip(&flags) {
            reg.set_axis_active(key, axis);
            reg.set_slider_active(key, slider);
            reg.set_button_active(key, btn);
            reg.set_pov_active(key, pov);
        }
        let before: Vec<_> = reg.iter().map(|e| e.activity).collect();

        let report = reg.merge(vec![batch]);
        prop_assert!(report.is_stable());
        prop_assert_eq!(reg.keys().cloned().collect::<Vec<_>>(), keys);
        prop_assert_eq!(reg.iter().map(|e| e.activity).collect::<Vec<_>>(), before);
    }
}
