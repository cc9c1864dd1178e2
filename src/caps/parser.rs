//! Capability counting over a preparsed descriptor.
//!
//! [`parse_capabilities`] turns the button/value capability lists of any
//! [`CapsSource`] into a [`CapabilityRecord`]. It tolerates the usual vendor
//! variance:
//!
//! - Button usage ranges contribute `max - min + 1`; aliases are skipped and a
//!   `(usage_page, usage)` key is never counted twice.
//! - A value capability with `report_count > 1` yields one logical control per
//!   repetition, repeating the terminal usage once a usage range runs out.
//!   1-bit value capabilities (buttons declared as values) and aliases are
//!   skipped.
//! - Values living in a *Pointer* collection, or on the undefined usage page,
//!   are classified by their link usage.
//! - Any input capability with a non-zero report id means every input report
//!   carries a leading id byte.
//!
//! Two heuristics run after counting:
//!
//! - **Probe fallback.** Fewer than `probe_axis_threshold` declared axes on a
//!   non-trivial report: each standard axis/slider usage and the hat switch
//!   are probed against a zero-filled report. A probed category replaces the
//!   declared one only when it is higher.
//! - **Flight-stick estimate.** Sliders but no axes and no POV, inside a
//!   Pointer collection nested under a Joystick collection: assume 3 axes and
//!   1 POV. These are tagged [`Count::Estimated`].

use std::collections::HashSet;

use log::{debug, warn};

use crate::capability::{CapabilityRecord, Count, SimulationCounts};
use crate::caps::types::{
    ButtonCap, CapsSource, LinkCollectionNode, ReportKind, UsageSpec, ValueCap,
};
use crate::caps::usage::{
    classify_value, usage_name, ValueClass, GD_JOYSTICK, GD_POINTER, PAGE_GENERIC_DESKTOP, PAGE_PID,
    PROBE_USAGES,
};
use crate::error::DescriptorError;

/// Reports with fewer payload bytes than this are not worth probing.
const MIN_PROBE_PAYLOAD: usize = 2;

const ESTIMATED_STICK_AXES: u32 = 3;
const ESTIMATED_STICK_POVS: u32 = 1;

/// Heuristic switches for [`parse_capabilities`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub low_confidence_probe: bool,
    pub flight_stick_estimate: bool,
    /// Probe when fewer axes than this are declared.
    pub probe_axis_threshold: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            low_confidence_probe: true,
            flight_stick_estimate: true,
            probe_axis_threshold: 4,
        }
    }
}

#[derive(Default)]
struct Tally {
    axes: u32,
    sliders: u32,
    povs: u32,
    sim: SimulationCounts,
}

impl Tally {
    fn add(&mut self, class: ValueClass) {
        match class {
            ValueClass::Axis => self.axes += 1,
            ValueClass::Slider => self.sliders += 1,
            ValueClass::Pov => self.povs += 1,
            ValueClass::Throttle => self.sim.throttle += 1,
            ValueClass::Brake => self.sim.brake += 1,
            ValueClass::Steering => self.sim.steering += 1,
            ValueClass::Accelerator => self.sim.accelerator += 1,
            ValueClass::Clutch => self.sim.clutch += 1,
        }
    }
}

/// Count controls and compute the input-report layout for one device.
///
/// ### Errors
/// Fails only when the global report lengths cannot be read. Individual
/// button/value/link queries that fail are treated as empty, since it is legal
/// for a device to have only axes or only buttons.
pub fn parse_capabilities(
    src: &dyn CapsSource,
    opts: &ParseOptions,
) -> Result<CapabilityRecord, DescriptorError> {
    let lengths = src.report_lengths()?;

    let buttons = src.button_caps(ReportKind::Input).unwrap_or_else(|e| {
        debug!("[CAPS] input button caps unavailable: {e}; continuing without buttons");
        Vec::new()
    });
    let values = src.value_caps(ReportKind::Input).unwrap_or_else(|e| {
        debug!("[CAPS] input value caps unavailable: {e}; continuing without values");
        Vec::new()
    });
    let outputs = src.value_caps(ReportKind::Output).unwrap_or_default();
    let links = src.link_collections().unwrap_or_default();

    let has_report_id =
        buttons.iter().any(|c| c.report_id != 0) || values.iter().any(|c| c.report_id != 0);
    let report_id_bytes = usize::from(has_report_id);

    let button_count = count_buttons(&buttons);
    let mut tally = tally_values(&values);
    let button_offset = button_offset(&values, report_id_bytes, lengths.input);
    let force_feedback = outputs.iter().any(|c| c.usage_page == PAGE_PID);

    let mut axes = Count::Measured(tally.axes);
    let mut sliders = Count::Measured(tally.sliders);
    let mut povs = Count::Measured(tally.povs);

    let payload = lengths.input.saturating_sub(1);
    if opts.low_confidence_probe
        && tally.axes < opts.probe_axis_threshold
        && payload >= MIN_PROBE_PAYLOAD
    {
        let probed = probe_standard_usages(src, &values, &buttons, has_report_id, lengths.input);
        debug!(
            "[CAPS] probe: axes {}→{} sliders {}→{} povs {}→{}",
            tally.axes, probed.axes, tally.sliders, probed.sliders, tally.povs, probed.povs
        );
        if probed.axes > tally.axes {
            tally.axes = probed.axes;
            axes = Count::Measured(probed.axes);
        }
        if probed.sliders > tally.sliders {
            tally.sliders = probed.sliders;
            sliders = Count::Measured(probed.sliders);
        }
        if probed.povs > tally.povs {
            tally.povs = probed.povs;
            povs = Count::Measured(probed.povs);
        }
    }

    if opts.flight_stick_estimate
        && tally.sliders > 0
        && tally.axes == 0
        && tally.povs == 0
        && has_pointer_under_joystick(&links)
    {
        warn!(
            "[CAPS] sliders without axes under Pointer→Joystick; estimating {ESTIMATED_STICK_AXES} axes, {ESTIMATED_STICK_POVS} POV"
        );
        axes = Count::Estimated(ESTIMATED_STICK_AXES);
        povs = Count::Estimated(ESTIMATED_STICK_POVS);
    }

    let record = CapabilityRecord {
        axes,
        sliders,
        buttons: button_count,
        povs,
        simulation: tally.sim,
        force_feedback,
        has_report_id,
        button_offset,
        input_report_len: lengths.input,
    };

    debug!(
        "[CAPS] axes={} sliders={} buttons={} povs={} sim={} ffb={} rid={} offset={} len={}",
        record.axes,
        record.sliders,
        record.buttons,
        record.povs,
        record.simulation.total(),
        record.force_feedback,
        record.has_report_id,
        record.button_offset,
        record.input_report_len
    );

    Ok(record)
}

/// Count buttons, expanding ranges and skipping aliases and repeated usages.
pub fn count_buttons(caps: &[ButtonCap]) -> u32 {
    let mut counted: HashSet<(u16, u16)> = HashSet::new();
    let mut total = 0u32;

    for c in caps.iter().filter(|c| !c.is_alias) {
        let (lo, hi) = match c.usage {
            UsageSpec::Single(u) => (u, u),
            UsageSpec::Range { min, max } => (min, max),
        };
        if lo > hi {
            continue;
        }
        for u in lo..=hi {
            if counted.insert((c.usage_page, u)) {
                total += 1;
            }
        }
    }
    total
}

fn tally_values(caps: &[ValueCap]) -> Tally {
    let mut tally = Tally::default();

    for c in caps {
        if c.is_alias || c.bit_size == 1 {
            continue;
        }
        let controls = u32::from(c.report_count).max(c.usage.span());
        debug!(
            "[CAPS] value {} x{controls} ({} bits, rid {})",
            usage_name(c.usage_page, c.usage.first()),
            c.bit_size,
            c.report_id
        );
        for i in 0..controls {
            let usage = c.usage.nth_repeating(i);
            if let Some(class) = classify_value(c.usage_page, usage, c.link_usage) {
                tally.add(class);
            }
        }
    }
    tally
}

/// `report_id_bytes + ceil(Σ bit_size × report_count / 8)` over non-alias values.
///
/// Falls back to `report_id_bytes` when the sum is not strictly inside the report.
pub fn button_offset(values: &[ValueCap], report_id_bytes: usize, input_len: usize) -> usize {
    let bits: u64 = values
        .iter()
        .filter(|c| !c.is_alias)
        .map(ValueCap::total_bits)
        .sum();
    let bytes = usize::try_from(bits.div_ceil(8)).unwrap_or(usize::MAX);
    let offset = report_id_bytes.saturating_add(bytes);

    if offset < input_len {
        offset
    } else {
        warn!(
            "[CAPS] button offset {offset} outside {input_len}-byte report; using {report_id_bytes}"
        );
        report_id_bytes
    }
}

fn probe_standard_usages(
    src: &dyn CapsSource,
    values: &[ValueCap],
    buttons: &[ButtonCap],
    has_report_id: bool,
    input_len: usize,
) -> Tally {
    let mut report = vec![0u8; input_len];
    if has_report_id {
        // The OS parser rejects a report whose id byte matches no input report.
        let rid = values
            .iter()
            .map(|c| c.report_id)
            .chain(buttons.iter().map(|c| c.report_id))
            .find(|&r| r != 0);
        if let (Some(rid), Some(first)) = (rid, report.first_mut()) {
            *first = rid;
        }
    }

    let mut tally = Tally::default();
    for usage in PROBE_USAGES {
        if src.probe_input_value(PAGE_GENERIC_DESKTOP, usage, &report) {
            debug!("[CAPS] probe accepted {}", usage_name(PAGE_GENERIC_DESKTOP, usage));
            if let Some(class) = classify_value(PAGE_GENERIC_DESKTOP, usage, 0) {
                tally.add(class);
            }
        }
    }
    tally
}

/// A Pointer collection whose parent is a Joystick collection.
fn has_pointer_under_joystick(links: &[LinkCollectionNode]) -> bool {
    links.iter().enumerate().any(|(idx, node)| {
        if node.usage_page != PAGE_GENERIC_DESKTOP || node.usage != GD_POINTER {
            return false;
        }
        let parent = usize::from(node.parent);
        parent != idx
            && links
                .get(parent)
                .is_some_and(|p| p.usage_page == PAGE_GENERIC_DESKTOP && p.usage == GD_JOYSTICK)
    })
}
