//! Capability counts derived from a device's report descriptor.
//!
//! A [`CapabilityRecord`] is computed once per device per pass by
//! [`parse_capabilities`](crate::caps::parse_capabilities) and is owned by the
//! [`DeviceRecord`](crate::device::DeviceRecord) it describes.
//!
//! # Confidence
//! Most counts are read straight off the descriptor. A few heuristics (see the
//! parser docs) can only *guess* a count; those values are tagged
//! [`Count::Estimated`] so downstream logic can tell them apart.

use serde::Serialize;
use std::fmt;

/// A control count, tagged with how it was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "confidence", content = "value", rename_all = "snake_case")]
pub enum Count {
    /// Read from the descriptor (or accepted by an active probe).
    Measured(u32),
    /// Inferred from descriptor shape; not a measurement.
    Estimated(u32),
}

impl Count {
    pub const ZERO: Count = Count::Measured(0);

    #[inline]
    pub fn value(self) -> u32 {
        match self {
            Count::Measured(n) | Count::Estimated(n) => n,
        }
    }

    #[inline]
    pub fn is_estimated(self) -> bool {
        matches!(self, Count::Estimated(_))
    }
}

impl Default for Count {
    fn default() -> Self {
        Count::ZERO
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Measured(n) => write!(f, "{n}"),
            Count::Estimated(n) => write!(f, "~{n}"),
        }
    }
}

/// Simulation Controls page (0x02) controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimulationCounts {
    pub throttle: u32,
    pub brake: u32,
    pub steering: u32,
    pub accelerator: u32,
    pub clutch: u32,
}

impl SimulationCounts {
    pub fn total(&self) -> u32 {
        self.throttle + self.brake + self.steering + self.accelerator + self.clutch
    }
}

/// Control counts and input-report layout for one device.
///
/// Invariant: `button_offset` is strictly inside the input report and equals
/// `report_id_bytes + ceil(total_value_bits / 8)`, or falls back to
/// `report_id_bytes` when that sum would land outside it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityRecord {
    pub axes: Count,
    pub sliders: Count,
    pub buttons: u32,
    pub povs: Count,
    pub simulation: SimulationCounts,
    /// Any output value capability on the Physical Interface Device page.
    pub force_feedback: bool,
    /// Every input report starts with a report-id byte.
    pub has_report_id: bool,
    /// Byte offset of the first button bit within an input report.
    pub button_offset: usize,
    /// OS-reported input report length, report-id byte included.
    pub input_report_len: usize,
}

impl CapabilityRecord {
    #[inline]
    pub fn report_id_bytes(&self) -> usize {
        usize::from(self.has_report_id)
    }

    /// `true` if any count came from a heuristic rather than the descriptor.
    pub fn has_estimates(&self) -> bool {
        self.axes.is_estimated() || self.sliders.is_estimated() || self.povs.is_estimated()
    }

    /// No controls of any kind were found.
    pub fn is_empty(&self) -> bool {
        self.axes.value() == 0
            && self.sliders.value() == 0
            && self.buttons == 0
            && self.povs.value() == 0
            && self.simulation.total() == 0
    }
}
