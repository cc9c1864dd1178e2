//! Capability extraction from HID report descriptors.
//!
//! [`types`] holds the capability tables every backend produces,
//! [`descriptor`] decodes raw report-descriptor bytes into those tables, and
//! [`parser`] reduces them to a [`CapabilityRecord`](crate::CapabilityRecord).

pub mod descriptor;
pub mod parser;
pub mod types;
pub mod usage;

pub use descriptor::ReportDescriptor;
pub use parser::{button_offset, count_buttons, parse_capabilities, ParseOptions};
pub use types::{
    ButtonCap, CapsSource, LinkCollectionNode, ReportKind, ReportLengths, UsageSpec, ValueCap,
};
