//! Capability model shared by every descriptor backend.
//!
//! These structs mirror the fields of Windows `HIDP_BUTTON_CAPS`,
//! `HIDP_VALUE_CAPS` and `HIDP_LINK_COLLECTION_NODE` that the capability
//! parser needs, so the HidP backend and the pure-Rust descriptor decoder feed
//! the same parser.

use crate::error::DescriptorError;

/// Which report a capability belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Input,
    Output,
    Feature,
}

/// Usage selector of a capability: one usage or an inclusive range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageSpec {
    Single(u16),
    Range { min: u16, max: u16 },
}

impl UsageSpec {
    /// Number of distinct usages covered (0 for an inverted range).
    pub fn span(&self) -> u32 {
        match *self {
            UsageSpec::Single(_) => 1,
            UsageSpec::Range { min, max } if min <= max => u32::from(max - min) + 1,
            UsageSpec::Range { .. } => 0,
        }
    }

    /// First usage of the selector.
    pub fn first(&self) -> u16 {
        match *self {
            UsageSpec::Single(u) => u,
            UsageSpec::Range { min, .. } => min,
        }
    }

    /// Usage at repetition `i`; repeats the terminal usage once the range is exhausted.
    pub fn nth_repeating(&self, i: u32) -> u16 {
        match *self {
            UsageSpec::Single(u) => u,
            UsageSpec::Range { min, max } => {
                let span = self.span();
                if span == 0 {
                    return min;
                }
                let step = i.min(span - 1);
                // step < span <= u16::MAX + 1, so the add stays in range.
                min.saturating_add(step as u16).min(max)
            }
        }
    }
}

/// One button capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonCap {
    pub usage_page: u16,
    pub usage: UsageSpec,
    pub report_id: u8,
    pub is_alias: bool,
    pub link_collection: u16,
    pub link_usage_page: u16,
    pub link_usage: u16,
}

/// One value capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueCap {
    pub usage_page: u16,
    pub usage: UsageSpec,
    pub report_id: u8,
    pub is_alias: bool,
    pub bit_size: u16,
    pub report_count: u16,
    pub logical_min: i32,
    pub logical_max: i32,
    pub link_collection: u16,
    pub link_usage_page: u16,
    pub link_usage: u16,
}

impl ValueCap {
    /// Bits this capability occupies in its report.
    #[inline]
    pub fn total_bits(&self) -> u64 {
        u64::from(self.bit_size) * u64::from(self.report_count)
    }
}

/// One node of the link-collection tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkCollectionNode {
    pub usage_page: u16,
    pub usage: u16,
    /// Index of the parent node; the root is its own parent (index 0).
    pub parent: u16,
}

/// Report byte lengths as the OS reports them (report-id byte included).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportLengths {
    pub input: usize,
    pub output: usize,
    pub feature: usize,
    /// Top-level collection usage page / usage.
    pub usage_page: u16,
    pub usage: u16,
}

/// Queryable preparsed descriptor.
///
/// Implemented by the Windows HidP backend (which owns an OS preparsed-data
/// blob) and by [`ReportDescriptor`](super::descriptor::ReportDescriptor).
/// Implementations are shared behind an `Arc` so deferred lookups can run
/// after the record that produced them has been published.
pub trait CapsSource: Send + Sync {
    /// Global report lengths and top-level usage. Failure aborts parsing.
    fn report_lengths(&self) -> Result<ReportLengths, DescriptorError>;

    fn button_caps(&self, kind: ReportKind) -> Result<Vec<ButtonCap>, DescriptorError>;

    fn value_caps(&self, kind: ReportKind) -> Result<Vec<ValueCap>, DescriptorError>;

    fn link_collections(&self) -> Result<Vec<LinkCollectionNode>, DescriptorError>;

    /// Ask the parser to extract `(usage_page, usage)` from `report`.
    ///
    /// Returns `true` if the value could be read (its value is irrelevant).
    fn probe_input_value(&self, usage_page: u16, usage: u16, report: &[u8]) -> bool;
}
