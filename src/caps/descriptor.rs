//! Pure-Rust HID report-descriptor decoder.
//!
//! [`ReportDescriptor::parse`] walks the raw item stream of a report
//! descriptor and produces the same capability model the Windows HID parser
//! (HidP) exposes: button caps, value caps, link-collection nodes and report
//! byte lengths. It implements [`CapsSource`], so a device whose source can
//! only hand over raw descriptor bytes is counted by the same
//! [`parse_capabilities`](super::parse_capabilities) as a HidP-backed one.
//!
//! ## Supported items
//! - Short items of every size, long items (skipped)
//! - Global state incl. Push/Pop; Report ID / Size / Count; Logical Min/Max
//! - Local Usage / Usage Min / Usage Max, 32-bit extended usages
//! - Delimiter sets (every usage after the first in a set is an alias)
//! - Nested collections → link-collection tree
//!
//! ## Layout conventions (match HidP)
//! - Report byte lengths always count one leading report-id byte, whether or
//!   not the descriptor declares report ids. A kind with no fields has length 0.
//! - Constant (padding) fields occupy bits but produce no capabilities.
//! - A data value field declared without any usage is reported as usage 0.
//! - Arrays and 1-bit variables with a `0..=1` logical range are buttons;
//!   every other variable field is a value.

use std::collections::HashMap;

use log::debug;

use crate::caps::types::{
    ButtonCap, CapsSource, LinkCollectionNode, ReportKind, ReportLengths, UsageSpec, ValueCap,
};
use crate::error::DescriptorError;

const ITEM_MAIN: u8 = 0;
const ITEM_GLOBAL: u8 = 1;
const ITEM_LOCAL: u8 = 2;

const MAIN_INPUT: u8 = 0x8;
const MAIN_OUTPUT: u8 = 0x9;
const MAIN_COLLECTION: u8 = 0xA;
const MAIN_FEATURE: u8 = 0xB;
const MAIN_END_COLLECTION: u8 = 0xC;

const GLOBAL_USAGE_PAGE: u8 = 0x0;
const GLOBAL_LOGICAL_MIN: u8 = 0x1;
const GLOBAL_LOGICAL_MAX: u8 = 0x2;
const GLOBAL_REPORT_SIZE: u8 = 0x7;
const GLOBAL_REPORT_ID: u8 = 0x8;
const GLOBAL_REPORT_COUNT: u8 = 0x9;
const GLOBAL_PUSH: u8 = 0xA;
const GLOBAL_POP: u8 = 0xB;

const LOCAL_USAGE: u8 = 0x0;
const LOCAL_USAGE_MIN: u8 = 0x1;
const LOCAL_USAGE_MAX: u8 = 0x2;
const LOCAL_DELIMITER: u8 = 0xA;

const LONG_ITEM_PREFIX: u8 = 0xFE;

const FLAG_CONSTANT: u32 = 0x01;
const FLAG_VARIABLE: u32 = 0x02;

#[derive(Clone, Debug, Default)]
struct Globals {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    report_size: u32,
    report_id: u8,
    report_count: u32,
}

/// A usage as written: either page-qualified (32-bit) or relative to the
/// usage page in effect at the main item.
#[derive(Clone, Copy, Debug)]
struct RawUsage {
    page: Option<u16>,
    usage: u16,
    alias: bool,
}

impl RawUsage {
    fn from_data(data: u32, size: usize, alias: bool) -> Self {
        if size == 4 {
            RawUsage {
                page: Some((data >> 16) as u16),
                usage: (data & 0xFFFF) as u16,
                alias,
            }
        } else {
            RawUsage {
                page: None,
                usage: (data & 0xFFFF) as u16,
                alias,
            }
        }
    }

    fn page_or(&self, global: u16) -> u16 {
        self.page.unwrap_or(global)
    }
}

#[derive(Debug, Default)]
struct Locals {
    usages: Vec<RawUsage>,
    usage_min: Option<RawUsage>,
    usage_max: Option<RawUsage>,
    in_delimiter: bool,
    delimiter_seen: bool,
}

impl Locals {
    fn first_usage(&self) -> Option<RawUsage> {
        self.usages.first().copied().or(self.usage_min)
    }
}

#[derive(Clone, Copy)]
struct Item<'a> {
    offset: usize,
    kind: u8,
    tag: u8,
    data: &'a [u8],
}

impl Item<'_> {
    fn unsigned(&self) -> u32 {
        self.data
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
    }

    fn signed(&self) -> i32 {
        match self.data.len() {
            1 => i32::from(self.data[0] as i8),
            2 => i32::from(i16::from_le_bytes([self.data[0], self.data[1]])),
            4 => self.unsigned() as i32,
            _ => 0,
        }
    }
}

/// Split a descriptor into items, skipping long items.
fn items(bytes: &[u8]) -> Result<Vec<Item<'_>>, DescriptorError> {
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let prefix = bytes[i];
        if prefix == LONG_ITEM_PREFIX {
            let size = usize::from(*bytes.get(i + 1).ok_or(DescriptorError::Truncated { offset: i })?);
            let end = i + 3 + size;
            if end > bytes.len() {
                return Err(DescriptorError::Truncated { offset: i });
            }
            i = end;
            continue;
        }

        let size = match prefix & 0x03 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };
        let data = bytes
            .get(i + 1..i + 1 + size)
            .ok_or(DescriptorError::Truncated { offset: i })?;
        out.push(Item {
            offset: i,
            kind: (prefix >> 2) & 0x03,
            tag: prefix >> 4,
            data,
        });
        i += 1 + size;
    }
    Ok(out)
}

/// Decoded report descriptor.
#[derive(Clone, Debug, Default)]
pub struct ReportDescriptor {
    lengths: ReportLengths,
    buttons: HashMap<ReportKind, Vec<ButtonCap>>,
    values: HashMap<ReportKind, Vec<ValueCap>>,
    links: Vec<LinkCollectionNode>,
    uses_report_ids: bool,
}

#[derive(Default)]
struct Builder {
    globals: Globals,
    stack: Vec<Globals>,
    locals: Locals,
    collections: Vec<u16>,
    out: ReportDescriptor,
    bits: HashMap<(ReportKind, u8), u64>,
}

impl ReportDescriptor {
    /// Decode raw report-descriptor bytes.
    ///
    /// ### Errors
    /// Truncated items, a Pop without a Push, and unbalanced collections.
    pub fn parse(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let mut b = Builder::default();

        for item in items(bytes)? {
            match item.kind {
                ITEM_MAIN => b.main(&item)?,
                ITEM_GLOBAL => b.global(&item)?,
                ITEM_LOCAL => b.local(&item),
                _ => {}
            }
        }

        if !b.collections.is_empty() {
            return Err(DescriptorError::UnbalancedCollection {
                offset: bytes.len(),
            });
        }

        let len_of = |kind: ReportKind| -> usize {
            b.bits
                .iter()
                .filter(|((k, _), _)| *k == kind)
                .map(|(_, &bits)| bits)
                .max()
                .map_or(0, |bits| 1 + usize::try_from(bits.div_ceil(8)).unwrap_or(usize::MAX))
        };
        b.out.lengths.input = len_of(ReportKind::Input);
        b.out.lengths.output = len_of(ReportKind::Output);
        b.out.lengths.feature = len_of(ReportKind::Feature);

        debug!(
            "[DESC] {} link collections, input_len={} output_len={} report_ids={}",
            b.out.links.len(),
            b.out.lengths.input,
            b.out.lengths.output,
            b.out.uses_report_ids
        );
        Ok(b.out)
    }

    /// `true` if the descriptor declares any non-zero report id.
    pub fn uses_report_ids(&self) -> bool {
        self.uses_report_ids
    }

    fn caps_of<T: Clone>(map: &HashMap<ReportKind, Vec<T>>, kind: ReportKind) -> Vec<T> {
        map.get(&kind).cloned().unwrap_or_default()
    }
}

impl Builder {
    fn global(&mut self, item: &Item<'_>) -> Result<(), DescriptorError> {
        match item.tag {
            GLOBAL_USAGE_PAGE => self.globals.usage_page = (item.unsigned() & 0xFFFF) as u16,
            GLOBAL_LOGICAL_MIN => self.globals.logical_min = item.signed(),
            GLOBAL_LOGICAL_MAX => {
                // A negative max with a non-negative min is really unsigned.
                let signed = item.signed();
                self.globals.logical_max = if signed < self.globals.logical_min {
                    item.unsigned().min(i32::MAX as u32) as i32
                } else {
                    signed
                };
            }
            GLOBAL_REPORT_SIZE => self.globals.report_size = item.unsigned(),
            GLOBAL_REPORT_ID => {
                self.globals.report_id = (item.unsigned() & 0xFF) as u8;
                if self.globals.report_id != 0 {
                    self.out.uses_report_ids = true;
                }
            }
            GLOBAL_REPORT_COUNT => self.globals.report_count = item.unsigned(),
            GLOBAL_PUSH => self.stack.push(self.globals.clone()),
            GLOBAL_POP => {
                self.globals = self
                    .stack
                    .pop()
                    .ok_or(DescriptorError::StackUnderflow {
                        offset: item.offset,
                    })?;
            }
            _ => {}
        }
        Ok(())
    }

    fn local(&mut self, item: &Item<'_>) {
        let size = item.data.len();
        match item.tag {
            LOCAL_USAGE => {
                let alias = self.locals.in_delimiter && self.locals.delimiter_seen;
                self.locals
                    .usages
                    .push(RawUsage::from_data(item.unsigned(), size, alias));
                if self.locals.in_delimiter {
                    self.locals.delimiter_seen = true;
                }
            }
            LOCAL_USAGE_MIN => {
                self.locals.usage_min = Some(RawUsage::from_data(item.unsigned(), size, false));
            }
            LOCAL_USAGE_MAX => {
                self.locals.usage_max = Some(RawUsage::from_data(item.unsigned(), size, false));
            }
            LOCAL_DELIMITER => {
                self.locals.in_delimiter = item.unsigned() == 1;
                self.locals.delimiter_seen = false;
            }
            _ => {}
        }
    }

    fn main(&mut self, item: &Item<'_>) -> Result<(), DescriptorError> {
        match item.tag {
            MAIN_COLLECTION => {
                let idx = self.out.links.len() as u16;
                let parent = self.collections.last().copied().unwrap_or(0);
                let (usage_page, usage) = self
                    .locals
                    .first_usage()
                    .map_or((self.globals.usage_page, 0), |u| {
                        (u.page_or(self.globals.usage_page), u.usage)
                    });
                if self.out.links.is_empty() {
                    self.out.lengths.usage_page = usage_page;
                    self.out.lengths.usage = usage;
                }
                self.out.links.push(LinkCollectionNode {
                    usage_page,
                    usage,
                    parent,
                });
                self.collections.push(idx);
            }
            MAIN_END_COLLECTION => {
                self.collections
                    .pop()
                    .ok_or(DescriptorError::UnbalancedCollection {
                        offset: item.offset,
                    })?;
            }
            MAIN_INPUT => self.field(ReportKind::Input, item.unsigned()),
            MAIN_OUTPUT => self.field(ReportKind::Output, item.unsigned()),
            MAIN_FEATURE => self.field(ReportKind::Feature, item.unsigned()),
            _ => {}
        }
        self.locals = Locals::default();
        Ok(())
    }

    fn field(&mut self, kind: ReportKind, flags: u32) {
        let g = &self.globals;
        let bits = u64::from(g.report_size) * u64::from(g.report_count);
        *self.bits.entry((kind, g.report_id)).or_insert(0) += bits;

        if flags & FLAG_CONSTANT != 0 || bits == 0 {
            return;
        }

        let link_collection = self.collections.last().copied().unwrap_or(0);
        let (link_usage_page, link_usage) = self
            .out
            .links
            .get(usize::from(link_collection))
            .map_or((0, 0), |n| (n.usage_page, n.usage));

        let variable = flags & FLAG_VARIABLE != 0;
        let is_button = !variable
            || (g.report_size == 1 && g.logical_min >= 0 && g.logical_max <= 1);

        let range = match (self.locals.usage_min, self.locals.usage_max) {
            (Some(lo), Some(hi)) => Some((
                lo.page_or(g.usage_page),
                UsageSpec::Range {
                    min: lo.usage,
                    max: hi.usage,
                },
            )),
            _ => None,
        };

        let mut specs: Vec<(u16, UsageSpec, bool, u16)> = Vec::new();
        let count = u16::try_from(g.report_count).unwrap_or(u16::MAX);
        if let Some((page, spec)) = range {
            specs.push((page, spec, false, count));
        } else if !is_button && self.locals.usages.is_empty() {
            // Unnamed data field: HidP still reports it, as usage 0.
            specs.push((g.usage_page, UsageSpec::Single(0), false, count.max(1)));
        } else if is_button {
            for u in &self.locals.usages {
                specs.push((u.page_or(g.usage_page), UsageSpec::Single(u.usage), u.alias, 1));
            }
        } else {
            // One value cap per primary usage; the last absorbs the remaining count.
            let primaries: Vec<&RawUsage> = self
                .locals
                .usages
                .iter()
                .filter(|u| !u.alias)
                .take(usize::from(count.max(1)))
                .collect();
            let n = primaries.len() as u16;
            for (j, u) in primaries.iter().enumerate() {
                let reps = if j as u16 + 1 == n {
                    count.saturating_sub(n - 1).max(1)
                } else {
                    1
                };
                specs.push((u.page_or(g.usage_page), UsageSpec::Single(u.usage), false, reps));
            }
            for u in self.locals.usages.iter().filter(|u| u.alias) {
                specs.push((u.page_or(g.usage_page), UsageSpec::Single(u.usage), true, 1));
            }
        }

        for (usage_page, usage, is_alias, report_count) in specs {
            if is_button {
                self.out.buttons.entry(kind).or_default().push(ButtonCap {
                    usage_page,
                    usage,
                    report_id: g.report_id,
                    is_alias,
                    link_collection,
                    link_usage_page,
                    link_usage,
                });
            } else {
                self.out.values.entry(kind).or_default().push(ValueCap {
                    usage_page,
                    usage,
                    report_id: g.report_id,
                    is_alias,
                    bit_size: u16::try_from(g.report_size).unwrap_or(u16::MAX),
                    report_count,
                    logical_min: g.logical_min,
                    logical_max: g.logical_max,
                    link_collection,
                    link_usage_page,
                    link_usage,
                });
            }
        }
    }
}

impl CapsSource for ReportDescriptor {
    fn report_lengths(&self) -> Result<ReportLengths, DescriptorError> {
        Ok(self.lengths)
    }

    fn button_caps(&self, kind: ReportKind) -> Result<Vec<ButtonCap>, DescriptorError> {
        Ok(Self::caps_of(&self.buttons, kind))
    }

    fn value_caps(&self, kind: ReportKind) -> Result<Vec<ValueCap>, DescriptorError> {
        Ok(Self::caps_of(&self.values, kind))
    }

    fn link_collections(&self) -> Result<Vec<LinkCollectionNode>, DescriptorError> {
        Ok(self.links.clone())
    }

    fn probe_input_value(&self, usage_page: u16, usage: u16, report: &[u8]) -> bool {
        if self.lengths.input == 0 || report.len() != self.lengths.input {
            return false;
        }
        let rid = report[0];
        if !self.uses_report_ids && rid != 0 {
            return false;
        }
        self.values
            .get(&ReportKind::Input)
            .into_iter()
            .flatten()
            .filter(|c| c.usage_page == usage_page && c.report_id == rid)
            .any(|c| match c.usage {
                UsageSpec::Single(u) => u == usage,
                UsageSpec::Range { min, max } => (min..=max).contains(&usage),
            })
    }
}
