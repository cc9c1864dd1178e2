#![cfg(target_os = "windows")]
//! HidP-backed [`CapsSource`].
//!
//! Wraps a preparsed-data blob obtained either from a device path
//! (`HidD_GetPreparsedData`) or from Raw Input (`RIDI_PREPARSEDDATA`), and
//! answers the capability queries with the `HidP_*` calls. The blob is freed
//! when the last [`DescriptorHandle`](crate::device::DescriptorHandle)
//! sharing it is dropped.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

use log::debug;
use windows_sys::Win32::Devices::HumanInterfaceDevice::*;
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE, NTSTATUS,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};

use crate::caps::types::{
    ButtonCap, CapsSource, LinkCollectionNode, ReportKind, ReportLengths, UsageSpec, ValueCap,
};
use crate::error::DescriptorError;

const STATUS_SUCCESS: NTSTATUS = HIDP_STATUS_SUCCESS;
const STATUS_BUFFER_TOO_SMALL: NTSTATUS = HIDP_STATUS_BUFFER_TOO_SMALL;

/// Initial capacity for caps queries; retried at the reported size.
const CAPS_GUESS: u16 = 64;

enum Storage {
    /// Allocated by `HidD_GetPreparsedData`, freed with `HidD_FreePreparsedData`.
    Os(PHIDP_PREPARSED_DATA),
    /// Copied out of Raw Input; `u64` elements keep the blob 8-byte aligned.
    Buffer(Vec<u64>),
}

pub struct HidpDescriptor {
    storage: Storage,
}

// The blob is immutable after construction and HidP only reads it.
unsafe impl Send for HidpDescriptor {}
unsafe impl Sync for HidpDescriptor {}

impl Drop for HidpDescriptor {
    fn drop(&mut self) {
        if let Storage::Os(ppd) = self.storage {
            if ppd != 0 {
                unsafe { HidD_FreePreparsedData(ppd) };
            }
        }
    }
}

impl HidpDescriptor {
    /// Open the device at `path` and take its preparsed data.
    ///
    /// The device handle is closed before returning; preparsed data stays
    /// valid on its own.
    pub fn from_path(path: &str) -> Result<Self, DescriptorError> {
        let handle = open_device_handle(path)
            .map_err(|code| DescriptorError::Unavailable(format!("open failed (error {code})")))?;

        let mut ppd: PHIDP_PREPARSED_DATA = 0;
        let ok = unsafe { HidD_GetPreparsedData(handle, &mut ppd) };
        unsafe { CloseHandle(handle) };
        if ok == 0 || ppd == 0 {
            return Err(DescriptorError::Unavailable(
                "HidD_GetPreparsedData failed".into(),
            ));
        }

        let desc = Self {
            storage: Storage::Os(ppd),
        };
        desc.report_lengths()?;
        Ok(desc)
    }

    /// Adopt a preparsed-data blob copied from `RIDI_PREPARSEDDATA`.
    pub fn from_buffer(buf: Vec<u64>) -> Result<Self, DescriptorError> {
        if buf.is_empty() {
            return Err(DescriptorError::Unavailable("empty preparsed data".into()));
        }
        let desc = Self {
            storage: Storage::Buffer(buf),
        };
        desc.report_lengths()?;
        Ok(desc)
    }

    fn ppd(&self) -> PHIDP_PREPARSED_DATA {
        match &self.storage {
            Storage::Os(ppd) => *ppd,
            Storage::Buffer(buf) => buf.as_ptr() as PHIDP_PREPARSED_DATA,
        }
    }

    fn raw_button_caps(&self, kind: ReportKind) -> Result<Vec<HIDP_BUTTON_CAPS>, DescriptorError> {
        let report_type = report_type(kind);
        let ppd = self.ppd();
        let mut len = CAPS_GUESS;
        loop {
            let mut caps: Vec<HIDP_BUTTON_CAPS> = vec![unsafe { core::mem::zeroed() }; len as usize];
            let mut needed = len;
            let status =
                unsafe { HidP_GetButtonCaps(report_type, caps.as_mut_ptr(), &mut needed, ppd) };
            match status {
                STATUS_SUCCESS => {
                    caps.truncate(needed as usize);
                    return Ok(caps);
                }
                STATUS_BUFFER_TOO_SMALL if needed > len => len = needed,
                // No caps of this report type.
                HIDP_STATUS_USAGE_NOT_FOUND => return Ok(Vec::new()),
                _ => return Err(hidp_error("HidP_GetButtonCaps", status)),
            }
        }
    }

    fn raw_value_caps(&self, kind: ReportKind) -> Result<Vec<HIDP_VALUE_CAPS>, DescriptorError> {
        let report_type = report_type(kind);
        let ppd = self.ppd();
        let mut len = CAPS_GUESS;
        loop {
            let mut caps: Vec<HIDP_VALUE_CAPS> = vec![unsafe { core::mem::zeroed() }; len as usize];
            let mut needed = len;
            let status =
                unsafe { HidP_GetValueCaps(report_type, caps.as_mut_ptr(), &mut needed, ppd) };
            match status {
                STATUS_SUCCESS => {
                    caps.truncate(needed as usize);
                    return Ok(caps);
                }
                STATUS_BUFFER_TOO_SMALL if needed > len => len = needed,
                HIDP_STATUS_USAGE_NOT_FOUND => return Ok(Vec::new()),
                _ => return Err(hidp_error("HidP_GetValueCaps", status)),
            }
        }
    }
}

impl CapsSource for HidpDescriptor {
    fn report_lengths(&self) -> Result<ReportLengths, DescriptorError> {
        let mut caps: HIDP_CAPS = unsafe { core::mem::zeroed() };
        let status = unsafe { HidP_GetCaps(self.ppd(), &mut caps) };
        if status != STATUS_SUCCESS {
            return Err(hidp_error("HidP_GetCaps", status));
        }
        Ok(ReportLengths {
            input: usize::from(caps.InputReportByteLength),
            output: usize::from(caps.OutputReportByteLength),
            feature: usize::from(caps.FeatureReportByteLength),
            usage_page: caps.UsagePage,
            usage: caps.Usage,
        })
    }

    fn button_caps(&self, kind: ReportKind) -> Result<Vec<ButtonCap>, DescriptorError> {
        Ok(self
            .raw_button_caps(kind)?
            .iter()
            .map(|c| ButtonCap {
                usage_page: c.UsagePage,
                usage: unsafe {
                    if c.IsRange != 0 {
                        UsageSpec::Range {
                            min: c.Anonymous.Range.UsageMin,
                            max: c.Anonymous.Range.UsageMax,
                        }
                    } else {
                        UsageSpec::Single(c.Anonymous.NotRange.Usage)
                    }
                },
                report_id: c.ReportID,
                is_alias: c.IsAlias != 0,
                link_collection: c.LinkCollection,
                link_usage_page: c.LinkUsagePage,
                link_usage: c.LinkUsage,
            })
            .collect())
    }

    fn value_caps(&self, kind: ReportKind) -> Result<Vec<ValueCap>, DescriptorError> {
        Ok(self
            .raw_value_caps(kind)?
            .iter()
            .map(|c| ValueCap {
                usage_page: c.UsagePage,
                usage: unsafe {
                    if c.IsRange != 0 {
                        UsageSpec::Range {
                            min: c.Anonymous.Range.UsageMin,
                            max: c.Anonymous.Range.UsageMax,
                        }
                    } else {
                        UsageSpec::Single(c.Anonymous.NotRange.Usage)
                    }
                },
                report_id: c.ReportID,
                is_alias: c.IsAlias != 0,
                bit_size: c.BitSize,
                report_count: c.ReportCount,
                logical_min: c.LogicalMin,
                logical_max: c.LogicalMax,
                link_collection: c.LinkCollection,
                link_usage_page: c.LinkUsagePage,
                link_usage: c.LinkUsage,
            })
            .collect())
    }

    fn link_collections(&self) -> Result<Vec<LinkCollectionNode>, DescriptorError> {
        let mut len: u32 = u32::from(CAPS_GUESS);
        loop {
            let mut nodes: Vec<HIDP_LINK_COLLECTION_NODE> =
                vec![unsafe { core::mem::zeroed() }; len as usize];
            let mut needed = len;
            let status =
                unsafe { HidP_GetLinkCollectionNodes(nodes.as_mut_ptr(), &mut needed, self.ppd()) };
            match status {
                STATUS_SUCCESS => {
                    nodes.truncate(needed as usize);
                    return Ok(nodes
                        .iter()
                        .map(|n| LinkCollectionNode {
                            usage_page: n.LinkUsagePage,
                            usage: n.LinkUsage,
                            parent: n.Parent,
                        })
                        .collect());
                }
                STATUS_BUFFER_TOO_SMALL if needed > len => len = needed,
                _ => return Err(hidp_error("HidP_GetLinkCollectionNodes", status)),
            }
        }
    }

    fn probe_input_value(&self, usage_page: u16, usage: u16, report: &[u8]) -> bool {
        let Ok(report_len) = u32::try_from(report.len()) else {
            return false;
        };
        let mut value: u32 = 0;
        // Link collection 0 matches the usage in any collection.
        let status = unsafe {
            HidP_GetUsageValue(
                HidP_Input,
                usage_page,
                0,
                usage,
                &mut value,
                self.ppd(),
                report.as_ptr(),
                report_len,
            )
        };
        if status != STATUS_SUCCESS {
            debug!(
                "[HIDP] probe up=0x{usage_page:02x} u=0x{usage:02x} status=0x{:08x}",
                status as u32
            );
        }
        status == STATUS_SUCCESS
    }
}

fn report_type(kind: ReportKind) -> HIDP_REPORT_TYPE {
    match kind {
        ReportKind::Input => HidP_Input,
        ReportKind::Output => HidP_Output,
        ReportKind::Feature => HidP_Feature,
    }
}

fn hidp_error(call: &'static str, status: NTSTATUS) -> DescriptorError {
    DescriptorError::Hidp {
        call,
        status: status as u32,
    }
}

/// Open a HID device path for descriptor queries.
///
/// Tries read/write first, then read-only (some devices are opened
/// exclusively by their driver). Returns `Err(GetLastError())` on failure.
fn open_device_handle(path: &str) -> Result<HANDLE, u32> {
    use std::ptr::{null, null_mut};

    let wide: Vec<u16> = OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let try_open = |access: u32| unsafe {
        CreateFileW(
            wide.as_ptr(),
            access,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            null(),
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            null_mut(),
        )
    };

    let mut handle = try_open(GENERIC_READ | GENERIC_WRITE);
    if handle == INVALID_HANDLE_VALUE {
        handle = try_open(GENERIC_READ);
    }

    if handle == INVALID_HANDLE_VALUE {
        Err(unsafe { GetLastError() })
    } else {
        Ok(handle)
    }
}
