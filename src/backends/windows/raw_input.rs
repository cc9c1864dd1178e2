//! Raw Input source: `GetRawInputDeviceList` + `GetRawInputDeviceInfoW`.

#![cfg(target_os = "windows")]

use core::ffi::c_void;
use core::mem::size_of;

use log::debug;
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::UI::Input::*;

use crate::backends::windows::hidp::HidpDescriptor;
use crate::device::DescriptorHandle;
use crate::error::{DescriptorError, SourceError};
use crate::sources::raw_input::{RawDeviceType, RawInputInstance};
use crate::sources::{EnumerationSource, SourceKind};

#[derive(Debug, Default)]
pub struct RawInputSource;

impl RawInputSource {
    pub fn new() -> Self {
        Self
    }
}

fn unavailable(reason: &str) -> SourceError {
    SourceError::Unavailable {
        kind: SourceKind::RawInput,
        reason: reason.to_owned(),
    }
}

fn device_list() -> Result<Vec<RAWINPUTDEVICELIST>, SourceError> {
    let entry = size_of::<RAWINPUTDEVICELIST>() as u32;
    let mut count: u32 = 0;
    let r0 = unsafe { GetRawInputDeviceList(core::ptr::null_mut(), &mut count, entry) };
    if r0 == u32::MAX {
        return Err(unavailable("GetRawInputDeviceList size query failed"));
    }

    let mut list: Vec<RAWINPUTDEVICELIST> = vec![unsafe { core::mem::zeroed() }; count as usize];
    let r1 = unsafe { GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry) };
    if r1 == u32::MAX {
        return Err(unavailable("GetRawInputDeviceList failed"));
    }
    list.truncate(r1 as usize);
    Ok(list)
}

/// `RIDI_DEVICENAME`: the device interface path.
fn device_name(hdev: HANDLE) -> Option<String> {
    let mut size: u32 = 0;
    let r0 =
        unsafe { GetRawInputDeviceInfoW(hdev, RIDI_DEVICENAME, core::ptr::null_mut(), &mut size) };
    if r0 == u32::MAX || size == 0 {
        return None;
    }

    let mut wide: Vec<u16> = vec![0u16; size as usize];
    let r1 = unsafe {
        GetRawInputDeviceInfoW(hdev, RIDI_DEVICENAME, wide.as_mut_ptr() as *mut c_void, &mut size)
    };
    if r1 == u32::MAX {
        return None;
    }

    while wide.last() == Some(&0) {
        wide.pop();
    }
    Some(String::from_utf16_lossy(&wide))
}

/// `RIDI_DEVICEINFO`, reduced to [`RawDeviceType`].
fn device_type(hdev: HANDLE) -> Option<RawDeviceType> {
    let mut info: RID_DEVICE_INFO = unsafe { core::mem::zeroed() };
    info.cbSize = size_of::<RID_DEVICE_INFO>() as u32;
    let mut size = info.cbSize;
    let r = unsafe {
        GetRawInputDeviceInfoW(
            hdev,
            RIDI_DEVICEINFO,
            &mut info as *mut RID_DEVICE_INFO as *mut c_void,
            &mut size,
        )
    };
    if r == u32::MAX {
        return None;
    }

    Some(match info.dwType {
        RIM_TYPEMOUSE => RawDeviceType::Mouse,
        RIM_TYPEKEYBOARD => RawDeviceType::Keyboard,
        _ => {
            let hid = unsafe { info.Anonymous.hid };
            RawDeviceType::Hid {
                vendor_id: hid.dwVendorId,
                product_id: hid.dwProductId,
                usage_page: hid.usUsagePage,
                usage: hid.usUsage,
            }
        }
    })
}

/// `RIDI_PREPARSEDDATA`, copied into an 8-byte aligned buffer.
fn preparsed_data(hdev: HANDLE) -> Result<Vec<u64>, DescriptorError> {
    let mut size: u32 = 0;
    let r0 = unsafe {
        GetRawInputDeviceInfoW(hdev, RIDI_PREPARSEDDATA, core::ptr::null_mut(), &mut size)
    };
    if r0 == u32::MAX || size == 0 {
        return Err(DescriptorError::Unavailable(
            "RIDI_PREPARSEDDATA size query failed".into(),
        ));
    }

    let words = (size as usize).div_ceil(size_of::<u64>());
    let mut buf = vec![0u64; words];
    let r1 = unsafe {
        GetRawInputDeviceInfoW(hdev, RIDI_PREPARSEDDATA, buf.as_mut_ptr() as *mut c_void, &mut size)
    };
    if r1 == u32::MAX {
        return Err(DescriptorError::Unavailable("RIDI_PREPARSEDDATA failed".into()));
    }
    Ok(buf)
}

impl EnumerationSource for RawInputSource {
    type Instance = RawInputInstance;

    fn kind(&self) -> SourceKind {
        SourceKind::RawInput
    }

    fn list_instances(&mut self) -> Result<Vec<RawInputInstance>, SourceError> {
        let list = device_list()?;
        let mut out = Vec::with_capacity(list.len());
        for dev in list {
            // A device can disappear between the list and the info query.
            let Some(device_type) = device_type(dev.hDevice) else {
                debug!("[SOURCE] raw_input: {:?} vanished during enumeration", dev.hDevice);
                continue;
            };
            out.push(RawInputInstance {
                handle: dev.hDevice as usize,
                device_name: device_name(dev.hDevice).unwrap_or_default(),
                device_type,
            });
        }
        Ok(out)
    }

    fn descriptor(
        &mut self,
        instance: &RawInputInstance,
    ) -> Result<Option<DescriptorHandle>, SourceError> {
        if !matches!(instance.device_type, RawDeviceType::Hid { .. }) {
            return Ok(None);
        }
        let buf = preparsed_data(instance.handle as HANDLE)?;
        let desc = HidpDescriptor::from_buffer(buf)?;
        Ok(Some(DescriptorHandle::new(desc)))
    }
}
