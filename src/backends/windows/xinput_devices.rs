//! XInput source: `XInputGetCapabilities` over the four user slots.
//!
//! XInput does not report vendor / product ids. Slots are tagged with the
//! Microsoft vendor id and product 0; the slot number in the synthetic
//! instance id keeps each pad on its own key.

#![cfg(target_os = "windows")]

use log::debug;
use windows_sys::Win32::Foundation::ERROR_SUCCESS;
use windows_sys::Win32::UI::Input::XboxController::*;

use crate::device::DescriptorHandle;
use crate::error::SourceError;
use crate::sources::xinput::{XInputInstance, XINPUT_SLOTS};
use crate::sources::{EnumerationSource, SourceKind};

const MICROSOFT_VID: u16 = 0x045E;

#[derive(Debug, Default)]
pub struct XInputSource;

impl XInputSource {
    pub fn new() -> Self {
        Self
    }
}

fn query_slot(slot: u32) -> Option<XInputInstance> {
    let mut caps: XINPUT_CAPABILITIES = unsafe { core::mem::zeroed() };
    let res = unsafe { XInputGetCapabilities(slot, 0, &mut caps) };
    if res != ERROR_SUCCESS {
        return None;
    }

    let pad = caps.Gamepad;
    let thumbs = [pad.sThumbLX, pad.sThumbLY, pad.sThumbRX, pad.sThumbRY]
        .iter()
        .filter(|v| **v != 0)
        .count() as u8;
    let triggers = u8::from(pad.bLeftTrigger != 0) + u8::from(pad.bRightTrigger != 0);

    Some(XInputInstance {
        sub_type: caps.SubType as u8,
        flags: caps.Flags as u16,
        buttons_mask: pad.wButtons as u16,
        thumb_axes: thumbs,
        triggers,
        ..XInputInstance::connected(slot, MICROSOFT_VID, 0)
    })
}

impl EnumerationSource for XInputSource {
    type Instance = XInputInstance;

    fn kind(&self) -> SourceKind {
        SourceKind::XInput
    }

    fn list_instances(&mut self) -> Result<Vec<XInputInstance>, SourceError> {
        let slots: Vec<_> = (0..XINPUT_SLOTS).filter_map(query_slot).collect();
        debug!("[SOURCE] xinput: {} connected slot(s)", slots.len());
        Ok(slots)
    }

    fn descriptor(
        &mut self,
        _instance: &XInputInstance,
    ) -> Result<Option<DescriptorHandle>, SourceError> {
        Ok(None)
    }
}
