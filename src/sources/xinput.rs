//! XInput adapter (`XInputGetCapabilities`, slots 0..4).
//!
//! XInput exposes no descriptor; counts come from the fixed gamepad layout
//! narrowed by the capability masks the driver reports.
//!
//! Slots carry no device path, so each instance gets a synthetic instance id
//! (`XINPUT\VID_xxxx&PID_xxxx&COLnn`, `nn` = slot + 1). The collection marker
//! keeps pads with the same or unknown vendor / product on distinct keys.

use crate::capability::{CapabilityRecord, Count};
use crate::device::DeviceClass;
use crate::identity::IdentityFields;
use crate::sources::InstanceFields;

pub const XINPUT_SLOTS: u32 = 4;

// XINPUT_DEVSUBTYPE_*
const SUBTYPE_WHEEL: u8 = 0x02;
const SUBTYPE_ARCADE_STICK: u8 = 0x03;
const SUBTYPE_FLIGHT_STICK: u8 = 0x04;

/// XINPUT_GAMEPAD_DPAD_{UP,DOWN,LEFT,RIGHT}
const DPAD_MASK: u16 = 0x000F;
/// XINPUT_CAPS_FFB_SUPPORTED
const CAPS_FFB_SUPPORTED: u16 = 0x0001;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XInputInstance {
    pub slot: u32,
    pub connected: bool,
    pub sub_type: u8,
    /// `XINPUT_CAPABILITIES.Flags`.
    pub flags: u16,
    /// Supported-button mask (`Gamepad.wButtons`).
    pub buttons_mask: u16,
    /// Thumb axes reported as supported (0..=4).
    pub thumb_axes: u8,
    /// Triggers reported as supported (0..=2).
    pub triggers: u8,
    /// Vendor / product, when the host could obtain them.
    pub vendor_id: u16,
    pub product_id: u16,
    /// Synthetic instance id; see [`XInputInstance::connected`].
    pub instance_id: String,
}

impl XInputInstance {
    /// A connected slot with its synthetic instance id filled in.
    pub fn connected(slot: u32, vendor_id: u16, product_id: u16) -> Self {
        Self {
            slot,
            connected: true,
            vendor_id,
            product_id,
            instance_id: format!(
                r"XINPUT\VID_{vendor_id:04X}&PID_{product_id:04X}&COL{:02X}",
                slot + 1
            ),
            ..Default::default()
        }
    }
}

impl IdentityFields for XInputInstance {
    fn structured_ids(&self) -> Option<(u32, u32)> {
        Some((u32::from(self.vendor_id), u32::from(self.product_id)))
    }

    fn instance_id(&self) -> Option<&str> {
        Some(self.instance_id.as_str()).filter(|id| !id.is_empty())
    }
}

impl InstanceFields for XInputInstance {
    fn handle(&self) -> String {
        format!("xinput:{}", self.slot)
    }

    fn name(&self) -> Option<String> {
        Some(format!("XInput Controller {}", self.slot))
    }

    fn class_hint(&self) -> Option<DeviceClass> {
        Some(match self.sub_type {
            SUBTYPE_WHEEL => DeviceClass::Wheel,
            SUBTYPE_ARCADE_STICK | SUBTYPE_FLIGHT_STICK => DeviceClass::Joystick,
            _ => DeviceClass::Gamepad,
        })
    }

    fn online(&self) -> bool {
        self.connected
    }

    fn known_caps(&self) -> Option<CapabilityRecord> {
        Some(CapabilityRecord {
            axes: Count::Measured(u32::from(self.thumb_axes) + u32::from(self.triggers)),
            buttons: (self.buttons_mask & !DPAD_MASK).count_ones(),
            povs: Count::Measured(u32::from(self.buttons_mask & DPAD_MASK != 0)),
            force_feedback: self.flags & CAPS_FFB_SUPPORTED != 0,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pad_layout() {
        let inst = XInputInstance {
            slot: 1,
            connected: true,
            sub_type: 0x01,
            buttons_mask: 0xF3FF,
            thumb_axes: 4,
            triggers: 2,
            ..Default::default()
        };
        let caps = inst.known_caps().unwrap();
        assert_eq!(caps.axes, Count::Measured(6));
        assert_eq!(caps.buttons, 10);
        assert_eq!(caps.povs, Count::Measured(1));
        assert_eq!(inst.handle(), "xinput:1");
        assert_eq!(inst.class_hint(), Some(DeviceClass::Gamepad));
    }

    #[test]
    fn slots_get_distinct_ids() {
        use crate::identity::canonical_id;

        let a = XInputInstance::connected(0, 0x045E, 0x028E);
        let b = XInputInstance::connected(1, 0x045E, 0x028E);
        assert_eq!(a.instance_id, r"XINPUT\VID_045E&PID_028E&COL01");
        assert_eq!(canonical_id(&a).to_string(), "VID_045E&PID_028E&COL_01");
        assert_eq!(canonical_id(&b).to_string(), "VID_045E&PID_028E&COL_02");

        // No product id: the vendor cannot resolve alone, the slot still separates.
        let c = XInputInstance::connected(2, 0x045E, 0);
        let d = XInputInstance::connected(3, 0x045E, 0);
        assert_eq!(canonical_id(&c).to_string(), "VID_0000&PID_0000&COL_03");
        assert_ne!(canonical_id(&c), canonical_id(&d));
    }

    #[test]
    fn wheel_subtype() {
        let inst = XInputInstance {
            sub_type: SUBTYPE_WHEEL,
            ..Default::default()
        };
        assert_eq!(inst.class_hint(), Some(DeviceClass::Wheel));
        assert!(!inst.online());
    }
}
