//! DirectInput adapter.
//!
//! DirectInput is a COM surface; the host enumerates it (`EnumDevices` plus
//! `DIPROP_GUIDANDPATH`) and hands the results to a
//! [`StaticSource`](crate::sources::StaticSource). It is the one source that
//! reliably reports a product name.

use crate::device::DeviceClass;
use crate::identity::IdentityFields;
use crate::sources::InstanceFields;

// DI8DEVTYPE_* (low byte of dwDevType).
const DI8DEVTYPE_MOUSE: u32 = 0x12;
const DI8DEVTYPE_KEYBOARD: u32 = 0x13;
const DI8DEVTYPE_JOYSTICK: u32 = 0x14;
const DI8DEVTYPE_GAMEPAD: u32 = 0x15;
const DI8DEVTYPE_DRIVING: u32 = 0x16;
const DI8DEVTYPE_FLIGHT: u32 = 0x17;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectInputInstance {
    /// `guidInstance`, formatted by the host.
    pub instance_guid: String,
    /// `guidProduct` bytes in memory order.
    pub product_guid: [u8; 16],
    pub instance_name: String,
    pub product_name: String,
    pub dev_type: u32,
    /// `DIPROP_GUIDANDPATH` path, when the host could read it.
    pub interface_path: Option<String>,
}

impl IdentityFields for DirectInputInstance {
    fn interface_path(&self) -> Option<&str> {
        self.interface_path.as_deref()
    }

    fn product_guid(&self) -> Option<[u8; 16]> {
        Some(self.product_guid)
    }
}

impl InstanceFields for DirectInputInstance {
    fn handle(&self) -> String {
        self.instance_guid.clone()
    }

    fn name(&self) -> Option<String> {
        [&self.product_name, &self.instance_name]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .cloned()
    }

    fn class_hint(&self) -> Option<DeviceClass> {
        match self.dev_type & 0xFF {
            DI8DEVTYPE_MOUSE => Some(DeviceClass::Mouse),
            DI8DEVTYPE_KEYBOARD => Some(DeviceClass::Keyboard),
            DI8DEVTYPE_JOYSTICK | DI8DEVTYPE_FLIGHT => Some(DeviceClass::Joystick),
            DI8DEVTYPE_GAMEPAD => Some(DeviceClass::Gamepad),
            DI8DEVTYPE_DRIVING => Some(DeviceClass::Wheel),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{resolve_ids, IdMethod};

    fn pad() -> DirectInputInstance {
        let mut guid = [0u8; 16];
        guid[..4].copy_from_slice(&0xC21D_046Du32.to_le_bytes());
        DirectInputInstance {
            instance_guid: "{8a3f1e20-0000-11ee-8001-444553540000}".into(),
            product_guid: guid,
            instance_name: "Controller (F310)".into(),
            product_name: "Logitech Gamepad F310".into(),
            dev_type: 0x0115,
            interface_path: None,
        }
    }

    #[test]
    fn product_guid_is_last_resort() {
        let ids = resolve_ids(&pad());
        assert_eq!((ids.vendor, ids.product), (0x046D, 0xC21D));
        assert_eq!(ids.method, IdMethod::ProductGuid);
    }

    #[test]
    fn path_beats_guid() {
        let inst = DirectInputInstance {
            interface_path: Some(r"\\?\HID#VID_046D&PID_C216#7&1".into()),
            ..pad()
        };
        assert_eq!(resolve_ids(&inst).product, 0xC216);
    }

    #[test]
    fn name_and_class() {
        let mut inst = pad();
        assert_eq!(inst.name().as_deref(), Some("Logitech Gamepad F310"));
        assert_eq!(inst.class_hint(), Some(DeviceClass::Gamepad));
        inst.product_name.clear();
        assert_eq!(inst.name().as_deref(), Some("Controller (F310)"));
    }
}
