//! Raw Input adapter (`GetRawInputDeviceList` + `RIDI_DEVICEINFO`).
//!
//! Raw Input never reports a product name; entries from this source are the
//! usual recipients of registry name decoration.

use crate::device::DeviceClass;
use crate::identity::IdentityFields;
use crate::sources::InstanceFields;

/// `RID_DEVICE_INFO` payload, reduced to what identity needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawDeviceType {
    Mouse,
    Keyboard,
    Hid {
        vendor_id: u32,
        product_id: u32,
        usage_page: u16,
        usage: u16,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawInputInstance {
    /// Raw Input device handle value.
    pub handle: usize,
    /// `RIDI_DEVICENAME`, a device interface path.
    pub device_name: String,
    pub device_type: RawDeviceType,
}

impl IdentityFields for RawInputInstance {
    fn structured_ids(&self) -> Option<(u32, u32)> {
        match self.device_type {
            RawDeviceType::Hid {
                vendor_id,
                product_id,
                ..
            } => Some((vendor_id, product_id)),
            _ => None,
        }
    }

    fn interface_path(&self) -> Option<&str> {
        (!self.device_name.is_empty()).then_some(self.device_name.as_str())
    }
}

impl InstanceFields for RawInputInstance {
    fn handle(&self) -> String {
        format!("{:#010x}", self.handle)
    }

    fn name(&self) -> Option<String> {
        None
    }

    fn class_hint(&self) -> Option<DeviceClass> {
        Some(match self.device_type {
            RawDeviceType::Mouse => DeviceClass::Mouse,
            RawDeviceType::Keyboard => DeviceClass::Keyboard,
            RawDeviceType::Hid {
                usage_page, usage, ..
            } => DeviceClass::from_usage(usage_page, usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::canonical_id;

    #[test]
    fn keyboard_ids_come_from_device_name() {
        let inst = RawInputInstance {
            handle: 0x0001_0043,
            device_name: r"\\?\HID#VID_046D&PID_C52B&MI_00#8&1#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}".into(),
            device_type: RawDeviceType::Keyboard,
        };
        assert_eq!(canonical_id(&inst).to_string(), "VID_046D&PID_C52B");
        assert_eq!(inst.class_hint(), Some(DeviceClass::Keyboard));
        assert_eq!(inst.handle(), "0x00010043");
        assert_eq!(inst.name(), None);
    }
}
