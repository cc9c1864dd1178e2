//! HID adapter (hidapi device list + HidP preparsed data).

use crate::device::DeviceClass;
use crate::identity::IdentityFields;
use crate::sources::InstanceFields;

/// One entry of the HID device list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HidInstance {
    /// Device interface path (`\\?\HID#VID_...#{4d1e55b2-...}`).
    pub path: String,
    pub product_string: Option<String>,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Top-level collection usage page / usage.
    pub usage_page: u16,
    pub usage: u16,
}

impl IdentityFields for HidInstance {
    fn structured_ids(&self) -> Option<(u32, u32)> {
        Some((u32::from(self.vendor_id), u32::from(self.product_id)))
    }

    fn interface_path(&self) -> Option<&str> {
        Some(&self.path)
    }
}

impl InstanceFields for HidInstance {
    fn handle(&self) -> String {
        self.path.clone()
    }

    fn name(&self) -> Option<String> {
        self.product_string.clone()
    }

    fn class_hint(&self) -> Option<DeviceClass> {
        (self.usage_page != 0).then(|| DeviceClass::from_usage(self.usage_page, self.usage))
    }
}
