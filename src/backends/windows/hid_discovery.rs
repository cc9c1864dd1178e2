//! HID source: `hidapi` device list + HidP preparsed data.

#![cfg(target_os = "windows")]

use hidapi::{DeviceInfo, HidApi};
use log::debug;

use crate::backends::windows::hidp::HidpDescriptor;
use crate::device::DescriptorHandle;
use crate::error::SourceError;
use crate::sources::hid::HidInstance;
use crate::sources::{EnumerationSource, SourceKind};

pub struct HidSource {
    api: HidApi,
}

impl HidSource {
    pub fn new() -> Result<Self, SourceError> {
        let api = HidApi::new().map_err(|e| SourceError::Unavailable {
            kind: SourceKind::Hid,
            reason: e.to_string(),
        })?;
        Ok(Self { api })
    }
}

fn instance(info: &DeviceInfo) -> HidInstance {
    HidInstance {
        path: info.path().to_string_lossy().into_owned(),
        product_string: info
            .product_string()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        usage_page: info.usage_page(),
        usage: info.usage(),
    }
}

impl EnumerationSource for HidSource {
    type Instance = HidInstance;

    fn kind(&self) -> SourceKind {
        SourceKind::Hid
    }

    fn list_instances(&mut self) -> Result<Vec<HidInstance>, SourceError> {
        self.api
            .refresh_devices()
            .map_err(|e| SourceError::Unavailable {
                kind: SourceKind::Hid,
                reason: e.to_string(),
            })?;
        let list: Vec<_> = self.api.device_list().map(instance).collect();
        debug!("[SOURCE] hid: {} interface(s)", list.len());
        Ok(list)
    }

    fn descriptor(
        &mut self,
        instance: &HidInstance,
    ) -> Result<Option<DescriptorHandle>, SourceError> {
        let desc = HidpDescriptor::from_path(&instance.path)?;
        Ok(Some(DescriptorHandle::new(desc)))
    }
}
