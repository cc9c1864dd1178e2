//! Windows.Gaming.Input adapter (`RawGameController`).
//!
//! WinRT surface; the host enumerates it and hands the results to a
//! [`StaticSource`](crate::sources::StaticSource).

use crate::capability::{CapabilityRecord, Count};
use crate::device::DeviceClass;
use crate::identity::IdentityFields;
use crate::sources::InstanceFields;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GamingInputKind {
    Gamepad,
    RacingWheel,
    FlightStick,
    ArcadeStick,
    #[default]
    Raw,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GamingInputInstance {
    pub non_roamable_id: String,
    pub display_name: Option<String>,
    pub hardware_vendor_id: u16,
    pub hardware_product_id: u16,
    pub kind: GamingInputKind,
    pub axis_count: u32,
    pub button_count: u32,
    pub switch_count: u32,
}

impl IdentityFields for GamingInputInstance {
    fn structured_ids(&self) -> Option<(u32, u32)> {
        Some((
            u32::from(self.hardware_vendor_id),
            u32::from(self.hardware_product_id),
        ))
    }
}

impl InstanceFields for GamingInputInstance {
    fn handle(&self) -> String {
        self.non_roamable_id.clone()
    }

    fn name(&self) -> Option<String> {
        self.display_name.clone()
    }

    fn class_hint(&self) -> Option<DeviceClass> {
        match self.kind {
            GamingInputKind::Gamepad => Some(DeviceClass::Gamepad),
            GamingInputKind::RacingWheel => Some(DeviceClass::Wheel),
            GamingInputKind::FlightStick | GamingInputKind::ArcadeStick => {
                Some(DeviceClass::Joystick)
            }
            GamingInputKind::Raw => None,
        }
    }

    fn known_caps(&self) -> Option<CapabilityRecord> {
        Some(CapabilityRecord {
            axes: Count::Measured(self.axis_count),
            buttons: self.button_count,
            povs: Count::Measured(self.switch_count),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::canonical_id;

    #[test]
    fn counts_and_identity() {
        let inst = GamingInputInstance {
            non_roamable_id: "{wgi/nrid/abc}".into(),
            display_name: Some("T.16000M".into()),
            hardware_vendor_id: 0x044F,
            hardware_product_id: 0xB10A,
            kind: GamingInputKind::FlightStick,
            axis_count: 4,
            button_count: 16,
            switch_count: 1,
        };
        assert_eq!(canonical_id(&inst).to_string(), "VID_044F&PID_B10A");
        let caps = inst.known_caps().unwrap();
        assert_eq!((caps.axes.value(), caps.buttons, caps.povs.value()), (4, 16, 1));
        assert_eq!(inst.class_hint(), Some(DeviceClass::Joystick));
    }
}
