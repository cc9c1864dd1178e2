//! HID usage pages, usages and control classification.

pub const PAGE_UNDEFINED: u16 = 0x00;
pub const PAGE_GENERIC_DESKTOP: u16 = 0x01;
pub const PAGE_SIMULATION: u16 = 0x02;
pub const PAGE_BUTTON: u16 = 0x09;
pub const PAGE_DIGITIZER: u16 = 0x0D;
pub const PAGE_PID: u16 = 0x0F;

// Generic Desktop usages.
pub const GD_POINTER: u16 = 0x01;
pub const GD_MOUSE: u16 = 0x02;
pub const GD_JOYSTICK: u16 = 0x04;
pub const GD_GAMEPAD: u16 = 0x05;
pub const GD_KEYBOARD: u16 = 0x06;
pub const GD_KEYPAD: u16 = 0x07;
pub const GD_MULTI_AXIS: u16 = 0x08;
pub const GD_X: u16 = 0x30;
pub const GD_RZ: u16 = 0x35;
pub const GD_SLIDER: u16 = 0x36;
pub const GD_WHEEL: u16 = 0x38;
pub const GD_HAT_SWITCH: u16 = 0x39;

// Simulation Controls usages.
pub const SIM_THROTTLE: u16 = 0xBB;
pub const SIM_ACCELERATOR: u16 = 0xC4;
pub const SIM_BRAKE: u16 = 0xC5;
pub const SIM_CLUTCH: u16 = 0xC6;
pub const SIM_STEERING: u16 = 0xC8;

/// Standard axis/slider/POV usages, in probe order.
pub const PROBE_USAGES: [u16; 10] = [0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39];

/// What a single logical value control counts as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueClass {
    Axis,
    Slider,
    Pov,
    Throttle,
    Brake,
    Steering,
    Accelerator,
    Clutch,
}

/// Classify a Generic Desktop usage (X..Rz, Slider/Dial/Wheel, Hat).
#[inline]
pub fn classify_desktop(usage: u16) -> Option<ValueClass> {
    match usage {
        GD_X..=GD_RZ => Some(ValueClass::Axis),
        GD_SLIDER..=GD_WHEEL => Some(ValueClass::Slider),
        GD_HAT_SWITCH => Some(ValueClass::Pov),
        _ => None,
    }
}

/// Classify a Simulation Controls usage.
#[inline]
pub fn classify_simulation(usage: u16) -> Option<ValueClass> {
    match usage {
        SIM_THROTTLE => Some(ValueClass::Throttle),
        SIM_BRAKE => Some(ValueClass::Brake),
        SIM_STEERING => Some(ValueClass::Steering),
        SIM_ACCELERATOR => Some(ValueClass::Accelerator),
        SIM_CLUTCH => Some(ValueClass::Clutch),
        _ => None,
    }
}

/// Classify one logical value control.
///
/// A control whose own usage is the Generic Desktop *Pointer* collection
/// usage, or whose usage page is undefined, is classified by its link usage
/// when that carries an axis/slider/POV code.
pub fn classify_value(usage_page: u16, usage: u16, link_usage: u16) -> Option<ValueClass> {
    match usage_page {
        PAGE_GENERIC_DESKTOP if usage == GD_POINTER => classify_desktop(link_usage),
        PAGE_GENERIC_DESKTOP => classify_desktop(usage),
        PAGE_SIMULATION => classify_simulation(usage),
        PAGE_UNDEFINED => classify_desktop(link_usage),
        _ => None,
    }
}

/// Friendly name for common usages (X/Y/Z/Rx/Ry/Rz, sliders, hat, sim controls).
pub fn usage_name(usage_page: u16, usage: u16) -> String {
    if usage_page == PAGE_GENERIC_DESKTOP {
        let s = match usage {
            GD_X => "X",
            0x31 => "Y",
            0x32 => "Z",
            0x33 => "Rx",
            0x34 => "Ry",
            GD_RZ => "Rz",
            GD_SLIDER => "Slider",
            0x37 => "Dial",
            GD_WHEEL => "Wheel",
            GD_HAT_SWITCH => "Hat",
            _ => return format!("GD_{usage:#04x}"),
        };
        return s.to_string();
    }

    if usage_page == PAGE_SIMULATION {
        let s = match usage {
            0xBA => "Rudder",
            SIM_THROTTLE => "Throttle",
            SIM_ACCELERATOR => "Accelerator",
            SIM_BRAKE => "Brake",
            SIM_CLUTCH => "Clutch",
            SIM_STEERING => "Steering",
            _ => return format!("Sim_{usage:#04x}"),
        };
        return s.to_string();
    }

    if usage_page == PAGE_BUTTON {
        return format!("Button{usage}");
    }

    if (usage_page & 0xFF00) == 0xFF00 {
        return "Vendor".into();
    }

    format!("UP_{usage_page:04x}_U_{usage:04x}")
}
