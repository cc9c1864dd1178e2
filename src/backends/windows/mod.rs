#![cfg(target_os = "windows")]

//! Windows enumeration sources.
//!
//! - [`hidp`]: preparsed-data owner answering capability queries via `HidP_*`
//! - [`hid_discovery`]: HID interfaces from `hidapi` (feature `hid`)
//! - [`raw_input`]: Raw Input device list with `RIDI_PREPARSEDDATA` descriptors
//! - [`xinput_devices`]: XInput slots 0..4
//!
//! DirectInput and Windows.Gaming.Input are COM / WinRT surfaces; hosts feed
//! their instances through [`StaticSource`](crate::sources::StaticSource).

#[cfg(feature = "hid")]
pub mod hid_discovery;
pub mod hidp;
pub mod raw_input;
pub mod xinput_devices;

#[cfg(feature = "hid")]
pub use hid_discovery::HidSource;
pub use hidp::HidpDescriptor;
pub use raw_input::RawInputSource;
pub use xinput_devices::XInputSource;
