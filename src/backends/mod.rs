//! Platform enumeration backends.
//!
//! # Feature flags
//! - **`hid`**: enables the `hidapi`-backed HID source on Windows (default).
//!
//! Raw Input and XInput sources need only `windows-sys` and are always built
//! on Windows. Other platforms get no backend; the catalogue still runs over
//! host-supplied [`StaticSource`](crate::sources::StaticSource)s.

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;
