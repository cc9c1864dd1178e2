//! Windows input-device catalogue.
//!
//! Five OS subsystems (Raw Input, DirectInput, XInput, Windows.Gaming.Input
//! and HID) each report a partial, differently shaped view of the attached
//! controllers. `padcat` reads capability counts out of HID report
//! descriptors, resolves every record to a canonical
//! `VID_xxxx&PID_xxxx[&MI_xx][&COL_xx]` identifier, drops composite-USB
//! transport nodes, and merges the result into one ordered registry whose
//! per-device activity flags survive re-enumeration.

pub mod backends;
pub mod capability;
pub mod caps;
pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod filter;
pub mod identity;
pub mod publish;
pub mod registry;
pub mod snapshot;
pub mod sources;

pub use capability::*;
pub use catalog::DeviceCatalog;
pub use config::CatalogConfig;
pub use device::*;
pub use error::{CatalogError, ConfigError, DescriptorError, Result, SourceError};
pub use identity::{canonical_id, resolve_ids, CanonicalId, IdMethod, IdentityFields};
pub use registry::*;
pub use snapshot::CatalogSnapshot;
pub use sources::SourceKind;
