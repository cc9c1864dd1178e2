//! The catalogue root: one full pass is collect, filter, merge, publish.
//!
//! ```
//! use padcat::sources::{hid::HidInstance, SourceKind, StaticSource};
//! use padcat::{CatalogConfig, DeviceCatalog};
//!
//! let pad = HidInstance {
//!     path: r"\\?\HID#VID_045E&PID_028E#7&1".into(),
//!     vendor_id: 0x045E,
//!     product_id: 0x028E,
//!     ..Default::default()
//! };
//! let mut catalog = DeviceCatalog::new(CatalogConfig::default());
//! catalog.add_source(StaticSource::with_instances(SourceKind::Hid, vec![pad]));
//!
//! let report = catalog.refresh();
//! assert_eq!(report.added.len(), 1);
//! assert!(catalog.refresh().is_stable());
//! ```

use log::debug;

use crate::caps::ParseOptions;
use crate::config::CatalogConfig;
use crate::publish::{Delivery, Publisher};
use crate::registry::{DeviceRegistry, MergeReport};
use crate::snapshot::CatalogSnapshot;
use crate::sources::{BatchSource, SourceKind};

pub struct DeviceCatalog {
    sources: Vec<Box<dyn BatchSource>>,
    registry: DeviceRegistry,
    config: CatalogConfig,
    opts: ParseOptions,
    generation: u64,
    publisher: Option<Publisher>,
}

impl DeviceCatalog {
    /// Empty catalogue; add sources with [`add_source`](Self::add_source)
    /// (or [`discover`](Self::discover) on Windows).
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            sources: Vec::new(),
            registry: DeviceRegistry::with_naming(config.name_decoration()),
            opts: config.parse_options(),
            config,
            generation: 0,
            publisher: None,
        }
    }

    /// Catalogue with every OS-backed source this build supports.
    ///
    /// DirectInput and Windows.Gaming.Input are not enumerated here; feed
    /// them through a [`StaticSource`](crate::sources::StaticSource).
    #[cfg(target_os = "windows")]
    pub fn discover(config: CatalogConfig) -> Self {
        use crate::backends::windows::{RawInputSource, XInputSource};

        let mut catalog = Self::new(config);
        catalog.add_source(RawInputSource::new());
        catalog.add_source(XInputSource::new());

        #[cfg(feature = "hid")]
        match crate::backends::windows::HidSource::new() {
            Ok(hid) => catalog.add_source(hid),
            Err(e) => log::warn!("[SOURCE] hid: {e}"),
        }

        catalog
    }

    pub fn add_source<S: BatchSource + 'static>(&mut self, source: S) {
        debug!("[SOURCE] registered {}", source.kind());
        self.sources.push(Box::new(source));
    }

    /// Publish every completed pass to `publisher`.
    pub fn set_publisher(&mut self, publisher: Publisher) {
        self.publisher = Some(publisher);
    }

    /// Run one pass over every enabled source.
    ///
    /// Never fails: sources that cannot be queried contribute an empty batch,
    /// which removes their previous entries.
    pub fn refresh(&mut self) -> MergeReport {
        let opts = &self.opts;
        let config = &self.config;
        let batches: Vec<_> = self
            .sources
            .iter_mut()
            .filter(|s| {
                let on = config.is_enabled(s.kind());
                if !on {
                    debug!("[SOURCE] {} disabled by configuration", s.kind());
                }
                on
            })
            .map(|s| s.collect(opts))
            .collect();

        let report = self.registry.merge(batches);
        self.generation += 1;

        if let Some(publisher) = &self.publisher {
            let delivery = publisher.publish(CatalogSnapshot::of(&self.registry, self.generation));
            if delivery == Delivery::Closed {
                self.publisher = None;
            }
        }

        debug!(
            "[CATALOG] pass {}: {} device(s)",
            self.generation,
            self.registry.len()
        );
        report
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot::of(&self.registry, self.generation)
    }

    #[inline]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Mutable access, for activity flags.
    #[inline]
    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn source_kinds(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.sources.iter().map(|s| s.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::{channel, CatalogFilter};
    use crate::registry::RegistryKey;
    use crate::sources::hid::HidInstance;
    use crate::sources::xinput::XInputInstance;
    use crate::sources::StaticSource;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn pad(path: &str) -> HidInstance {
        HidInstance {
            path: path.into(),
            vendor_id: 0x045E,
            product_id: 0x028E,
            ..Default::default()
        }
    }

    fn xinput_slot(slot: u32) -> XInputInstance {
        XInputInstance::connected(slot, 0x045E, 0x028E)
    }

    #[test]
    fn refresh_merges_sources_and_bumps_generation() {
        let mut catalog = DeviceCatalog::new(CatalogConfig::default());
        catalog.add_source(StaticSource::with_instances(
            SourceKind::Hid,
            vec![pad(r"\\?\HID#VID_045E&PID_028E#7&1")],
        ));
        catalog.add_source(StaticSource::with_instances(SourceKind::XInput, vec![xinput_slot(0)]));

        let report = catalog.refresh();
        assert_eq!(report.added.len(), 2);
        assert_eq!(catalog.generation(), 1);
        assert_eq!(
            catalog.source_kinds().collect::<Vec<_>>(),
            vec![SourceKind::Hid, SourceKind::XInput]
        );

        let snap = catalog.snapshot();
        assert_eq!(snap.generation, 1);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn disabled_sources_are_not_collected() {
        let cfg = CatalogConfig::from_toml_str("[sources]\nenabled = [\"xinput\"]\n").unwrap();
        let mut catalog = DeviceCatalog::new(cfg);
        catalog.add_source(StaticSource::with_instances(
            SourceKind::Hid,
            vec![pad(r"\\?\HID#VID_045E&PID_028E#7&1")],
        ));
        catalog.add_source(StaticSource::with_instances(SourceKind::XInput, vec![xinput_slot(1)]));

        catalog.refresh();
        let snap = catalog.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.entries[0].source, SourceKind::XInput);
    }

    #[test]
    fn each_xinput_slot_is_its_own_entry() {
        let mut catalog = DeviceCatalog::new(CatalogConfig::default());
        catalog.add_source(StaticSource::with_instances(
            SourceKind::XInput,
            (0..3).map(|slot| XInputInstance::connected(slot, 0x045E, 0)).collect(),
        ));
        catalog.refresh();

        let snap = catalog.snapshot();
        let ids: Vec<String> = snap
            .from_source(SourceKind::XInput)
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "VID_0000&PID_0000&COL_01",
                "VID_0000&PID_0000&COL_02",
                "VID_0000&PID_0000&COL_03"
            ]
        );
    }

    #[test]
    fn activity_survives_refresh() {
        let mut catalog = DeviceCatalog::new(CatalogConfig::default());
        catalog.add_source(StaticSource::with_instances(
            SourceKind::Hid,
            vec![pad(r"\\?\HID#VID_045E&PID_028E#7&1")],
        ));
        catalog.refresh();

        let key = RegistryKey::new(SourceKind::Hid, "VID_045E&PID_028E");
        assert!(catalog.registry_mut().set_button_active(&key, true));
        assert!(catalog.refresh().is_stable());
        assert!(catalog.registry().get(&key).unwrap().activity.button);
    }

    #[test]
    fn passes_are_published() {
        let (publisher, queue) = channel();
        let last = Arc::new(AtomicU64::new(0));
        let l = Arc::clone(&last);
        queue.add_listener(
            move |snap: &CatalogSnapshot| l.store(snap.generation, Ordering::SeqCst),
            CatalogFilter::All,
        );

        let mut catalog = DeviceCatalog::new(CatalogConfig::default());
        catalog.set_publisher(publisher);
        catalog.refresh();
        catalog.refresh();
        assert_eq!(last.load(Ordering::SeqCst), 2);
    }
}
