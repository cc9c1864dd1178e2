//! One catalogue pass, printed as JSON.
//!
//! `cargo run --example scan [config.toml]`, with `RUST_LOG=debug` for the
//! per-device decisions.

use padcat::{CatalogConfig, DeviceCatalog};

fn main() -> padcat::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default(),
    };

    #[cfg(target_os = "windows")]
    let mut catalog = DeviceCatalog::discover(config);
    #[cfg(not(target_os = "windows"))]
    let mut catalog = DeviceCatalog::new(config);

    let report = catalog.refresh();
    eprintln!(
        "added={} updated={} removed={}",
        report.added.len(),
        report.updated.len(),
        report.removed.len()
    );
    println!("{}", catalog.snapshot().to_json()?);
    Ok(())
}
