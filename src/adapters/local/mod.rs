//! Local filesystem adapters
//!
//! A generic exporter/importer pair that moves any data vertical between
//! two directory trees. Used by the `transfer` command and as the reference
//! adapter for tests.

pub mod exporter;
pub mod importer;

pub use exporter::{item_id, LocalExporter};
pub use importer::LocalImporter;

use crate::adapters::registry::AdapterRegistry;
use crate::adapters::traits::{Exporter, Importer};
use crate::domain::{DataVertical, ServiceId};
use std::path::PathBuf;
use std::sync::Arc;

/// Service name the local adapters register under
pub const LOCAL_SERVICE: &str = "local";

/// The `local` service id
pub fn local_service() -> ServiceId {
    ServiceId::from_static(LOCAL_SERVICE)
}

/// Registers the local exporter and importer for every data vertical
///
/// Exports read from `source_root`; imports write below `destination_root`.
pub fn register(
    registry: &mut AdapterRegistry,
    source_root: impl Into<PathBuf>,
    destination_root: impl Into<PathBuf>,
) {
    let source_root = source_root.into();
    let destination_root = destination_root.into();

    for data_type in DataVertical::ALL {
        let source = source_root.clone();
        registry.register_exporter(local_service(), data_type, move |ctx| {
            Ok(Arc::new(LocalExporter::new(
                source.clone(),
                ctx.data_type,
                ctx.transfer.page_size,
            )) as Arc<dyn Exporter>)
        });

        let destination = destination_root.clone();
        registry.register_importer(local_service(), data_type, move |ctx| {
            Ok(Arc::new(LocalImporter::new(destination.clone(), &ctx.transfer)) as Arc<dyn Importer>)
        });
    }
}
