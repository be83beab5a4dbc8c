//! Adapter registry
//!
//! Maps (service, data vertical) to exporter and importer factories. A job
//! resolves its pair once, when it starts; nothing here is global.

use crate::adapters::traits::{Exporter, Importer};
use crate::config::TransferConfig;
use crate::domain::{DataVertical, JobId, Result, ServiceId, TransferError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which side of a transfer an adapter serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Export,
    Import,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Export => f.write_str("export"),
            Self::Import => f.write_str("import"),
        }
    }
}

/// What a factory knows about the job it builds an adapter for
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub job_id: JobId,
    pub data_type: DataVertical,
    pub transfer: TransferConfig,
}

/// Builds an exporter for one job
pub type ExporterFactory =
    Arc<dyn Fn(&AdapterContext) -> Result<Arc<dyn Exporter>> + Send + Sync>;

/// Builds an importer for one job
pub type ImporterFactory =
    Arc<dyn Fn(&AdapterContext) -> Result<Arc<dyn Importer>> + Send + Sync>;

type Key = (ServiceId, DataVertical);

/// Registered adapter factories
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    exporters: HashMap<Key, ExporterFactory>,
    importers: HashMap<Key, ImporterFactory>,
}

impl AdapterRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an exporter factory, replacing any previous one for the pair
    pub fn register_exporter<F>(&mut self, service: ServiceId, data_type: DataVertical, factory: F)
    where
        F: Fn(&AdapterContext) -> Result<Arc<dyn Exporter>> + Send + Sync + 'static,
    {
        self.exporters.insert((service, data_type), Arc::new(factory));
    }

    /// Registers an importer factory, replacing any previous one for the pair
    pub fn register_importer<F>(&mut self, service: ServiceId, data_type: DataVertical, factory: F)
    where
        F: Fn(&AdapterContext) -> Result<Arc<dyn Importer>> + Send + Sync + 'static,
    {
        self.importers.insert((service, data_type), Arc::new(factory));
    }

    /// Whether an adapter is registered for the pair and direction
    pub fn supports(&self, service: &ServiceId, data_type: DataVertical, direction: Direction) -> bool {
        let key = (service.clone(), data_type);
        match direction {
            Direction::Export => self.exporters.contains_key(&key),
            Direction::Import => self.importers.contains_key(&key),
        }
    }

    /// Builds the exporter for `service`
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Unsupported`] if nothing is registered for
    /// the pair, or the factory's own error.
    pub fn exporter(&self, service: &ServiceId, ctx: &AdapterContext) -> Result<Arc<dyn Exporter>> {
        let factory = self
            .exporters
            .get(&(service.clone(), ctx.data_type))
            .ok_or_else(|| unsupported(service, ctx.data_type, Direction::Export))?;
        factory(ctx)
    }

    /// Builds the importer for `service`
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Unsupported`] if nothing is registered for
    /// the pair, or the factory's own error.
    pub fn importer(&self, service: &ServiceId, ctx: &AdapterContext) -> Result<Arc<dyn Importer>> {
        let factory = self
            .importers
            .get(&(service.clone(), ctx.data_type))
            .ok_or_else(|| unsupported(service, ctx.data_type, Direction::Import))?;
        factory(ctx)
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("exporters", &self.exporters.keys().collect::<Vec<_>>())
            .field("importers", &self.importers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn unsupported(service: &ServiceId, data_type: DataVertical, direction: Direction) -> TransferError {
    TransferError::Unsupported(format!(
        "No {direction} adapter for service '{service}' and data type '{data_type}'"
    ))
}
