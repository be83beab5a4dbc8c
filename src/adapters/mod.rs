//! External system integrations for Porter.
//!
//! - [`traits`] - the `Exporter`/`Importer` interface every vendor adapter implements
//! - [`registry`] - (service, data type) to adapter factories
//! - [`local`] - local filesystem adapters
//! - [`store`] - job stores
//! - [`metrics`] - metric recorders
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The engine in
//! [`crate::core`] only depends on the traits defined here.

pub mod local;
pub mod metrics;
pub mod registry;
pub mod store;
pub mod traits;
