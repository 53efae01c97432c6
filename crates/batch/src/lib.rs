//! Batch runs of structural property checks.
//!
//! A [`ModelRegistry`] names the models to check, a [`BatchRunner`] applies
//! every property to each of them sequentially, and the resulting [`Report`]
//! can be written as a text log or merged into a YAML results mapping.
//!
//! Checks are isolated from each other: a model that errors or panics is
//! recorded with a null flag and the run continues.

mod config;
mod error;
mod logging;
mod registry;
mod report;
mod runner;

pub use config::{BatchConfig, OracleSettings};
pub use error::BatchError;
pub use logging::init_tracing;
pub use registry::{ModelRegistry, ModelRegistryBuilder, RegisteredModel};
pub use report::{MappingEntry, Record, Report};
pub use runner::{BatchRunner, run_batch};
