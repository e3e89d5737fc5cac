//! ---
//! bakery_section: "02-simulation"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Simulation crate exports and error type."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
//! Synthetic bakery telemetry: the reading schema, reading sources and batches.

pub mod batch;
pub mod generator;
pub mod reading;

pub use batch::{build_batch, Batch, BatchSizePolicy};
pub use generator::{RandomReadingSource, ReadingSource, ReplayReadingSource};
pub use reading::Reading;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("a batch must contain at least one reading")]
    EmptyBatch,
    #[error("replay source requires at least one reading")]
    EmptyReplay,
}
