//! ---
//! bakery_section: "03-persistence-logging"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Persistence of reading batches as CSV artifacts."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Batches are written twice: once under a unique timestamped name and once under a
//! fixed "latest" name that every report replaces.

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing artifact files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for CSV encoding and decoding issues.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// The requested artifact does not exist.
    #[error("artifact not found: {0}")]
    NotFound(String),
    /// The artifact name is not a bare file name.
    #[error("invalid artifact name: {0}")]
    InvalidName(String),
    /// Every suffixed candidate for a timestamp was already taken.
    #[error("no free artifact name for {0}")]
    NameExhausted(String),
}

pub mod codec;
pub mod store;

pub use codec::{decode_readings, encode_batch};
pub use store::{ArtifactStore, ReportArtifact};
