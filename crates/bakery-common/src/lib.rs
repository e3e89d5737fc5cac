//! ---
//! bakery_section: "01-core-functionality"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Shared primitives for the bakery telemetry workspace."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
//! Configuration loading and tracing setup consumed by every service crate.

pub mod config;
pub mod logging;

pub use config::{
    ApiConfig, AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, NarrativeConfig,
    ReportConfig, SimulationConfig, StorageConfig,
};
pub use logging::{init_tracing, LogFormat};
