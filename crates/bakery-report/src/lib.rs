//! ---
//! bakery_section: "04-reporting"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Report pipeline exports and error type."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
//! Report generation: build a batch, aggregate it, persist it, then narrate it.
//!
//! Only the narrative step recovers from failures; everything before it propagates
//! [`ReportError`] to the caller.

pub mod narrative;
pub mod openai;
pub mod service;
pub mod stats;

pub use narrative::{
    local_report, Narrative, NarrativeError, NarrativePrompt, NarrativeSource,
    NarrativeSummarizer, TextGenerator,
};
pub use openai::{OpenAiSettings, OpenAiTextGenerator};
pub use service::{ReportResponse, ReportService, ReportSettings};
pub use stats::{summarize, BatchStats};

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("batch generation failed: {0}")]
    Sim(#[from] bakery_sim::SimError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] bakery_persistence::PersistenceError),
    #[error("report worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
