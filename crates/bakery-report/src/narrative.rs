//! ---
//! bakery_section: "04-reporting"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Narrative summaries with external generation and local fallback."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::stats::BatchStats;

/// Marker opening every narrative produced after a collaborator failure.
pub const FALLBACK_MARKER: &str = "[AI fallback]";

const SYSTEM_PROMPT: &str = "You are a bakery data analyst.";

/// Which path produced a narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// Text returned by the external collaborator.
    External,
    /// The collaborator was consulted and failed.
    ExternalError,
    /// No collaborator configured.
    Local,
}

impl NarrativeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeSource::External => "external",
            NarrativeSource::ExternalError => "external_error",
            NarrativeSource::Local => "local",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Narrative {
    pub text: String,
    pub source: NarrativeSource,
}

/// Chat-style prompt handed to a [`TextGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativePrompt {
    pub system: String,
    pub user: String,
}

impl NarrativePrompt {
    pub fn for_stats(stats: &BatchStats) -> Self {
        let user = format!(
            "You are a bakery operations expert.\n\
             Based on the data below, write a short report in English (4-6 sentences) \
             with a summary and practical recommendations.\n\n\
             Average oven temperature: {} °C\n\
             Average customers per hour: {}\n\
             Lowest flour stock: {}",
            stats.oven_temperature_display(),
            stats.customers_display(),
            stats.min_flour_stock,
        );
        Self {
            system: SYSTEM_PROMPT.to_owned(),
            user,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("request to text generation service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("text generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response from text generation service: {0}")]
    Malformed(String),
    #[error("text generation service returned an empty completion")]
    Empty,
    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),
}

/// External text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &NarrativePrompt) -> Result<String, NarrativeError>;
}

/// Turns statistics into prose. Never fails: every collaborator error becomes fallback text.
#[derive(Clone)]
pub struct NarrativeSummarizer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl NarrativeSummarizer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Summarizer that only ever formats the local template.
    pub fn local() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub fn has_external(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn narrate(&self, stats: &BatchStats) -> Narrative {
        let Some(generator) = &self.generator else {
            debug!("no text generator configured; using local narrative");
            return Narrative {
                text: local_report(stats),
                source: NarrativeSource::Local,
            };
        };

        let prompt = NarrativePrompt::for_stats(stats);
        let outcome = match tokio::time::timeout(self.timeout, generator.generate(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(NarrativeError::Timeout(self.timeout)),
        };

        match outcome.map(|text| text.trim().to_owned()) {
            Ok(text) if !text.is_empty() => Narrative {
                text,
                source: NarrativeSource::External,
            },
            Ok(_) => fallback(stats, &NarrativeError::Empty),
            Err(err) => fallback(stats, &err),
        }
    }
}

impl std::fmt::Debug for NarrativeSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeSummarizer")
            .field("external", &self.has_external())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn fallback(stats: &BatchStats, err: &NarrativeError) -> Narrative {
    warn!(error = %err, "text generation failed; falling back to local narrative");
    Narrative {
        text: format!(
            "{FALLBACK_MARKER} Error using the text generation service: {err}\n\n{}",
            local_report(stats)
        ),
        source: NarrativeSource::ExternalError,
    }
}

/// Deterministic multi-line report used when no collaborator is available.
pub fn local_report(stats: &BatchStats) -> String {
    format!(
        "📊 Bakery Report\n\n\
         - Average oven temperature: {} °C\n\
         - Customers per hour (average): {}\n\
         - Lowest flour stock level: {}\n\n\
         Conclusion: Production is stable, but keep an eye on flour stock.",
        stats.oven_temperature_display(),
        stats.customers_display(),
        stats.min_flour_stock,
    )
}
