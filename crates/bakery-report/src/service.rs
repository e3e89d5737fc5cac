//! ---
//! bakery_section: "04-reporting"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Report orchestration from batch sizing to narrative response."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::sync::Arc;

use bakery_common::ReportConfig;
use bakery_metrics::ReportMetrics;
use bakery_persistence::{encode_batch, ArtifactStore, ReportArtifact};
use bakery_sim::{build_batch, BatchSizePolicy, Reading, ReadingSource};
use serde::Serialize;
use tracing::{error, info};

use crate::narrative::{NarrativeSource, NarrativeSummarizer};
use crate::stats::{summarize, BatchStats};
use crate::{ReportError, Result};

const SUCCESS_MESSAGE: &str = "Report generated successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub batch_size: BatchSizePolicy,
    /// Rows in an ad-hoc CSV export.
    pub export_batch_size: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ReportSettings {
    fn from(config: &ReportConfig) -> Self {
        Self {
            batch_size: BatchSizePolicy::new(config.default_batch_size, config.max_batch_size),
            export_batch_size: config.export_batch_size,
        }
    }
}

/// Body returned for a successful report request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResponse {
    pub status: &'static str,
    pub filename: String,
    pub path: String,
    pub message: String,
    pub narrative: String,
    pub narrative_source: NarrativeSource,
    pub rows: usize,
    pub summary: BatchStats,
}

impl ReportResponse {
    fn new(artifact: &ReportArtifact, stats: BatchStats, narrative: crate::Narrative) -> Self {
        Self {
            status: "OK",
            filename: artifact.filename.clone(),
            path: format!("/data/{}", artifact.filename),
            message: SUCCESS_MESSAGE.to_owned(),
            narrative: narrative.text,
            narrative_source: narrative.source,
            rows: artifact.rows,
            summary: stats,
        }
    }
}

/// Ties the reading source, artifact store and summarizer together.
#[derive(Clone)]
pub struct ReportService {
    source: Arc<dyn ReadingSource>,
    store: Arc<ArtifactStore>,
    summarizer: NarrativeSummarizer,
    settings: ReportSettings,
    metrics: Option<ReportMetrics>,
}

impl ReportService {
    pub fn new(
        source: Arc<dyn ReadingSource>,
        store: Arc<ArtifactStore>,
        summarizer: NarrativeSummarizer,
        settings: ReportSettings,
    ) -> Self {
        Self {
            source,
            store,
            summarizer,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ReportMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// One fresh reading, not persisted.
    pub fn sample(&self) -> Reading {
        self.source.sample()
    }

    /// Encode an ad-hoc batch without touching disk.
    pub fn export_csv(&self) -> Result<Vec<u8>> {
        let batch = build_batch(self.source.as_ref(), self.settings.export_batch_size)?;
        Ok(encode_batch(&batch)?)
    }

    /// Build, aggregate and persist a batch, then narrate it.
    ///
    /// `requested` is the raw batch-size parameter; anything unusable falls back to the
    /// default. Narration never fails the request and never undoes the persisted files.
    pub async fn generate(&self, requested: Option<&str>) -> Result<ReportResponse> {
        let n = self.settings.batch_size.normalize(requested);
        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);

        let outcome = tokio::task::spawn_blocking(move || -> Result<(ReportArtifact, BatchStats)> {
            let batch = build_batch(source.as_ref(), n)?;
            let stats = summarize(&batch)?;
            let artifact = store.persist(&batch)?;
            Ok((artifact, stats))
        })
        .await
        .map_err(ReportError::from)
        .and_then(|result| result);

        let (artifact, stats) = match outcome {
            Ok(done) => done,
            Err(err) => {
                error!(requested_rows = n, error = %err, "report generation failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure();
                }
                return Err(err);
            }
        };

        let narrative = self.summarizer.narrate(&stats).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_report(artifact.rows);
            metrics.record_narrative(narrative.source.as_str());
        }
        info!(
            artifact = %artifact.filename,
            rows = artifact.rows,
            narrative_source = narrative.source.as_str(),
            "report generated"
        );
        Ok(ReportResponse::new(&artifact, stats, narrative))
    }
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService")
            .field("store", &self.store)
            .field("summarizer", &self.summarizer)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
