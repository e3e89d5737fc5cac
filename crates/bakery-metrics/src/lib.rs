//! ---
//! bakery_section: "03-persistence-logging"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Metrics collection and text exposition."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared registry type used across services.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Render every family in the registry in the Prometheus text format.
pub fn encode_text(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&registry.gather())
        .context("failed to encode metrics")
}

/// Content type matching [`encode_text`] output.
pub fn text_content_type() -> String {
    TextEncoder::new().format_type().to_owned()
}

/// Counters for the report pipeline.
#[derive(Clone, Debug)]
pub struct ReportMetrics {
    reports_total: IntCounter,
    report_failures_total: IntCounter,
    report_rows: Histogram,
    narratives_total: IntCounterVec,
}

impl ReportMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let reports_total = IntCounter::with_opts(Opts::new(
            "bakery_reports_total",
            "Reports generated and persisted successfully",
        ))?;
        registry.register(Box::new(reports_total.clone()))?;

        let report_failures_total = IntCounter::with_opts(Opts::new(
            "bakery_report_failures_total",
            "Report requests that failed before a response could be built",
        ))?;
        registry.register(Box::new(report_failures_total.clone()))?;

        let buckets = prometheus::exponential_buckets(1.0, 4.0, 8)
            .context("failed to construct histogram buckets")?;
        let report_rows = Histogram::with_opts(
            HistogramOpts::new("bakery_report_rows", "Readings per persisted report")
                .buckets(buckets),
        )?;
        registry.register(Box::new(report_rows.clone()))?;

        let narratives_total = IntCounterVec::new(
            Opts::new(
                "bakery_narratives_total",
                "Narratives produced, labelled by the path that produced them",
            ),
            &["source"],
        )?;
        registry.register(Box::new(narratives_total.clone()))?;

        Ok(Self {
            reports_total,
            report_failures_total,
            report_rows,
            narratives_total,
        })
    }

    pub fn record_report(&self, rows: usize) {
        self.reports_total.inc();
        self.report_rows.observe(rows as f64);
    }

    pub fn record_failure(&self) {
        self.report_failures_total.inc();
    }

    pub fn record_narrative(&self, source: &str) {
        self.narratives_total.with_label_values(&[source]).inc();
    }
}

pub use prometheus;
