//! ---
//! bakery_section: "01-core-functionality"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Tracing subscriber setup for the service binaries."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AppConfig;

const LOG_ENV: &str = "BAKERY_LOG";

/// HTTP client and server internals stay at `warn` unless a directive asks otherwise.
const DEFAULT_DIRECTIVE: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn";

static GUARDS: OnceCell<(WorkerGuard, WorkerGuard)> = OnceCell::new();

/// Available stdout log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Pick the filter directive: `BAKERY_LOG`, then `RUST_LOG`, then the service default.
/// Blank values are skipped.
fn filter_directive(bakery_log: Option<String>, rust_log: Option<String>) -> String {
    [bakery_log, rust_log]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_owned())
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("invalid log directive {directive:?} ({err}); using {DEFAULT_DIRECTIVE}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    })
}

/// Install the global subscriber: the configured stdout format plus a daily rolling JSON
/// file named `<file_prefix or service>.log` under `logging.directory`.
///
/// A second call keeps the first subscriber.
pub fn init_tracing(service_name: &str, config: &AppConfig) -> Result<()> {
    let logging = &config.logging;
    std::fs::create_dir_all(&logging.directory).with_context(|| {
        format!("unable to create log directory {}", logging.directory.display())
    })?;
    let file_name = format!(
        "{}.log",
        logging.file_prefix.as_deref().unwrap_or(service_name)
    );

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&logging.directory, &file_name));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let directive = filter_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );

    let stdout_layer = match logging.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(build_filter(&directive))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if !installed {
        return Ok(());
    }
    let _ = GUARDS.set((file_guard, stdout_guard));

    info!(
        service = %service_name,
        filter = %directive,
        log_file = %logging.directory.join(&file_name).display(),
        data_dir = %config.storage.data_dir.display(),
        listen = %config.api.listen,
        narrative_enabled = config.narrative.enabled,
        narrative_model = %config.narrative.model,
        "tracing initialised"
    );
    Ok(())
}
