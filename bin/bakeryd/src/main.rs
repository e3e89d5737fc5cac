//! ---
//! bakery_section: "01-core-functionality"
//! bakery_subsection: "binary"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Binary entrypoint for the bakery telemetry daemon."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bakery_api::{spawn_api_server, ApiState};
use bakery_common::{init_tracing, AppConfig};
use bakery_metrics::{new_registry, ReportMetrics, SharedRegistry};
use bakery_persistence::ArtifactStore;
use bakery_report::{
    NarrativeSummarizer, OpenAiTextGenerator, ReportService, ReportSettings, TextGenerator,
};
use bakery_sim::RandomReadingSource;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Bakery telemetry daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override api.listen")]
    listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve the HTTP API until interrupted")]
    Serve,
    #[command(about = "Load and validate configuration, then exit")]
    Validate,
    #[command(about = "Generate one report and print the JSON response")]
    Report {
        #[arg(long, value_name = "ROWS", help = "Requested batch size")]
        n: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/bakery.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }
    config.validate()?;

    let command = cli.command.unwrap_or(Commands::Serve);
    if let Commands::Validate = command {
        match &loaded.source {
            Some(path) => println!("configuration OK ({})", path.display()),
            None => println!("configuration OK (built-in defaults)"),
        }
        return Ok(());
    }

    init_tracing("bakeryd", &config)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using built-in defaults"),
    }

    let registry = config.metrics.enabled.then(new_registry);
    let reports = build_report_service(&config, registry.clone())?;

    match command {
        Commands::Serve => run_daemon(&config, reports, registry).await?,
        Commands::Report { n } => {
            let response = reports.generate(n.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Validate => {}
    }

    Ok(())
}

fn build_report_service(
    config: &AppConfig,
    registry: Option<SharedRegistry>,
) -> Result<ReportService> {
    let source = Arc::new(RandomReadingSource::from_seed(config.simulation.random_seed));
    let store = Arc::new(ArtifactStore::new(
        config.storage.data_dir.clone(),
        config.storage.file_prefix.clone(),
        config.storage.latest_name.clone(),
    ));

    let generator = OpenAiTextGenerator::from_config(&config.narrative)
        .context("failed to build text generation client")?
        .map(|client| Arc::new(client) as Arc<dyn TextGenerator>);
    let summarizer = NarrativeSummarizer::new(generator, config.narrative.timeout);
    let external_narrative = summarizer.has_external();

    let mut service = ReportService::new(
        source,
        store,
        summarizer,
        ReportSettings::from(&config.report),
    );
    if let Some(registry) = registry {
        service = service.with_metrics(ReportMetrics::new(registry)?);
    }
    info!(
        data_dir = %config.storage.data_dir.display(),
        external_narrative,
        "report service ready"
    );
    Ok(service)
}

async fn run_daemon(
    config: &AppConfig,
    reports: ReportService,
    registry: Option<SharedRegistry>,
) -> Result<()> {
    if registry.is_none() {
        info!("metrics disabled by configuration");
    }
    let state = Arc::new(ApiState::new(reports, registry));
    let server = spawn_api_server(state, config.api.listen, &config.api.cors_origins)?;
    info!(address = %server.addr(), "daemon running; waiting for termination signal");

    shutdown_signal().await;
    info!("termination signal received; shutting down");
    server.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "unable to install SIGTERM handler; waiting for ctrl-c only");
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
