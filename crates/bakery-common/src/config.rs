//! ---
//! bakery_section: "01-core-functionality"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Service configuration model and TOML loading."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_owned()]
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_file_prefix() -> String {
    "bakery_data".to_owned()
}

fn default_latest_name() -> String {
    "bakery_data.csv".to_owned()
}

fn default_batch_size() -> usize {
    50
}

fn default_max_batch_size() -> usize {
    10_000
}

fn default_export_batch_size() -> usize {
    20
}

fn default_narrative_enabled() -> bool {
    true
}

fn default_narrative_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_owned()
}

fn default_narrative_model() -> String {
    "gpt-4o-mini".to_owned()
}

fn default_narrative_temperature() -> f32 {
    0.3
}

fn default_narrative_max_tokens() -> u32 {
    300
}

fn default_narrative_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_metrics_enabled() -> bool {
    true
}

/// Primary configuration object for the bakery telemetry service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub narrative: NarrativeConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
///
/// `source` is `None` when no candidate file existed and built-in defaults are in effect.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "BAKERY_CONFIG";

    /// Load configuration together with the effective source path, respecting the
    /// `BAKERY_CONFIG` override.
    ///
    /// An explicit `BAKERY_CONFIG` path must exist. Candidate paths are probed in
    /// order and the first existing one wins; with none present the defaults apply.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        let config = AppConfig::default();
        config.validate()?;
        Ok(LoadedAppConfig {
            config,
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.report.validate()?;
        self.narrative.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
    /// Allowed CORS origins. `*` permits any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_latest_name")]
    pub latest_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_prefix: default_file_prefix(),
            latest_name: default_latest_name(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.file_prefix.trim().is_empty() {
            return Err(anyhow!("storage.file_prefix must not be empty"));
        }
        if self.latest_name.trim().is_empty() {
            return Err(anyhow!("storage.latest_name must not be empty"));
        }
        if self.latest_name.contains(['/', '\\']) {
            return Err(anyhow!(
                "storage.latest_name '{}' must be a bare file name",
                self.latest_name
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_export_batch_size")]
    pub export_batch_size: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            max_batch_size: default_max_batch_size(),
            export_batch_size: default_export_batch_size(),
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_batch_size == 0 || self.max_batch_size == 0 || self.export_batch_size == 0
        {
            return Err(anyhow!("report batch sizes must be greater than zero"));
        }
        if self.default_batch_size > self.max_batch_size {
            return Err(anyhow!(
                "report.default_batch_size ({}) exceeds report.max_batch_size ({})",
                self.default_batch_size,
                self.max_batch_size
            ));
        }
        if self.export_batch_size > self.max_batch_size {
            return Err(anyhow!(
                "report.export_batch_size ({}) exceeds report.max_batch_size ({})",
                self.export_batch_size,
                self.max_batch_size
            ));
        }
        Ok(())
    }
}

/// Settings for the optional external text-generation collaborator.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    #[serde(default = "default_narrative_enabled")]
    pub enabled: bool,
    #[serde(default = "default_narrative_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_narrative_model")]
    pub model: String,
    #[serde(default = "default_narrative_temperature")]
    pub temperature: f32,
    #[serde(default = "default_narrative_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_narrative_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    /// Environment variable holding the credential. Unset or empty disables the collaborator.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: default_narrative_enabled(),
            endpoint: default_narrative_endpoint(),
            model: default_narrative_model(),
            temperature: default_narrative_temperature(),
            max_tokens: default_narrative_max_tokens(),
            timeout: default_narrative_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl NarrativeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(anyhow!("narrative.timeout must be greater than zero"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("narrative.max_tokens must be greater than zero"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!(
                "narrative.temperature {} outside of 0.0..=2.0",
                self.temperature
            ));
        }
        Ok(())
    }

    /// Resolve the credential once at startup. Returns `None` when disabled or unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for a reproducible sample stream. Unset uses a fresh thread-local RNG per call.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}
