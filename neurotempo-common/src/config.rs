//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a small TOML file. Everything the service
//! needs before it can open its database (root folder, port, logging, provider
//! keys used as a fallback) is read from here.
//!
//! # Root folder priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `NEUROTEMPO_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "NEUROTEMPO_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "neurotempo.db";

/// Upload directory name inside the root folder
pub const UPLOAD_DIR_NAME: &str = "uploads";

/// Bootstrap configuration loaded from TOML
///
/// Unknown keys are ignored and every section has defaults, so a missing or
/// partial file never prevents startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Root folder for database and uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// HTTP port override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Generative model API key (lowest priority source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    /// YouTube Data API key (lowest priority source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generative model endpoint settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Recommendation pipeline settings
    #[serde(default)]
    pub recommendation: RecommendationConfig,

    /// Live analysis session settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Generative model endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Base URL of the generative language API
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    /// Model used for genre and song requests
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model used for mental-state classification
    #[serde(default = "default_classification_model")]
    pub classification_model: String,

    /// Upper bound for a single gateway round trip
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,

    /// Outbound request budget
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            text_model: default_text_model(),
            classification_model: default_classification_model(),
            timeout_secs: default_gateway_timeout_secs(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Which tempo mapping the recommendation pipeline uses
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TempoStrategyName {
    /// Calmness score through a sigmoid into 50-130 BPM
    #[default]
    CalmnessSigmoid,
    /// Baseline-normalized weighted band score into 60-180 BPM
    WeightedZscore,
}

/// Recommendation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationConfig {
    #[serde(default)]
    pub tempo_strategy: TempoStrategyName,

    /// Songs requested per gateway call
    #[serde(default = "default_song_batch_size")]
    pub song_batch_size: usize,

    /// Number of song batches requested when the caller does not say
    #[serde(default = "default_song_batches")]
    pub song_batches: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            tempo_strategy: TempoStrategyName::default(),
            song_batch_size: default_song_batch_size(),
            song_batches: default_song_batches(),
        }
    }
}

/// Live analysis session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Mental-state history ring buffer capacity
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Capture loop tick interval
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            capture_interval_ms: default_capture_interval_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_gateway_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_classification_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    60
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_song_batch_size() -> usize {
    4
}

fn default_song_batches() -> usize {
    1
}

fn default_history_capacity() -> usize {
    20
}

fn default_capture_interval_ms() -> u64 {
    1000
}

/// Compiled-in fallbacks used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub port: u16,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            port: 8008,
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/neurotempo (or /var/lib/neurotempo for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("neurotempo"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/neurotempo"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("neurotempo"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/neurotempo"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("neurotempo"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\neurotempo"))
    } else {
        PathBuf::from("./neurotempo_data")
    }
}

/// Default TOML config location: `<config_dir>/neurotempo/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("neurotempo").join(format!("{}.toml", module_name)))
}

/// Load TOML config from `path`
///
/// A missing file yields defaults with a warning. A malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found, using defaults: {}", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Write TOML config atomically (temp file + rename)
///
/// On Unix the file is restricted to 0600 since it may carry API keys.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;
    debug!("Wrote config file: {}", path.display());
    Ok(())
}

/// Resolves the root folder from CLI, environment, TOML and defaults
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config_path: None,
        }
    }

    /// Highest priority source
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Explicit TOML file instead of the default location
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        let config_path = self
            .config_path
            .clone()
            .or_else(|| default_config_path(&self.module_name));
        if let Some(path) = config_path {
            if let Ok(content) = std::fs::read_to_string(&path) {
                if let Ok(config) = toml::from_str::<TomlConfig>(&content) {
                    if let Some(root) = config.root_folder {
                        return root;
                    }
                }
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first run
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root_folder.join(UPLOAD_DIR_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Create root and upload directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.upload_dir())?;
        Ok(())
    }
}
