//! Configuration management for Spark.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.spark/config.yaml` in the workspace, or `SPARK_CONFIG`)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the engine adapter knows how to talk to.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .spark/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Generation engine settings
    pub engine: EngineConfig,

    /// Response cache settings
    pub cache: CacheConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Safety/tone policy file; built-in policy when unset
    pub policy_file: Option<PathBuf>,
}

/// Settings for the LLM-backed generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Provider name ("ollama", "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint; provider default when unset
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// API key resolved from `SPARK_API_KEY` (never read from the file)
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Maximum tokens to generate per answer
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Upper bound on a whole `answer` call, in seconds
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key_env: None,
            api_key: None,
            max_tokens: 512,
            temperature: None,
            timeout_secs: 60,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// LRU bound on cached answers; unbounded when unset
    pub capacity: Option<usize>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    engine: Option<EngineConfigFile>,
    cache: Option<CacheConfig>,
    server: Option<ServerConfigFile>,
    logging: Option<LoggingConfig>,
    policy: Option<PolicyConfigFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineConfigFile {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ServerConfigFile {
    bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PolicyConfigFile {
    path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            engine: EngineConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
            policy_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `SPARK_WORKSPACE`: Override workspace path
    /// - `SPARK_CONFIG`: Path to config file
    /// - `SPARK_PROVIDER`: LLM provider
    /// - `SPARK_MODEL`: Model identifier
    /// - `SPARK_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file.
    ///
    /// Either path, when given, takes precedence over its environment
    /// variable and decides which YAML file is merged.
    pub fn load_with(
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var_os("SPARK_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("SPARK_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.spark_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("SPARK_PROVIDER") {
            config.engine.provider = provider;
        }

        if let Ok(model) = std::env::var("SPARK_MODEL") {
            config.engine.model = model;
        }

        config.engine.api_key = std::env::var("SPARK_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(engine) = config_file.engine {
            if let Some(provider) = engine.provider {
                result.engine.provider = provider;
            }
            if let Some(model) = engine.model {
                result.engine.model = model;
            }
            if engine.endpoint.is_some() {
                result.engine.endpoint = engine.endpoint;
            }
            if engine.api_key_env.is_some() {
                result.engine.api_key_env = engine.api_key_env;
            }
            if let Some(max_tokens) = engine.max_tokens {
                result.engine.max_tokens = max_tokens;
            }
            if engine.temperature.is_some() {
                result.engine.temperature = engine.temperature;
            }
            if let Some(timeout_secs) = engine.timeout_secs {
                result.engine.timeout_secs = timeout_secs;
            }
        }

        if let Some(cache) = config_file.cache {
            result.cache = cache;
        }

        if let Some(bind) = config_file.server.and_then(|s| s.bind) {
            result.server.bind = bind;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        // Relative policy paths resolve against the workspace
        if let Some(policy_path) = config_file.policy.and_then(|p| p.path) {
            let policy_path = PathBuf::from(policy_path);
            result.policy_file = Some(if policy_path.is_absolute() {
                policy_path
            } else {
                result.workspace.join(policy_path)
            });
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    /// Workspace and config file paths are taken by [`AppConfig::load_with`].
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.engine.provider = provider;
        }

        if let Some(model) = model {
            self.engine.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .spark directory.
    pub fn spark_dir(&self) -> PathBuf {
        self.workspace.join(".spark")
    }

    /// Resolve the policy file: explicit setting, else `.spark/policy.yaml` when present.
    pub fn resolve_policy_file(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.policy_file {
            return Some(path.clone());
        }

        let default_path = self.spark_dir().join("policy.yaml");
        default_path.exists().then_some(default_path)
    }

    /// Resolve the engine API key.
    ///
    /// `SPARK_API_KEY` wins; otherwise the variable named by `apiKeyEnv`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.engine.api_key {
            return Some(key.clone());
        }

        self.engine
            .api_key_env
            .as_ref()
            .and_then(|env_var| std::env::var(env_var).ok())
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.engine.provider.to_lowercase();

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.engine.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found: set SPARK_API_KEY or {}",
                self.engine
                    .api_key_env
                    .as_deref()
                    .unwrap_or("engine.apiKeyEnv in config.yaml")
            )));
        }

        if self.engine.timeout_secs == 0 {
            return Err(AppError::Config(
                "engine.timeoutSecs must be greater than zero".to_string(),
            ));
        }

        if self.cache.capacity == Some(0) {
            return Err(AppError::Config(
                "cache.capacity must be greater than zero when set".to_string(),
            ));
        }

        Ok(())
    }
}
