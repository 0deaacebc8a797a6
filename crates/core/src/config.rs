use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::policy::{PolicyInputs, ShieldingLevel};
use crate::errors::DomainError;

/// Searched in order when no explicit path is given.
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["borealis.toml", "config/borealis.toml"];

pub const ENV_API_BASE_URL: &str = "BOREALIS_API_BASE_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "BOREALIS_API_TIMEOUT_SECS";
pub const ENV_API_KEY: &str = "BOREALIS_API_KEY";
pub const ENV_DEFAULT_ASSET_VALUE: &str = "BOREALIS_DEFAULTS_ASSET_VALUE_MILLIONS";
pub const ENV_DEFAULT_SHIELDING: &str = "BOREALIS_DEFAULTS_SHIELDING_LEVEL";
pub const ENV_DEFAULT_YEARS: &str = "BOREALIS_DEFAULTS_YEARS_IN_ORBIT";
pub const ENV_DEFAULT_ADJUSTMENT: &str = "BOREALIS_DEFAULTS_ADJUSTMENT_FACTOR";
pub const ENV_LOGGING_LEVEL: &str = "BOREALIS_LOGGING_LEVEL";
pub const ENV_LOGGING_FORMAT: &str = "BOREALIS_LOGGING_FORMAT";
pub const ENV_LOG_LEVEL_ALIAS: &str = "BOREALIS_LOG_LEVEL";
pub const ENV_LOG_FORMAT_ALIAS: &str = "BOREALIS_LOG_FORMAT";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub defaults: PolicyInputs,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub api_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                timeout_secs: 120,
                api_key: None,
            },
            defaults: PolicyInputs::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options
                .config_path
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(api_key) = api.api_key {
                self.api.api_key = Some(api_key.into());
            }
        }

        if let Some(defaults) = patch.defaults {
            if let Some(asset_value_millions) = defaults.asset_value_millions {
                self.defaults.asset_value_millions = asset_value_millions;
            }
            if let Some(shielding_level) = defaults.shielding_level {
                self.defaults.shielding_level = shielding_level;
            }
            if let Some(years_in_orbit) = defaults.years_in_orbit {
                self.defaults.years_in_orbit = years_in_orbit;
            }
            if let Some(adjustment_factor) = defaults.adjustment_factor {
                self.defaults.adjustment_factor = adjustment_factor;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env(ENV_API_BASE_URL) {
            self.api.base_url = value;
        }
        if let Some(value) = read_env(ENV_API_TIMEOUT_SECS) {
            self.api.timeout_secs = parse_env(ENV_API_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = read_env(ENV_API_KEY) {
            self.api.api_key = Some(value.into());
        }

        if let Some(value) = read_env(ENV_DEFAULT_ASSET_VALUE) {
            self.defaults.asset_value_millions = parse_env(ENV_DEFAULT_ASSET_VALUE, &value)?;
        }
        if let Some(value) = read_env(ENV_DEFAULT_SHIELDING) {
            self.defaults.shielding_level =
                value.parse::<ShieldingLevel>().map_err(|_: DomainError| {
                    ConfigError::InvalidEnvOverride {
                        key: ENV_DEFAULT_SHIELDING.to_string(),
                        value: value.clone(),
                    }
                })?;
        }
        if let Some(value) = read_env(ENV_DEFAULT_YEARS) {
            self.defaults.years_in_orbit = parse_env(ENV_DEFAULT_YEARS, &value)?;
        }
        if let Some(value) = read_env(ENV_DEFAULT_ADJUSTMENT) {
            self.defaults.adjustment_factor = parse_env(ENV_DEFAULT_ADJUSTMENT, &value)?;
        }

        let log_level = read_env(ENV_LOGGING_LEVEL).or_else(|| read_env(ENV_LOG_LEVEL_ALIAS));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env(ENV_LOGGING_FORMAT).or_else(|| read_env(ENV_LOG_FORMAT_ALIAS));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.api_base_url {
            self.api.base_url = base_url;
        }
        if let Some(timeout_secs) = overrides.api_timeout_secs {
            self.api.timeout_secs = timeout_secs;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_defaults(&self.defaults)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First existing config file, honouring an explicit path when given.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "api.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if api.api_key.as_ref().is_some_and(|key| key.expose_secret().trim().is_empty()) {
        return Err(ConfigError::Validation(
            "api.api_key is set but empty; remove it or provide a token".to_string(),
        ));
    }

    Ok(())
}

fn validate_defaults(defaults: &PolicyInputs) -> Result<(), ConfigError> {
    defaults.validate().map_err(|error| match error {
        DomainError::InvalidPolicyInput(message) => {
            ConfigError::Validation(format!("defaults: {message}"))
        }
        other => ConfigError::Validation(format!("defaults: {other}")),
    })
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    defaults: Option<DefaultsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsPatch {
    asset_value_millions: Option<f64>,
    shielding_level: Option<ShieldingLevel>,
    years_in_orbit: Option<u32>,
    adjustment_factor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
