use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use borealis_core::config::{
    resolve_config_path, AppConfig, ConfigOverrides, LoadOptions, ENV_API_BASE_URL, ENV_API_KEY,
    ENV_API_TIMEOUT_SECS, ENV_DEFAULT_ADJUSTMENT, ENV_DEFAULT_ASSET_VALUE, ENV_DEFAULT_SHIELDING,
    ENV_DEFAULT_YEARS, ENV_LOGGING_FORMAT, ENV_LOGGING_LEVEL, ENV_LOG_FORMAT_ALIAS,
    ENV_LOG_LEVEL_ALIAS,
};
use toml::Value;

use crate::commands::{load_config, CommandResult, EXIT_OK};

const COMMAND: &str = "config";

struct SourceLookup {
    file_path: Option<PathBuf>,
    file_doc: Option<Value>,
    overrides: ConfigOverrides,
}

impl SourceLookup {
    fn new(options: &LoadOptions) -> Self {
        let file_path = resolve_config_path(options.config_path.as_deref());
        let file_doc = load_config_file_doc(file_path.as_deref());
        Self { file_path, file_doc, overrides: options.overrides.clone() }
    }

    fn flag(&self, key_path: &str) -> Option<&'static str> {
        let overrides = &self.overrides;
        match key_path {
            "api.base_url" if overrides.api_base_url.is_some() => Some("--base-url"),
            "api.timeout_secs" if overrides.api_timeout_secs.is_some() => Some("--timeout-secs"),
            "logging.level" if overrides.log_level.is_some() => Some("--log-level"),
            "logging.format" if overrides.log_format.is_some() => Some("--log-format"),
            _ => None,
        }
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(flag) = self.flag(key_path) {
            return format!("flag ({flag})");
        }

        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(**key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }

    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key_path} = {value} (source: {})", self.source(key_path, env_keys))
    }
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    CommandResult { exit_code: EXIT_OK, output: render(&config, &SourceLookup::new(options)) }
}

fn render(config: &AppConfig, sources: &SourceLookup) -> String {
    let api_key = if config.api.has_api_key() { "<redacted>" } else { "<unset>" };
    let defaults = &config.defaults;

    [
        "effective config (source precedence: flag > env > file > default):".to_string(),
        sources.line("api.base_url", &config.api.base_url, &[ENV_API_BASE_URL]),
        sources.line(
            "api.timeout_secs",
            &config.api.timeout_secs.to_string(),
            &[ENV_API_TIMEOUT_SECS],
        ),
        sources.line("api.api_key", api_key, &[ENV_API_KEY]),
        sources.line(
            "defaults.asset_value_millions",
            &defaults.asset_value_millions.to_string(),
            &[ENV_DEFAULT_ASSET_VALUE],
        ),
        sources.line(
            "defaults.shielding_level",
            defaults.shielding_level.as_str(),
            &[ENV_DEFAULT_SHIELDING],
        ),
        sources.line(
            "defaults.years_in_orbit",
            &defaults.years_in_orbit.to_string(),
            &[ENV_DEFAULT_YEARS],
        ),
        sources.line(
            "defaults.adjustment_factor",
            &defaults.adjustment_factor.to_string(),
            &[ENV_DEFAULT_ADJUSTMENT],
        ),
        sources.line(
            "logging.level",
            &config.logging.level,
            &[ENV_LOGGING_LEVEL, ENV_LOG_LEVEL_ALIAS],
        ),
        sources.line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            &[ENV_LOGGING_FORMAT, ENV_LOG_FORMAT_ALIAS],
        ),
    ]
    .join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
