//! Configuration types, loaded from the environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::conversation::DEFAULT_DISPATCH_TIMEOUT;
use crate::error::ConfigError;
use crate::pipeline::{AnalysisConfig, CommandRunner, HttpRunner, PipelineRunner};

pub const ENV_RUNNER: &str = "TRADING_CHAT_RUNNER";
pub const ENV_PIPELINE_CMD: &str = "TRADING_CHAT_PIPELINE_CMD";
pub const ENV_PIPELINE_URL: &str = "TRADING_CHAT_PIPELINE_URL";
pub const ENV_PIPELINE_TOKEN: &str = "TRADING_CHAT_PIPELINE_TOKEN";
pub const ENV_BASE_CONFIG: &str = "TRADING_CHAT_BASE_CONFIG";
pub const ENV_DISPATCH_TIMEOUT_SECS: &str = "TRADING_CHAT_DISPATCH_TIMEOUT_SECS";
pub const ENV_WS_PORT: &str = "TRADING_CHAT_WS_PORT";
pub const ENV_CLI: &str = "TRADING_CHAT_CLI";

/// How the analysis pipeline is reached.
#[derive(Debug, Clone)]
pub enum RunnerConfig {
    /// Spawn a local command (program plus whitespace-separated args).
    Command { command_line: String },
    /// POST to a remote endpoint.
    Http {
        url: String,
        token: Option<SecretString>,
    },
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub runner: RunnerConfig,
    /// Optional JSON file holding the base analysis config.
    pub base_config_path: Option<PathBuf>,
    /// Upper bound on one pipeline run.
    pub dispatch_timeout: Duration,
    /// Port for the WebSocket chat server; disabled when unset.
    pub ws_port: Option<u16>,
    /// Whether to run the stdin/stdout REPL.
    pub cli_enabled: bool,
}

impl AppConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let runner = match get(ENV_RUNNER).as_deref().unwrap_or("command") {
            "command" => RunnerConfig::Command {
                command_line: get(ENV_PIPELINE_CMD)
                    .ok_or_else(|| ConfigError::MissingEnvVar(ENV_PIPELINE_CMD.to_string()))?,
            },
            "http" => RunnerConfig::Http {
                url: get(ENV_PIPELINE_URL)
                    .ok_or_else(|| ConfigError::MissingEnvVar(ENV_PIPELINE_URL.to_string()))?,
                token: get(ENV_PIPELINE_TOKEN).map(SecretString::from),
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: ENV_RUNNER.to_string(),
                    message: format!("expected 'command' or 'http', got '{other}'"),
                });
            }
        };

        let dispatch_timeout = match get(ENV_DISPATCH_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_DISPATCH_TIMEOUT_SECS.to_string(),
                        message: format!("expected a positive number of seconds, got '{raw}'"),
                    });
                }
            },
            None => DEFAULT_DISPATCH_TIMEOUT,
        };

        let ws_port = get(ENV_WS_PORT)
            .map(|raw| {
                raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                    key: ENV_WS_PORT.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        let cli_enabled = match get(ENV_CLI).map(|v| v.to_lowercase()) {
            None => true,
            Some(v) => match v.as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_CLI.to_string(),
                        message: format!("expected true or false, got '{v}'"),
                    });
                }
            },
        };

        if !cli_enabled && ws_port.is_none() {
            return Err(ConfigError::InvalidValue {
                key: ENV_CLI.to_string(),
                message: format!("CLI is disabled and {ENV_WS_PORT} is not set, nothing to serve"),
            });
        }

        Ok(Self {
            runner,
            base_config_path: get(ENV_BASE_CONFIG).map(PathBuf::from),
            dispatch_timeout,
            ws_port,
            cli_enabled,
        })
    }

    /// Base analysis config: the configured file, or built-in defaults.
    pub fn load_base_config(&self) -> Result<AnalysisConfig, ConfigError> {
        match self.base_config_path {
            Some(ref path) => AnalysisConfig::load(path),
            None => Ok(AnalysisConfig::default()),
        }
    }

    /// Create the pipeline runner this config describes.
    pub fn build_runner(&self) -> Result<Arc<dyn PipelineRunner>, ConfigError> {
        match &self.runner {
            RunnerConfig::Command { command_line } => CommandRunner::from_command_line(command_line)
                .map(|r| Arc::new(r) as Arc<dyn PipelineRunner>)
                .ok_or_else(|| ConfigError::MissingEnvVar(ENV_PIPELINE_CMD.to_string())),
            RunnerConfig::Http { url, token } => {
                let mut runner = HttpRunner::new(url.clone());
                if let Some(token) = token {
                    runner = runner.with_token(token.clone());
                }
                Ok(Arc::new(runner))
            }
        }
    }
}
