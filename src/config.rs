//! Configuration loaded from `modelflow.toml`.
//!
//! Keys missing from the file fall back to defaults. `MODELFLOW_SYSTEM_ACTOR`
//! and `MODELFLOW_LOG_FORMAT` take precedence over the file.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ModelflowError, Result};

pub const CONFIG_FILE: &str = "modelflow.toml";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ModelflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ModelflowError::Config(format!("unknown log format `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelflowConfig {
    /// Actor recorded on history rows the library writes by itself.
    #[serde(default = "default_system_actor")]
    pub system_actor: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// strftime pattern for date and datetime attributes.
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
}

fn default_system_actor() -> String {
    "SYSTEM".to_string()
}

fn default_datetime_format() -> String {
    DEFAULT_DATETIME_FORMAT.to_string()
}

impl Default for ModelflowConfig {
    fn default() -> Self {
        Self {
            system_actor: default_system_actor(),
            log_format: LogFormat::default(),
            datetime_format: default_datetime_format(),
        }
    }
}

impl ModelflowConfig {
    /// Loads `modelflow.toml` from the working directory, or defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<ModelflowConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(actor) = std::env::var("MODELFLOW_SYSTEM_ACTOR")
            && !actor.trim().is_empty()
        {
            config.system_actor = actor;
        }
        if let Ok(format) = std::env::var("MODELFLOW_LOG_FORMAT")
            && !format.trim().is_empty()
        {
            config.log_format = format.parse()?;
        }

        if config.system_actor.trim().is_empty() {
            return Err(ModelflowError::Config("system_actor must not be empty".into()));
        }

        Ok(config)
    }
}
