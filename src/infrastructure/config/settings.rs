use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::domain::merge::{MergeOptions, DEFAULT_MAX_INLINE_BYTES};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Leave `{{identifier}}` in the output when no value is supplied
    #[serde(default)]
    pub keep_unresolved_placeholders: bool,
    /// Largest decoded inline image in bytes
    #[serde(default = "default_max_inline_image_bytes")]
    pub max_inline_image_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Culture used by the CLI when a fixture does not name one
    #[serde(default = "default_culture")]
    pub default_culture: String,
    /// Subject length limit enforced by the service
    #[serde(default = "default_max_subject_length")]
    pub max_subject_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of the human readable format
    #[serde(default)]
    pub json: bool,
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_max_inline_image_bytes() -> usize {
    DEFAULT_MAX_INLINE_BYTES
}

fn default_culture() -> String {
    "en-US".to_string()
}

fn default_max_subject_length() -> usize {
    998 // RFC 5322 line limit
}

fn default_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("merge.keep_unresolved_placeholders", false)?
            .set_default("merge.max_inline_image_bytes", DEFAULT_MAX_INLINE_BYTES as u64)?
            .set_default("templates.default_culture", "en-US")?
            .set_default("templates.max_subject_length", 998)?
            .set_default("telemetry.json", false)?
            .set_default("telemetry.level", "info")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // ARA_MERGE__MAX_INLINE_IMAGE_BYTES, ARA_TELEMETRY__JSON, etc.
            .add_source(
                Environment::with_prefix("ARA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            keep_unresolved_placeholders: false,
            max_inline_image_bytes: default_max_inline_image_bytes(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            default_culture: default_culture(),
            max_subject_length: default_max_subject_length(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: default_level(),
        }
    }
}

impl From<&MergeConfig> for MergeOptions {
    fn from(config: &MergeConfig) -> Self {
        Self {
            keep_unresolved_placeholders: config.keep_unresolved_placeholders,
            escape_html: true,
            max_inline_image_bytes: config.max_inline_image_bytes,
        }
    }
}
