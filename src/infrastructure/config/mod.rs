mod settings;

pub use settings::{MergeConfig, Settings, TelemetryConfig, TemplatesConfig};
