// Infrastructure layer (shared components)
pub mod infrastructure;

pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;

// Domain layer (business logic)
pub mod domain;

pub use domain::merge;
pub use domain::merge_tag;
pub use domain::template;

// Application layer
pub mod persistence;
pub mod service;

// Supporting modules
pub mod telemetry;
