//! Configuration file and environment layering.

pub mod logging;
pub mod types;

pub use logging::LoggingConfig;
pub use types::{
    extract_config, load_config, print_schema, ApiConfig, Config, ConfigV1, EndpointsConfig,
    SessionConfig,
};
