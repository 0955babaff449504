use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: where the API lives, its endpoint paths,
/// session behaviour and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load config from "config.yaml" in the current directory, with
/// `PHOTONDAM_`-prefixed environment variables layered on top
/// (nested keys use `__`, e.g. `PHOTONDAM_API__BASE_URL`).
pub fn load_config() -> ConfigV1 {
    let figment = Figment::new()
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("PHOTONDAM_").split("__"));
    match extract_config(figment) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Extract a versioned config from any figment. Migrations between config
/// versions belong here.
pub fn extract_config(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Location of the remote REST API.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_in_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }
}

fn default_request_timeout() -> u64 {
    30_000
}

/// Relative paths of the endpoints the client talks to.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct EndpointsConfig {
    pub login: String,
    pub refresh: String,
    pub profile: String,
    pub logout: String,
    pub register: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        EndpointsConfig {
            login: "auth/login".to_string(),
            refresh: "/jwt/refresh/".to_string(),
            profile: "/profile/".to_string(),
            logout: "auth/logout".to_string(),
            register: "/register/".to_string(),
        }
    }
}

/// Session lifecycle settings: where to send the user and how long a
/// credential refresh may take before it counts as failed.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    pub refresh_timeout_in_ms: u64,
    pub sign_in_path: String,
    pub home_path: String,
}

impl SessionConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_in_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            refresh_timeout_in_ms: 10_000,
            sign_in_path: "/sign-in".to_string(),
            home_path: "/".to_string(),
        }
    }
}
