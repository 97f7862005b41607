//! Batch configuration loaded from YAML.
//!
//! Everything is validated up front; a config that passes `validate` cannot
//! fail generation later.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::entities::{Bounds, Location, Method, Profile, RunContext};
use crate::error::{configuration_error, Error};

pub const BASE_URL_ENV: &str = "ROUTE_SERVICE_BASE_URL";

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_output_directory() -> String {
    "output/routes".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub route_generator: RouteGeneratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteGeneratorConfig {
    pub route_count: usize,
    pub method: Method,

    #[serde(default)]
    /// Key into `country_bounds`; only used by the random method.
    pub country: String,

    #[serde(default)]
    pub country_bounds: HashMap<String, Bounds>,

    #[serde(default)]
    /// Named points for the permutation method.
    pub location_set: Vec<Location>,

    #[serde(default)]
    pub profile: ProfileSelection,

    #[serde(default)]
    pub random_seed: u64,

    pub route_service: RouteServiceConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteServiceConfig {
    pub base_url: String,

    #[serde(default = "default_timeout_seconds")]
    /// Per-attempt timeout.
    pub timeout_seconds: u64,

    #[serde(default = "default_max_concurrent_requests")]
    /// Upper bound on simultaneous calls to the route service.
    pub max_concurrent_requests: usize,

    #[serde(default)]
    /// Stop dispatching new requests after this many seconds. Unbounded when absent.
    pub deadline_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSelection {
    #[default]
    Car,
    Bike,
    Foot,
    /// Draw a profile per request from the generator's RNG.
    Random,
}

impl ProfileSelection {
    pub fn fixed(&self) -> Option<Profile> {
        match self {
            Self::Car => Some(Profile::Car),
            Self::Bike => Some(Profile::Bike),
            Self::Foot => Some(Profile::Foot),
            Self::Random => None,
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            configuration_error(format!("failed to read {}: {}", path.display(), err))
        })?;

        let mut config = Self::from_yaml_bytes(&bytes)?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_yaml_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_yaml::from_slice(bytes)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), Error> {
        match env::var(BASE_URL_ENV) {
            Ok(base_url) => self.route_generator.route_service.base_url = base_url,
            Err(env::VarError::NotPresent) => (),
            Err(err) => return Err(err.into()),
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        let rg = &self.route_generator;

        if rg.route_count == 0 {
            return Err(configuration_error("route_count must be positive"));
        }

        match rg.method {
            Method::Random => {
                self.bounds()?.validate().map_err(|err| {
                    configuration_error(format!("country_bounds: {}", err.message))
                })?;
            }
            Method::Permutation => {
                if rg.location_set.len() < 2 {
                    return Err(configuration_error(
                        "location_set must contain at least 2 locations for permutation method",
                    ));
                }
                for location in &rg.location_set {
                    location.coordinates().validate().map_err(|err| {
                        configuration_error(format!("location {}: {}", location.name, err.message))
                    })?;
                }
            }
        }

        if rg.route_service.max_concurrent_requests == 0 {
            return Err(configuration_error("max_concurrent_requests must be positive"));
        }

        if rg.route_service.timeout_seconds == 0 {
            return Err(configuration_error("timeout_seconds must be positive"));
        }

        if rg.route_service.base_url.is_empty() {
            return Err(configuration_error("route_service.base_url must be set"));
        }

        Ok(())
    }

    pub fn bounds(&self) -> Result<Bounds, Error> {
        let rg = &self.route_generator;

        rg.country_bounds
            .get(&rg.country)
            .copied()
            .ok_or_else(|| {
                configuration_error(format!("country bounds not defined for {}", rg.country))
            })
    }

    pub fn run_context(&self) -> RunContext {
        let rg = &self.route_generator;

        match rg.method {
            Method::Random => RunContext::Country(rg.country.clone()),
            Method::Permutation => RunContext::Locations(rg.location_set.len()),
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.route_generator.route_service.timeout_seconds)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.route_generator
            .route_service
            .deadline_seconds
            .map(Duration::from_secs)
    }

    pub fn workers(&self) -> usize {
        self.route_generator.route_service.max_concurrent_requests
    }
}
