//! Service configuration, layered from `config/base.toml` and environment
//! variables with the `LISTINGS` prefix.
use config_crate::{Config as RawConfig, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: Server,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: String,
    pub database: String,
    pub thread_count: usize,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = RawConfig::new();
        s.merge(File::with_name("config/base").required(false))?;
        s.merge(Environment::with_prefix("LISTINGS"))?;
        s.try_into()
    }
}
