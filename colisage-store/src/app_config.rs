use colisage_core::carrier::CarrierAccount;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub carrier: CarrierConfig,
    #[serde(default)]
    pub account: CarrierAccount,
}

/// Connection settings for the carrier adapter.
#[derive(Debug, Deserialize, Clone)]
pub struct CarrierConfig {
    pub api_url: String,
    pub account_number: String,
    pub private_key: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `COLISAGE__ACCOUNT__OVERSIZE_RELAY_SUPPORTED=true`
            .add_source(config::Environment::with_prefix("COLISAGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
