//! Configuration management

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for the provider's call API. Overridable so tests can point
    /// the adapter at a local stand-in.
    pub call_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether inbound webhook signatures are checked. Only test harnesses
    /// may turn this off; there is no way to flip it at runtime.
    pub enforce_signatures: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            call_url: "https://api.nexmo.com/v1/calls".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enforce_signatures: true,
        }
    }
}

impl Config {
    /// Load configuration from an optional `switchboard.toml` file and
    /// `SWITCHBOARD_`-prefixed environment variables.
    pub fn load() -> anyhow::Result<Self> {
        use anyhow::Context;

        config::Config::builder()
            .add_source(config::File::with_name("switchboard").required(false))
            .add_source(config::Environment::with_prefix("SWITCHBOARD").separator("__"))
            .build()
            .context("reading switchboard configuration")?
            .try_deserialize()
            .context("deserializing switchboard configuration")
    }
}
