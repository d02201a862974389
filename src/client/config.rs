use screenlive_types::Setup;

use crate::client::consts::{DEFAULT_RELAY_URL, RELAY_URL_ENV};

/// Client configuration. The relay owns the upstream credential, so the
/// client only needs an endpoint and the setup it announces on connect.
#[derive(Debug, Clone)]
pub struct Config {
    url: String,
    setup: Setup,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    pub fn with_setup(mut self, setup: Setup) -> Self {
        self.config.setup = setup;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            url: std::env::var(RELAY_URL_ENV).unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string()),
            setup: Setup::default(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
