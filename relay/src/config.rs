//! Relay configuration, resolved once at startup from the environment and
//! injected into the server. The upstream key lives in a `SecretString` and
//! is never logged.

use std::env;

use secrecy::SecretString;
use tracing::Level;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 9083;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: SecretString,
    pub model: String,
    pub listen_addr: String,
    pub listen_port: u16,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidVar(String, String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_API_KEY`: Secret key for the upstream Gemini API. Required.
    // *   `GEMINI_MODEL`: (Optional) Upstream model. Defaults to "gemini-2.0-flash-exp".
    // *   `LISTEN_ADDR` / `LISTEN_PORT`: (Optional) Local listening surface. Defaults to 0.0.0.0:9083.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if absent.
        dotenvy::dotenv().ok();

        let api_key = env::var("GEMINI_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY must be set".to_string()))?;

        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let listen_addr =
            env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_port = match env::var("LISTEN_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidVar("LISTEN_PORT".to_string(), raw))?,
            Err(_) => DEFAULT_LISTEN_PORT,
        };

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            api_key,
            model,
            listen_addr,
            listen_port,
            log_level,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests share process state, so everything lives in one test.
    #[test]
    fn from_env_defaults_and_errors() {
        unsafe {
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("GEMINI_MODEL");
            env::remove_var("LISTEN_ADDR");
            env::remove_var("LISTEN_PORT");
            env::remove_var("RUST_LOG");
        }
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar(_))
        ));

        unsafe {
            env::set_var("GEMINI_API_KEY", "test-key");
        }
        let config = Config::from_env().expect("config with defaults");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.listen_addr(), "0.0.0.0:9083");
        assert_eq!(config.log_level, Level::INFO);
        // Debug output must not leak the key.
        assert!(!format!("{:?}", config).contains("test-key"));

        unsafe {
            env::set_var("LISTEN_PORT", "not-a-port");
        }
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidVar(_, _))
        ));

        unsafe {
            env::remove_var("LISTEN_PORT");
            env::remove_var("GEMINI_API_KEY");
        }
    }
}
