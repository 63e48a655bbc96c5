use std::{env, net::SocketAddr};

const DEFAULT_ADDRESS: &str = "0.0.0.0:6060";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid listen address")]
    InvalidAddress(#[from] std::net::AddrParseError),

    // tower-cookies private cookies derive their key from this value
    #[error("COOKIE_SECRET must be at least 64 bytes")]
    CookieSecretTooShort,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub address: SocketAddr,
    pub cookie_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let address = env::var("ADDRESS")
            .unwrap_or_else(|_| DEFAULT_ADDRESS.to_string())
            .parse()?;

        let cookie_secret =
            env::var("COOKIE_SECRET").map_err(|_| ConfigError::MissingVar("COOKIE_SECRET"))?;

        if cookie_secret.len() < 64 {
            return Err(ConfigError::CookieSecretTooShort);
        }

        Ok(Self {
            database_url,
            address,
            cookie_secret,
        })
    }
}
