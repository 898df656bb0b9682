//! Connection settings for the MySQL backend

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_PORT: u16 = 3306;

/// Everything needed to open a MySQL pool.
///
/// `address` is `host` or `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MySqlConfig {
    pub address: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_max_connections() -> u32 {
    3
}

impl MySqlConfig {
    pub fn new(address: &str, username: &str, password: &str, database: &str) -> Self {
        Self {
            address: address.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            charset: default_charset(),
            max_connections: default_max_connections(),
        }
    }

    /// Read `ZORM_ADDRESS`, `ZORM_USERNAME`, `ZORM_PASSWORD`, `ZORM_DATABASE`
    /// and the optional `ZORM_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| Error::config(format!("{key} is not set")))
        };

        let mut config = Self::new(
            &required("ZORM_ADDRESS")?,
            &required("ZORM_USERNAME")?,
            &lookup("ZORM_PASSWORD").unwrap_or_default(),
            &required("ZORM_DATABASE")?,
        );
        if let Some(raw) = lookup("ZORM_MAX_CONNECTIONS") {
            config.max_connections = raw.trim().parse().map_err(|_| {
                Error::config(format!("ZORM_MAX_CONNECTIONS is not a number: {raw:?}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::config("address is empty"));
        }
        if self.database.trim().is_empty() {
            return Err(Error::config("database name is empty"));
        }
        if self.max_connections == 0 {
            return Err(Error::config("max_connections must be at least 1"));
        }
        self.host_and_port().map(|_| ())
    }

    /// Split `address` into host and port, defaulting the port to 3306
    pub fn host_and_port(&self) -> Result<(&str, u16)> {
        match self.address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| Error::config(format!("invalid port in address {:?}", self.address)))?;
                Ok((host, port))
            }
            None => Ok((self.address.as_str(), DEFAULT_PORT)),
        }
    }
}
