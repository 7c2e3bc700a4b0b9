use std::time::Duration;

use crate::error::LoaderError;

pub const USER_ENV: &str = "CELLDASH_ES_USER";
pub const PASSWORD_ENV: &str = "CELLDASH_ES_PASSWORD";

/// Store operations run with a long timeout sized for bulk batches of tens
/// of thousands of rows.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn resolve(host: &str, port: u16) -> Result<Self, LoaderError> {
        let username = read_env(USER_ENV)?;
        let password = read_env(PASSWORD_ENV)?;
        Ok(Self {
            host: host.to_string(),
            port,
            username,
            password,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

fn read_env(name: &'static str) -> Result<String, LoaderError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LoaderError::MissingCredentials(name.to_string())),
    }
}
