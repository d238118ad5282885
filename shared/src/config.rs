use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;

/// Settings the shell hands to the core at launch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    pub directory_url: String,
    pub anon_key: String,
}

impl fmt::Debug for ShellConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellConfig")
            .field("directory_url", &self.directory_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid directory URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("directory API key is missing")]
    MissingAnonKey,
}

/// Validated runtime configuration.
pub struct AppConfig {
    directory_url: Url,
    anon_key: SecretString,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("directory_url", &self.directory_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_shell(config: ShellConfig) -> Result<Self, ConfigError> {
        let ShellConfig { directory_url, anon_key } = config;
        let directory_url = validate_url(&directory_url)?;
        if anon_key.trim().is_empty() {
            return Err(ConfigError::MissingAnonKey);
        }
        Ok(Self { directory_url, anon_key: SecretString::new(anon_key) })
    }

    /// Always ends in `/` so relative joins append.
    pub fn directory_url(&self) -> &Url {
        &self.directory_url
    }

    pub fn anon_key(&self) -> &SecretString {
        &self.anon_key
    }
}

fn validate_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: raw.chars().take(100).collect(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("URL cannot be empty"));
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(invalid("URL too long"));
    }

    let mut url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https are allowed"));
    }
    if url.host_str().is_none() {
        return Err(invalid("URL must have a host"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials in URL are not allowed"));
    }
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
