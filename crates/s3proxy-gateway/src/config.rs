//! Gateway configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Gateway server configuration
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Time allowed until response headers are produced (0 disables)
    pub request_timeout_secs: u64,
    /// Sites to serve
    pub sites: SiteSource,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 60,
            sites: SiteSource::Multi(Vec::new()),
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-request timeout, if enabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// How the served sites were configured
#[derive(Clone, Debug)]
pub enum SiteSource {
    /// One site, no host routing
    Single(SiteConfig),
    /// Several sites routed by host
    Multi(Vec<SiteConfig>),
}

impl SiteSource {
    /// Multi-site mode from a JSON site list
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        parse_sites(json).map(Self::Multi)
    }

    /// Multi-site mode from a JSON file holding a site list
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Single-site mode; the site needs no host
    pub fn single(site: SiteConfig) -> Result<Self, ConfigError> {
        site.validate()?;
        Ok(Self::Single(site))
    }

    /// All configured sites
    pub fn sites(&self) -> &[SiteConfig] {
        match self {
            Self::Single(site) => std::slice::from_ref(site),
            Self::Multi(sites) => sites,
        }
    }
}

/// A user allowed to access a site
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "user")]
    pub name: String,
    pub password: String,
}

impl Credential {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("password", &"...")
            .finish()
    }
}

/// Per-site policy switches
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteOptions {
    /// Answer CORS preflights and add CORS headers
    pub cors: bool,
    /// Gzip responses for clients that accept it
    pub gzip: bool,
    /// Resolve directory paths to the bucket's index document
    pub website: bool,
    /// Prepended to every fetched key
    pub prefix: String,
    /// Redirect plain HTTP requests to HTTPS
    #[serde(rename = "forceSSL")]
    pub force_ssl: bool,
    /// Trust X-Forwarded-* headers from an upstream proxy
    pub proxied: bool,
}

/// Configuration of one virtual host
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub host: String,
    #[serde(rename = "awsKey", default)]
    pub store_key: String,
    #[serde(rename = "awsSecret", default)]
    pub store_secret: String,
    #[serde(rename = "awsRegion", default)]
    pub region: String,
    #[serde(rename = "awsBucket", default)]
    pub bucket: String,
    #[serde(rename = "awsEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub users: Vec<Credential>,
    #[serde(default)]
    pub options: SiteOptions,
}

impl std::fmt::Debug for SiteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteConfig")
            .field("host", &self.host)
            .field("store_key", &self.store_key)
            .field("store_secret", &"...")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("users", &self.users)
            .field("options", &self.options)
            .finish()
    }
}

impl SiteConfig {
    /// Check the store settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_key.is_empty() {
            return Err(ConfigError::Missing("AWS Key"));
        }
        if self.store_secret.is_empty() {
            return Err(ConfigError::Missing("AWS Secret"));
        }
        if self.region.is_empty() {
            return Err(ConfigError::Missing("AWS Region"));
        }
        if self.bucket.is_empty() {
            return Err(ConfigError::Missing("AWS Bucket"));
        }
        Ok(())
    }

    /// Check the store settings and the host, as required for routed sites
    pub fn validate_with_host(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Missing("Host"));
        }
        self.validate()
    }
}

/// Parse and validate a JSON list of sites
pub fn parse_sites(json: &str) -> Result<Vec<SiteConfig>, ConfigError> {
    if json.trim().is_empty() {
        return Err(ConfigError::NoSites);
    }

    let sites: Vec<SiteConfig> = serde_json::from_str(json)?;

    if sites.is_empty() {
        return Err(ConfigError::NoSites);
    }

    for (position, site) in sites.iter().enumerate() {
        site.validate_with_host().map_err(|err| ConfigError::AtPosition {
            position,
            source: Box::new(err),
        })?;
    }

    Ok(sites)
}

/// Parse `name:password` pairs separated by commas
pub fn parse_users(users: &str) -> Result<Vec<Credential>, ConfigError> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    users
        .split(',')
        .enumerate()
        .map(|(position, pair)| {
            let parts: Vec<&str> = pair.split(':').collect();
            match parts.as_slice() {
                [name, password] => Ok(Credential::new(*name, *password)),
                _ => Err(ConfigError::InvalidUser {
                    user: pair.to_string(),
                    position,
                }),
            }
        })
        .collect()
}
