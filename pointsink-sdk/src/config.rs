//! Environment-sourced connection configuration.
//!
//! The sink reads its connection parameters from the ambient environment.
//! Every variable is required and must be non-empty; a missing one is a
//! fatal error raised before any network call.

use crate::SinkError;

/// Environment variable holding the endpoint URL.
pub const ENV_URL: &str = "INFLUXDB_URL";
/// Environment variable holding the organization name.
pub const ENV_ORG: &str = "INFLUXDB_ORG";
/// Environment variable holding the authentication token.
pub const ENV_TOKEN: &str = "INFLUXDB_TOKEN";
/// Environment variable holding the target bucket name.
pub const ENV_BUCKET: &str = "INFLUXDB_BUCKET";

/// Connection parameters for a sink. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint URL (e.g., "http://localhost:8086").
    pub url: String,
    /// Organization name.
    pub org: String,
    /// Authentication token.
    pub token: String,
    /// Target bucket name.
    pub bucket: String,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// Requires [`ENV_URL`], [`ENV_ORG`], [`ENV_TOKEN`], and [`ENV_BUCKET`]
    /// to be set and non-empty; the error names the first variable that is
    /// not.
    pub fn from_env() -> Result<Self, SinkError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create a builder for explicit construction.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SinkError> {
        let require = |var: &'static str| -> Result<String, SinkError> {
            match lookup(var) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(SinkError::Config { var }),
            }
        };

        Ok(Self {
            url: require(ENV_URL)?,
            org: require(ENV_ORG)?,
            token: require(ENV_TOKEN)?,
            bucket: require(ENV_BUCKET)?,
        })
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    url: Option<String>,
    org: Option<String>,
    token: Option<String>,
    bucket: Option<String>,
}

impl ConfigBuilder {
    /// Set the endpoint URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the organization name.
    pub fn org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    /// Set the authentication token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the target bucket name.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Build the configuration, validating that every value is present and
    /// non-empty. The error names the corresponding environment variable.
    pub fn build(self) -> Result<Config, SinkError> {
        let require = |value: Option<String>, var: &'static str| -> Result<String, SinkError> {
            match value {
                Some(v) if !v.is_empty() => Ok(v),
                _ => Err(SinkError::Config { var }),
            }
        };

        Ok(Config {
            url: require(self.url, ENV_URL)?,
            org: require(self.org, ENV_ORG)?,
            token: require(self.token, ENV_TOKEN)?,
            bucket: require(self.bucket, ENV_BUCKET)?,
        })
    }
}
