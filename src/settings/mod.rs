//! Flat settings bag consumed by the S3 service.
//!
//! Settings are plain string key/value pairs. Parsing of settings files is
//! left to the host; this module only offers typed access, the global
//! credential fallbacks and secret filtering for display.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// `http` or `https`; defaults to `http`.
pub const PROTOCOL: &str = "protocol";
/// Static access key id.
pub const ACCESS_KEY: &str = "access_key";
/// Static secret access key.
pub const SECRET_KEY: &str = "secret_key";
/// Proxy host name.
pub const PROXY_HOST: &str = "proxy_host";
/// Proxy port; only read when [`PROXY_HOST`] is set.
pub const PROXY_PORT: &str = "proxy_port";
/// Explicit endpoint override.
pub const S3_ENDPOINT: &str = "s3_endpoint";
/// Dotted alias of [`S3_ENDPOINT`].
pub const S3_ENDPOINT_DOTTED: &str = "s3.endpoint";
/// Region name, mapped to an endpoint host.
pub const REGION: &str = "region";
/// Global fallback for [`ACCESS_KEY`].
pub const CLOUD_ACCOUNT: &str = "cloud.account";
/// Global fallback for [`SECRET_KEY`].
pub const CLOUD_KEY: &str = "cloud.key";

/// Protocol used when none is configured.
pub const DEFAULT_PROTOCOL: &str = "http";
/// Proxy port used when a proxy host is set without a port.
pub const DEFAULT_PROXY_PORT: &str = "80";

/// Prefix for settings read from the process environment.
pub const ENV_PREFIX: &str = "CLOUD_AWS_";

const FILTERED: &str = "[FILTERED]";
const SECRET_KEYS: [&str; 4] = [ACCESS_KEY, SECRET_KEY, CLOUD_ACCOUNT, CLOUD_KEY];

/// Flat configuration bag.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AwsSettings {
    values: BTreeMap<String, String>,
}

impl AwsSettings {
    /// Create an empty settings bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a settings builder.
    pub fn builder() -> AwsSettingsBuilder {
        AwsSettingsBuilder::default()
    }

    /// Build settings from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load settings from `CLOUD_AWS_*` environment variables.
    ///
    /// `CLOUD_AWS_S3_ENDPOINT` maps to `s3_endpoint`, `CLOUD_AWS_REGION` to
    /// `region` and so on. The global fallbacks are read from
    /// `CLOUD_ACCOUNT` and `CLOUD_KEY`. Empty variables are ignored.
    pub fn from_env() -> Self {
        let mut values = BTreeMap::new();

        for key in [
            PROTOCOL,
            ACCESS_KEY,
            SECRET_KEY,
            PROXY_HOST,
            PROXY_PORT,
            S3_ENDPOINT,
            REGION,
        ] {
            let var = format!("{}{}", ENV_PREFIX, key.to_uppercase());
            if let Ok(value) = std::env::var(&var) {
                if !value.is_empty() {
                    values.insert(key.to_string(), value);
                }
            }
        }

        for (key, var) in [(CLOUD_ACCOUNT, "CLOUD_ACCOUNT"), (CLOUD_KEY, "CLOUD_KEY")] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    values.insert(key.to_string(), value);
                }
            }
        }

        Self { values }
    }

    /// Get a raw setting.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a setting or a default.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Insert or replace a setting.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Whether no settings are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Configured protocol, lowercased; `http` when unset.
    pub fn protocol(&self) -> String {
        self.get_or(PROTOCOL, DEFAULT_PROTOCOL).to_lowercase()
    }

    /// Access key, falling back to `cloud.account`.
    pub fn access_key(&self) -> Option<&str> {
        self.get(ACCESS_KEY).or_else(|| self.get(CLOUD_ACCOUNT))
    }

    /// Secret key, falling back to `cloud.key`.
    pub fn secret_key(&self) -> Option<&str> {
        self.get(SECRET_KEY).or_else(|| self.get(CLOUD_KEY))
    }

    /// Proxy host, if any.
    pub fn proxy_host(&self) -> Option<&str> {
        self.get(PROXY_HOST)
    }

    /// Raw proxy port; `80` when unset.
    pub fn proxy_port(&self) -> &str {
        self.get_or(PROXY_PORT, DEFAULT_PROXY_PORT)
    }

    /// Explicit endpoint, accepting both key spellings.
    pub fn s3_endpoint(&self) -> Option<&str> {
        self.get(S3_ENDPOINT).or_else(|| self.get(S3_ENDPOINT_DOTTED))
    }

    /// Configured region, lowercased.
    pub fn region(&self) -> Option<String> {
        self.get(REGION).map(str::to_lowercase)
    }

    /// Copy of these settings with credential values masked.
    pub fn filtered(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(k, v)| {
                    if SECRET_KEYS.contains(&k.as_str()) {
                        (k.clone(), FILTERED.to_string())
                    } else {
                        (k.clone(), v.clone())
                    }
                })
                .collect(),
        }
    }

    /// Iterate over all settings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.filtered().values.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AwsSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Builder for [`AwsSettings`].
#[derive(Default)]
pub struct AwsSettingsBuilder {
    values: BTreeMap<String, String>,
}

impl AwsSettingsBuilder {
    fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Set the protocol.
    pub fn protocol(self, protocol: impl Into<String>) -> Self {
        self.with(PROTOCOL, protocol)
    }

    /// Set static credentials.
    pub fn credentials(self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.with(ACCESS_KEY, access_key).with(SECRET_KEY, secret_key)
    }

    /// Set the proxy host.
    pub fn proxy_host(self, host: impl Into<String>) -> Self {
        self.with(PROXY_HOST, host)
    }

    /// Set the proxy port.
    pub fn proxy_port(self, port: impl Into<String>) -> Self {
        self.with(PROXY_PORT, port)
    }

    /// Set an explicit endpoint.
    pub fn s3_endpoint(self, endpoint: impl Into<String>) -> Self {
        self.with(S3_ENDPOINT, endpoint)
    }

    /// Set the region.
    pub fn region(self, region: impl Into<String>) -> Self {
        self.with(REGION, region)
    }

    /// Set an arbitrary setting.
    pub fn setting(self, key: &str, value: impl Into<String>) -> Self {
        self.with(key, value)
    }

    /// Build the settings.
    pub fn build(self) -> AwsSettings {
        AwsSettings {
            values: self.values,
        }
    }
}
