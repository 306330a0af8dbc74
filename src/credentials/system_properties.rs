//! Process-wide system properties and the credentials provider backed by them.
//!
//! The host populates the table at startup (typically from `-D`-style
//! command line flags); the provider reads `aws.accessKeyId` and
//! `aws.secretKey` from it.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, S3Error};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Property holding the access key id.
pub const ACCESS_KEY_PROPERTY: &str = "aws.accessKeyId";
/// Property holding the secret key.
pub const SECRET_KEY_PROPERTY: &str = "aws.secretKey";

static GLOBAL: Lazy<Arc<SystemProperties>> = Lazy::new(|| Arc::new(SystemProperties::new()));

/// A string property table.
#[derive(Debug, Default)]
pub struct SystemProperties {
    values: RwLock<HashMap<String, String>>,
}

impl SystemProperties {
    /// Create an empty table, detached from the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table.
    pub fn global() -> Arc<SystemProperties> {
        GLOBAL.clone()
    }

    /// Set a property, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.write().insert(key.into(), value.into())
    }

    /// Get a property.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Remove a property, returning its value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// Parse `key=value` arguments, ignoring anything without an `=`.
    ///
    /// A leading `-D` is stripped, so raw JVM-style flags can be passed
    /// through unchanged.
    pub fn load_args<I, S>(&self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = self.values.write();
        for arg in args {
            let arg = arg.as_ref();
            let arg = arg.strip_prefix("-D").unwrap_or(arg);
            if let Some((key, value)) = arg.split_once('=') {
                if !key.is_empty() {
                    values.insert(key.to_string(), value.to_string());
                }
            }
        }
    }
}

/// Set a process-wide system property.
pub fn set(key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    GLOBAL.set(key, value)
}

/// Get a process-wide system property.
pub fn get(key: &str) -> Option<String> {
    GLOBAL.get(key)
}

/// Remove a process-wide system property.
pub fn remove(key: &str) -> Option<String> {
    GLOBAL.remove(key)
}

/// Credentials provider reading `aws.accessKeyId` / `aws.secretKey`.
#[derive(Debug, Clone)]
pub struct SystemPropertiesCredentialsProvider {
    properties: Arc<SystemProperties>,
}

impl SystemPropertiesCredentialsProvider {
    /// Create a provider over the process-wide table.
    pub fn new() -> Self {
        Self {
            properties: SystemProperties::global(),
        }
    }

    /// Create a provider over a specific table.
    pub fn with_properties(properties: Arc<SystemProperties>) -> Self {
        Self { properties }
    }

    fn read(&self, key: &str) -> Result<String, S3Error> {
        let value = self
            .properties
            .get(key)
            .ok_or(S3Error::Credentials(CredentialsError::NotFound))?;

        if value.trim().is_empty() {
            return Err(S3Error::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", key),
            }));
        }

        Ok(value.trim().to_string())
    }
}

impl Default for SystemPropertiesCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for SystemPropertiesCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
        let access_key_id = self.read(ACCESS_KEY_PROPERTY)?;
        let secret_access_key = self.read(SECRET_KEY_PROPERTY)?;
        Ok(AwsCredentials::new(access_key_id, secret_access_key))
    }

    fn name(&self) -> &'static str {
        "system_properties"
    }
}
