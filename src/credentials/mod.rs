//! AWS credentials management.
//!
//! This module provides the credential value type, the provider capability
//! and the providers the service chains together when no static key pair is
//! configured: environment variables, system properties and the instance
//! profile served by the metadata service.

mod chain;
mod env;
mod imds;
pub mod system_properties;

pub use chain::ChainCredentialsProvider;
pub use env::EnvCredentialsProvider;
pub use imds::{ImdsConfig, ImdsVersion, InstanceProfileCredentialsProvider};
pub use system_properties::SystemPropertiesCredentialsProvider;

use crate::error::{CredentialsError, S3Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

/// AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    /// Create new long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
            expiration: None,
        }
    }

    /// Create new temporary credentials with a session token.
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            session_token: Some(SecretString::new(session_token.into())),
            ..Self::new(access_key_id, secret_access_key)
        }
    }

    /// Create temporary credentials with expiration.
    pub fn temporary(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            expiration: Some(expiration),
            ..Self::with_session_token(access_key_id, secret_access_key, session_token)
        }
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    ///
    /// Note: This exposes the secret. Use carefully and avoid logging.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Get the expiration time, if any.
    pub fn expiration(&self) -> Option<&DateTime<Utc>> {
        self.expiration.as_ref()
    }

    /// Check if credentials have expired.
    pub fn is_expired(&self) -> bool {
        match &self.expiration {
            Some(exp) => Utc::now() >= *exp,
            None => false,
        }
    }

    /// Check if credentials will expire within the given duration.
    pub fn will_expire_within(&self, duration: chrono::Duration) -> bool {
        match &self.expiration {
            Some(exp) => Utc::now() + duration >= *exp,
            None => false,
        }
    }

    /// Check if credentials are temporary (have a session token).
    pub fn is_temporary(&self) -> bool {
        self.session_token.is_some()
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Trait for credential providers.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Get credentials from this provider.
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error>;

    /// Refresh credentials if possible.
    ///
    /// Default implementation returns current credentials.
    async fn refresh_credentials(&self) -> Result<AwsCredentials, S3Error> {
        self.get_credentials().await
    }

    /// Provider name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Static credentials provider for explicit configuration.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Create a new static credentials provider.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
        if self.credentials.is_expired() {
            return Err(S3Error::Credentials(CredentialsError::Expired {
                expiration: self
                    .credentials
                    .expiration()
                    .map(|e| e.to_rfc3339())
                    .unwrap_or_default(),
            }));
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Kinds of providers that can make up a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    Environment,
    /// `aws.accessKeyId` / `aws.secretKey` system properties.
    SystemProperties,
    /// Instance metadata service role credentials.
    InstanceProfile,
}

impl ProviderKind {
    /// Order used when no static credentials are configured.
    pub const DEFAULT_CHAIN: [ProviderKind; 3] = [
        ProviderKind::Environment,
        ProviderKind::SystemProperties,
        ProviderKind::InstanceProfile,
    ];

    /// Build a provider of this kind.
    pub fn provider(&self) -> Result<Arc<dyn CredentialsProvider>, S3Error> {
        let provider: Arc<dyn CredentialsProvider> = match self {
            ProviderKind::Environment => Arc::new(EnvCredentialsProvider::new()),
            ProviderKind::SystemProperties => Arc::new(SystemPropertiesCredentialsProvider::new()),
            ProviderKind::InstanceProfile => Arc::new(InstanceProfileCredentialsProvider::new()?),
        };
        Ok(provider)
    }
}

/// Where the client's credentials come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// A fixed key pair from settings.
    Static(AwsCredentials),
    /// An ordered fallback chain; the first provider that succeeds wins.
    Chained(Vec<ProviderKind>),
}

impl CredentialSource {
    /// The fallback chain used when no keys are configured.
    pub fn default_chain() -> Self {
        CredentialSource::Chained(ProviderKind::DEFAULT_CHAIN.to_vec())
    }

    /// Build the provider chain for this source.
    ///
    /// No credentials are fetched here; providers resolve lazily.
    pub fn provider(&self) -> Result<ChainCredentialsProvider, S3Error> {
        match self {
            CredentialSource::Static(credentials) => {
                Ok(ChainCredentialsProvider::with_providers(vec![Arc::new(
                    StaticCredentialsProvider::new(credentials.clone()),
                )]))
            }
            CredentialSource::Chained(kinds) => {
                let providers = kinds
                    .iter()
                    .map(ProviderKind::provider)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ChainCredentialsProvider::with_providers(providers))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_new() {
        let creds = AwsCredentials::new("AKID", "SECRET");
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.secret_access_key(), "SECRET");
        assert!(creds.session_token().is_none());
        assert!(!creds.is_temporary());
    }

    #[test]
    fn test_credentials_expiration() {
        use chrono::Duration;

        let creds = AwsCredentials::new("AKID", "SECRET");
        assert!(!creds.is_expired());
        assert!(!creds.will_expire_within(Duration::hours(1)));

        let expired = AwsCredentials::temporary(
            "AKID",
            "SECRET",
            "TOKEN",
            Utc::now() - Duration::hours(1),
        );
        assert!(expired.is_expired());
        assert!(expired.is_temporary());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = AwsCredentials::with_session_token("AKID", "SECRET", "TOKEN");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("AKID"));
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("TOKEN"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticCredentialsProvider::new(AwsCredentials::new("AKID", "SECRET"));
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(provider.name(), "static");
    }

    #[tokio::test]
    async fn test_static_provider_expired() {
        let expired = AwsCredentials::temporary(
            "AKID",
            "SECRET",
            "TOKEN",
            Utc::now() - chrono::Duration::hours(1),
        );
        let provider = StaticCredentialsProvider::new(expired);
        assert!(provider.get_credentials().await.is_err());
    }

    #[test]
    fn test_default_chain_order() {
        match CredentialSource::default_chain() {
            CredentialSource::Chained(kinds) => assert_eq!(
                kinds,
                vec![
                    ProviderKind::Environment,
                    ProviderKind::SystemProperties,
                    ProviderKind::InstanceProfile,
                ]
            ),
            other => panic!("expected chain, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_source_builds_providers_in_order() {
        let provider = CredentialSource::default_chain().provider().unwrap();
        assert_eq!(
            provider.provider_names(),
            vec!["environment", "system_properties", "instance_profile"]
        );
    }

    #[tokio::test]
    async fn test_static_source_resolves() {
        let source = CredentialSource::Static(AwsCredentials::new("AKID", "SECRET"));
        let provider = source.provider().unwrap();
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
    }
}
