//! Chain credentials provider that tries multiple sources.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, S3Error};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Credentials provider that chains multiple providers.
///
/// The chain tries each provider in order until one succeeds. Credentials
/// are cached and refreshed when they expire or approach expiration.
pub struct ChainCredentialsProvider {
    providers: Vec<Arc<dyn CredentialsProvider>>,
    cached: RwLock<Option<CachedCredentials>>,
    /// Refresh credentials this many seconds before expiration.
    refresh_buffer_seconds: i64,
}

struct CachedCredentials {
    credentials: AwsCredentials,
    provider_name: &'static str,
}

impl ChainCredentialsProvider {
    /// Create a chain with the given providers, tried in order.
    pub fn with_providers(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self {
            providers,
            cached: RwLock::new(None),
            refresh_buffer_seconds: 300, // 5 minutes
        }
    }

    /// Set the refresh buffer (seconds before expiration to refresh).
    pub fn with_refresh_buffer(mut self, seconds: i64) -> Self {
        self.refresh_buffer_seconds = seconds;
        self
    }

    /// Add a provider to the end of the chain.
    pub fn add_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Names of the providers, in the order they are tried.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn should_refresh(&self, creds: &AwsCredentials) -> bool {
        if creds.is_expired() {
            return true;
        }

        creds.will_expire_within(chrono::Duration::seconds(self.refresh_buffer_seconds))
    }

    async fn try_providers(&self) -> Result<(AwsCredentials, &'static str), S3Error> {
        let mut last_error: Option<S3Error> = None;

        for provider in &self.providers {
            let name = provider.name();
            trace!("Trying credentials provider: {}", name);

            match provider.get_credentials().await {
                Ok(creds) => {
                    debug!("Credentials loaded from provider: {}", name);
                    return Ok((creds, name));
                }
                Err(e) => {
                    trace!("Provider {} failed: {:?}", name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(S3Error::Credentials(CredentialsError::NotFound)))
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
        {
            let cache = self.cached.read();
            if let Some(cached) = cache.as_ref() {
                if !self.should_refresh(&cached.credentials) {
                    trace!(
                        "Using cached credentials from provider: {}",
                        cached.provider_name
                    );
                    return Ok(cached.credentials.clone());
                }
            }
        }

        let (creds, name) = self.try_providers().await?;

        *self.cached.write() = Some(CachedCredentials {
            credentials: creds.clone(),
            provider_name: name,
        });

        Ok(creds)
    }

    async fn refresh_credentials(&self) -> Result<AwsCredentials, S3Error> {
        *self.cached.write() = None;
        self.get_credentials().await
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainCredentialsProvider")
            .field("providers", &self.provider_names())
            .field("refresh_buffer_seconds", &self.refresh_buffer_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentialsProvider;
    use crate::mocks::MockCredentialsProvider;

    struct FailingProvider;

    #[async_trait]
    impl CredentialsProvider for FailingProvider {
        async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
            Err(S3Error::Credentials(CredentialsError::NotFound))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_chain_uses_first_successful_provider() {
        let provider = ChainCredentialsProvider::with_providers(vec![
            Arc::new(FailingProvider),
            Arc::new(StaticCredentialsProvider::new(AwsCredentials::new("FIRST", "S1"))),
            Arc::new(StaticCredentialsProvider::new(AwsCredentials::new("SECOND", "S2"))),
        ]);

        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "FIRST");
    }

    #[tokio::test]
    async fn test_chain_stops_after_first_success() {
        let first = Arc::new(MockCredentialsProvider::new());
        let second = Arc::new(MockCredentialsProvider::new());
        let provider =
            ChainCredentialsProvider::with_providers(vec![first.clone(), second.clone()]);

        provider.get_credentials().await.unwrap();
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chain_caches_credentials() {
        let mock = Arc::new(MockCredentialsProvider::new());
        let provider = ChainCredentialsProvider::with_providers(vec![mock.clone()]);

        let first = provider.get_credentials().await.unwrap();
        let second = provider.get_credentials().await.unwrap();

        assert_eq!(first.access_key_id(), second.access_key_id());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_chain_refresh_clears_cache() {
        let mock = Arc::new(MockCredentialsProvider::new());
        let provider = ChainCredentialsProvider::with_providers(vec![mock.clone()]);

        provider.get_credentials().await.unwrap();
        provider.refresh_credentials().await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_chain_refreshes_expiring_credentials() {
        use chrono::{Duration, Utc};

        let expiring = AwsCredentials::temporary(
            "AKID",
            "SECRET",
            "TOKEN",
            Utc::now() + Duration::seconds(60),
        );
        let mock = Arc::new(MockCredentialsProvider::with_credentials(expiring));
        let provider =
            ChainCredentialsProvider::with_providers(vec![mock.clone()]).with_refresh_buffer(120);

        provider.get_credentials().await.unwrap();
        provider.get_credentials().await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_chain_fails_when_all_providers_fail() {
        let provider = ChainCredentialsProvider::with_providers(vec![
            Arc::new(FailingProvider),
            Arc::new(FailingProvider),
        ]);

        assert!(provider.get_credentials().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_chain_reports_not_found() {
        let provider = ChainCredentialsProvider::with_providers(Vec::new());
        assert!(provider.is_empty());

        let err = provider.get_credentials().await.unwrap_err();
        assert!(matches!(
            err,
            S3Error::Credentials(CredentialsError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_add_provider() {
        let provider = ChainCredentialsProvider::with_providers(vec![Arc::new(FailingProvider)])
            .add_provider(Arc::new(StaticCredentialsProvider::new(AwsCredentials::new(
                "AKID", "SECRET",
            ))));

        assert_eq!(provider.provider_names(), vec!["failing", "static"]);
        assert!(provider.get_credentials().await.is_ok());
    }
}
