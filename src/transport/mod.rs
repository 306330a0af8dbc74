//! reqwest-backed storage client.
//!
//! This is the default [`StorageConnector`]: it turns a
//! [`ClientConfiguration`] into a pooled `reqwest::Client` with the
//! configured proxy, timeouts and protocol restrictions.

use crate::client::{StorageClient, StorageConnector};
use crate::config::{ClientConfiguration, Protocol};
use crate::credentials::CredentialsProvider;
use crate::error::{ConfigurationError, LifecycleError, NetworkError, S3Error};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Endpoint used when neither an explicit endpoint nor a region is set.
pub const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

/// Connector producing [`ReqwestStorageClient`]s.
#[derive(Debug, Clone, Default)]
pub struct ReqwestConnector;

impl ReqwestConnector {
    /// Create a new connector.
    pub fn new() -> Self {
        Self
    }

    fn build_http_client(config: &ClientConfiguration) -> Result<reqwest::Client, S3Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .user_agent(&config.user_agent)
            .https_only(config.protocol == Protocol::Https);

        if let Some(proxy) = &config.proxy {
            proxy.validate()?;
            let proxy = reqwest::Proxy::all(proxy.url()).map_err(|e| {
                S3Error::Configuration(ConfigurationError::InvalidConfiguration {
                    field: "proxy_host".to_string(),
                    message: format!("Invalid proxy: {}", e),
                })
            })?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(|e| {
            S3Error::Network(NetworkError::TlsError {
                message: e.to_string(),
            })
        })
    }
}

impl StorageConnector for ReqwestConnector {
    fn construct(
        &self,
        credentials: Arc<dyn CredentialsProvider>,
        config: &ClientConfiguration,
    ) -> Result<Box<dyn StorageClient>, S3Error> {
        let http = Self::build_http_client(config)?;
        debug!(
            "Built s3 http client: protocol [{}], proxy [{:?}]",
            config.protocol, config.proxy
        );

        Ok(Box::new(ReqwestStorageClient {
            http: RwLock::new(Some(http)),
            credentials,
            config: config.clone(),
            endpoint: None,
        }))
    }
}

/// Storage client holding a pooled `reqwest::Client`.
pub struct ReqwestStorageClient {
    http: RwLock<Option<reqwest::Client>>,
    credentials: Arc<dyn CredentialsProvider>,
    config: ClientConfiguration,
    endpoint: Option<String>,
}

impl ReqwestStorageClient {
    /// Base URL requests are sent to.
    ///
    /// An endpoint that already carries a scheme is used as is; a bare
    /// host gets the configured protocol's scheme.
    pub fn base_url(&self) -> Result<Url, S3Error> {
        let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let raw = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("{}://{}", self.config.protocol.scheme(), endpoint)
        };

        Url::parse(&raw).map_err(|e| {
            S3Error::Configuration(ConfigurationError::InvalidConfiguration {
                field: "s3_endpoint".to_string(),
                message: format!("[{}] is not a valid endpoint: {}", endpoint, e),
            })
        })
    }

    /// The underlying HTTP client, unless the client has been shut down.
    pub fn http_client(&self) -> Result<reqwest::Client, S3Error> {
        self.http
            .read()
            .clone()
            .ok_or(S3Error::Lifecycle(LifecycleError::Closed))
    }
}

impl StorageClient for ReqwestStorageClient {
    fn set_endpoint(&mut self, endpoint: &str) {
        self.endpoint = Some(endpoint.to_string());
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn credentials(&self) -> Arc<dyn CredentialsProvider> {
        self.credentials.clone()
    }

    fn configuration(&self) -> &ClientConfiguration {
        &self.config
    }

    fn shutdown(&self) {
        // Dropping the client closes its idle pooled connections.
        if self.http.write().take().is_some() {
            debug!(
                "Shut down s3 http client for [{}]",
                self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
            );
        }
    }

    fn is_shutdown(&self) -> bool {
        self.http.read().is_none()
    }
}

impl std::fmt::Debug for ReqwestStorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestStorageClient")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .field("credentials", &self.credentials.name())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
