//! The S3 service: settings in, one shared storage client out.
//!
//! [`S3Service::client`] resolves the settings, builds the client on first
//! use and hands the same handle to every caller afterwards. Construction is
//! serialized, so concurrent first callers still produce exactly one client.
//! A failed construction caches nothing; the next call resolves again.

use crate::client::{StorageClient, StorageConnector};
use crate::config::{endpoint_for_region, ClientConfiguration, Protocol, ProxyConfig};
use crate::credentials::{AwsCredentials, CredentialSource, CredentialsProvider};
use crate::error::{ConfigurationError, LifecycleError, S3Error};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::settings::{self, AwsSettings};
use crate::transport::ReqwestConnector;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, trace};

/// Shared handle to the constructed storage client.
pub type ClientHandle = Arc<dyn StorageClient>;

/// Everything the settings resolve to, before any client is built.
#[derive(Debug, Clone)]
pub struct ResolvedClientConfig {
    /// Transport configuration (protocol, proxy, timeouts).
    pub client_config: ClientConfiguration,
    /// Where credentials come from.
    pub credentials: CredentialSource,
    /// Endpoint override; `None` keeps the client default.
    pub endpoint: Option<String>,
}

/// Lazily constructs and owns the storage client.
pub struct S3Service {
    settings: AwsSettings,
    base_config: ClientConfiguration,
    connector: Arc<dyn StorageConnector>,
    client: OnceCell<ClientHandle>,
    lifecycle: Lifecycle,
}

impl S3Service {
    /// Create a service over the given settings using the reqwest connector.
    pub fn new(settings: AwsSettings) -> Self {
        Self::builder().settings(settings).build()
    }

    /// Create a service from `CLOUD_AWS_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(AwsSettings::from_env())
    }

    /// Create a service builder.
    pub fn builder() -> S3ServiceBuilder {
        S3ServiceBuilder::default()
    }

    /// Settings the service was created with.
    pub fn settings(&self) -> &AwsSettings {
        &self.settings
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether the client has been constructed.
    pub fn is_initialized(&self) -> bool {
        self.client.get().is_some()
    }

    /// Get the shared client, constructing it on first use.
    pub fn client(&self) -> Result<ClientHandle, S3Error> {
        if self.lifecycle.is_closed() {
            return Err(S3Error::Lifecycle(LifecycleError::Closed));
        }

        let client = self
            .client
            .get_or_try_init(|| self.build_client())
            .map(Arc::clone)?;

        // close() may have raced with the first construction
        if self.lifecycle.is_closed() {
            client.shutdown();
            return Err(S3Error::Lifecycle(LifecycleError::Closed));
        }

        Ok(client)
    }

    /// Resolve settings into a client configuration without building a
    /// client or performing any I/O.
    pub fn resolve(
        settings: &AwsSettings,
        base: &ClientConfiguration,
    ) -> Result<ResolvedClientConfig, S3Error> {
        let protocol: Protocol = settings.protocol().parse()?;

        let mut builder = ClientConfiguration::builder()
            .protocol(protocol)
            .user_agent(base.user_agent.clone())
            .connect_timeout(base.connect_timeout)
            .read_timeout(base.read_timeout)
            .max_connections(base.max_connections);

        if let Some(host) = settings.proxy_host() {
            let port = ProxyConfig::parse_port(settings.proxy_port())?;
            builder = builder.proxy(host, port);
        }

        let client_config = builder.build()?;
        let credentials = resolve_credentials(settings)?;
        let endpoint = resolve_endpoint(settings)?;

        Ok(ResolvedClientConfig {
            client_config,
            credentials,
            endpoint,
        })
    }

    fn build_client(&self) -> Result<ClientHandle, S3Error> {
        trace!("Constructing s3 client");
        let resolved = Self::resolve(&self.settings, &self.base_config)?;

        let credentials: Arc<dyn CredentialsProvider> = Arc::new(resolved.credentials.provider()?);
        let mut client = self
            .connector
            .construct(credentials, &resolved.client_config)?;

        if let Some(endpoint) = &resolved.endpoint {
            client.set_endpoint(endpoint);
        }

        Ok(Arc::from(client))
    }

    /// Start the component. Nothing is constructed here.
    pub fn start(&self) -> Result<(), S3Error> {
        if self.lifecycle.move_to_started()? {
            debug!("Started s3 service");
        }
        Ok(())
    }

    /// Stop the component. The client, if any, stays usable.
    ///
    /// Stopping a component that was never started does nothing.
    pub fn stop(&self) -> Result<(), S3Error> {
        if self.lifecycle.move_to_stopped()? {
            debug!("Stopped s3 service");
        }
        Ok(())
    }

    /// Close the component and release the client if one was built.
    ///
    /// Calling this more than once has no further effect.
    pub fn close(&self) {
        let Some(previous) = self.lifecycle.move_to_closed() else {
            return;
        };
        if previous == LifecycleState::Started {
            debug!("Stopped s3 service");
        }

        if let Some(client) = self.client.get() {
            client.shutdown();
            debug!("Released s3 client");
        }
    }
}

impl Drop for S3Service {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for S3Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Service")
            .field("settings", &self.settings)
            .field("state", &self.lifecycle.state())
            .field("client", &self.client.get())
            .finish_non_exhaustive()
    }
}

fn resolve_credentials(settings: &AwsSettings) -> Result<CredentialSource, S3Error> {
    match (settings.access_key(), settings.secret_key()) {
        (None, None) => Ok(CredentialSource::default_chain()),
        (Some(access_key), Some(secret_key)) => Ok(CredentialSource::Static(
            AwsCredentials::new(access_key, secret_key),
        )),
        (Some(_), None) => Err(S3Error::Configuration(
            ConfigurationError::IncompleteCredentials {
                present: settings::ACCESS_KEY,
                missing: settings::SECRET_KEY,
            },
        )),
        (None, Some(_)) => Err(S3Error::Configuration(
            ConfigurationError::IncompleteCredentials {
                present: settings::SECRET_KEY,
                missing: settings::ACCESS_KEY,
            },
        )),
    }
}

fn resolve_endpoint(settings: &AwsSettings) -> Result<Option<String>, S3Error> {
    if let Some(endpoint) = settings.s3_endpoint() {
        debug!("using explicit s3 endpoint [{}]", endpoint);
        return Ok(Some(endpoint.to_string()));
    }

    let Some(region) = settings.region() else {
        return Ok(None);
    };

    let endpoint = endpoint_for_region(&region).ok_or_else(|| {
        S3Error::Configuration(ConfigurationError::UnknownRegion {
            region: region.clone(),
        })
    })?;
    debug!("using s3 region [{}], with endpoint [{}]", region, endpoint);

    Ok(Some(endpoint.to_string()))
}

/// Builder for [`S3Service`].
#[derive(Default)]
pub struct S3ServiceBuilder {
    settings: Option<AwsSettings>,
    base_config: Option<ClientConfiguration>,
    connector: Option<Arc<dyn StorageConnector>>,
}

impl S3ServiceBuilder {
    /// Use the given settings.
    pub fn settings(mut self, settings: AwsSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Base transport configuration; protocol and proxy are overridden from
    /// the settings.
    pub fn client_config(mut self, config: ClientConfiguration) -> Self {
        self.base_config = Some(config);
        self
    }

    /// Use a custom connector.
    pub fn connector(mut self, connector: Arc<dyn StorageConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the service. No client is constructed until first use.
    pub fn build(self) -> S3Service {
        S3Service {
            settings: self.settings.unwrap_or_default(),
            base_config: self.base_config.unwrap_or_default(),
            connector: self
                .connector
                .unwrap_or_else(|| Arc::new(ReqwestConnector::new())),
            client: OnceCell::new(),
            lifecycle: Lifecycle::new(),
        }
    }
}
