//! Storage client collaborator.
//!
//! The service never speaks the storage protocol itself. It hands
//! credentials and a [`ClientConfiguration`] to a [`StorageConnector`] and
//! keeps the [`StorageClient`] it gets back.

use crate::config::ClientConfiguration;
use crate::credentials::CredentialsProvider;
use crate::error::S3Error;
use std::fmt;
use std::sync::Arc;

/// A constructed storage client.
///
/// The endpoint is only set before the client is shared, which is why
/// [`set_endpoint`](StorageClient::set_endpoint) takes `&mut self`.
pub trait StorageClient: Send + Sync + fmt::Debug {
    /// Point the client at an endpoint host (or URL).
    fn set_endpoint(&mut self, endpoint: &str);

    /// The configured endpoint, if one was set.
    fn endpoint(&self) -> Option<&str>;

    /// Credentials the client signs requests with.
    fn credentials(&self) -> Arc<dyn CredentialsProvider>;

    /// Transport configuration the client was built with.
    fn configuration(&self) -> &ClientConfiguration;

    /// Release connections and other resources held by the client.
    fn shutdown(&self);

    /// Whether [`shutdown`](StorageClient::shutdown) has been called.
    fn is_shutdown(&self) -> bool;
}

/// Builds storage clients.
pub trait StorageConnector: Send + Sync {
    /// Construct a client for the given credentials and configuration.
    fn construct(
        &self,
        credentials: Arc<dyn CredentialsProvider>,
        config: &ClientConfiguration,
    ) -> Result<Box<dyn StorageClient>, S3Error>;
}
