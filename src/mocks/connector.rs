//! Mock storage connector for testing.

use crate::client::{StorageClient, StorageConnector};
use crate::config::ClientConfiguration;
use crate::credentials::CredentialsProvider;
use crate::error::{NetworkError, S3Error};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Connector that records every construction instead of opening
/// connections.
#[derive(Default)]
pub struct MockConnector {
    constructions: AtomicUsize,
    shutdowns: Arc<AtomicUsize>,
    failures_remaining: AtomicUsize,
    delay: Option<Duration>,
    last_config: Mutex<Option<ClientConfiguration>>,
}

impl MockConnector {
    /// Create a connector that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every construction, widening race windows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail the next `times` constructions with a network error.
    pub fn failing(times: usize) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    /// Number of construction attempts, successful or not.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    /// Number of `shutdown` calls across all clients built by this connector.
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Configuration passed to the most recent construction.
    pub fn last_config(&self) -> Option<ClientConfiguration> {
        self.last_config.lock().clone()
    }
}

impl StorageConnector for MockConnector {
    fn construct(
        &self,
        credentials: Arc<dyn CredentialsProvider>,
        config: &ClientConfiguration,
    ) -> Result<Box<dyn StorageClient>, S3Error> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock() = Some(config.clone());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(S3Error::Network(NetworkError::ConnectionFailed {
                message: "mock construction failure".to_string(),
            }));
        }

        Ok(Box::new(MockStorageClient {
            endpoint: None,
            credentials,
            config: config.clone(),
            shut_down: AtomicBool::new(false),
            shutdowns: self.shutdowns.clone(),
        }))
    }
}

/// Client produced by [`MockConnector`].
pub struct MockStorageClient {
    endpoint: Option<String>,
    credentials: Arc<dyn CredentialsProvider>,
    config: ClientConfiguration,
    shut_down: AtomicBool,
    shutdowns: Arc<AtomicUsize>,
}

impl StorageClient for MockStorageClient {
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
        self.shut_down.store(true, Ordering::SeqCst);
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockStorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStorageClient")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials.name())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
