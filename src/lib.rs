//! AWS S3 Service Module
//!
//! Settings-driven factory for a single, lazily constructed S3 client.
//!
//! # Features
//!
//! - **Protocol selection**: `http` or `https`, anything else is rejected
//! - **Credentials**: static key pair, or an environment → system properties
//!   → instance profile fallback chain
//! - **Proxy**: optional proxy host and port
//! - **Endpoints**: explicit override, region lookup table, or the default
//! - **Lifecycle**: start/stop/close hooks; close releases the client
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use aws_s3_service::{AwsSettings, S3Service};
//!
//! let settings = AwsSettings::builder()
//!     .protocol("https")
//!     .region("eu-west")
//!     .build();
//!
//! let service = S3Service::new(settings);
//! service.start()?;
//!
//! let client = service.client()?;
//! assert_eq!(client.endpoint(), Some("s3-eu-west-1.amazonaws.com"));
//!
//! service.close();
//! # Ok::<(), aws_s3_service::S3Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod mocks;
pub mod service;
pub mod settings;
pub mod transport;

// Re-export main types at crate root
pub use client::{StorageClient, StorageConnector};
pub use config::{endpoint_for_region, ClientConfiguration, Protocol, ProxyConfig};
pub use credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialSource, CredentialsProvider,
    EnvCredentialsProvider, InstanceProfileCredentialsProvider, ProviderKind,
    StaticCredentialsProvider, SystemPropertiesCredentialsProvider,
};
pub use error::{
    ConfigurationError, CredentialsError, LifecycleError, NetworkError, S3Error,
};
pub use lifecycle::LifecycleState;
pub use service::{ClientHandle, ResolvedClientConfig, S3Service, S3ServiceBuilder};
pub use settings::AwsSettings;
pub use transport::{ReqwestConnector, ReqwestStorageClient};

/// Create a service from `CLOUD_AWS_*` environment variables.
///
/// # Example
///
/// ```rust,no_run
/// let service = aws_s3_service::create_service_from_env();
/// let client = service.client()?;
/// # Ok::<(), aws_s3_service::S3Error>(())
/// ```
pub fn create_service_from_env() -> S3Service {
    S3Service::from_env()
}

/// Result type alias for S3 service operations.
pub type Result<T> = std::result::Result<T, S3Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _ = std::any::type_name::<S3Error>();
        let _ = std::any::type_name::<S3Service>();
        let _ = std::any::type_name::<AwsSettings>();
        let _ = std::any::type_name::<AwsCredentials>();
        let _ = std::any::type_name::<ClientHandle>();
    }
}
