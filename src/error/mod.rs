//! Error types for the S3 service.
//!
//! Errors are grouped by where they originate. Everything a caller of
//! [`S3Service::client`](crate::S3Service::client) can observe from bad
//! settings lives under [`ConfigurationError`]; those are never retried.

use thiserror::Error;

/// Top-level error type for the S3 service.
#[derive(Debug, Error)]
pub enum S3Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Component lifecycle errors.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl S3Error {
    /// Returns true if this error was caused by invalid settings.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, S3Error::Configuration(_))
    }

    /// Returns true if the error is retryable.
    ///
    /// Only transport failures are; configuration and lifecycle errors are
    /// deterministic.
    pub fn is_retryable(&self) -> bool {
        match self {
            S3Error::Network(e) => e.is_retryable(),
            S3Error::Credentials(CredentialsError::ImdsError { .. }) => true,
            _ => false,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Protocol is neither `http` nor `https`.
    #[error("No protocol supported [{protocol}], can either be [http] or [https]")]
    InvalidProtocol {
        /// The rejected protocol value.
        protocol: String,
    },

    /// Proxy port could not be parsed.
    #[error("The configured proxy port value [{value}] is invalid: {details}")]
    InvalidProxyPort {
        /// The rejected port value.
        value: String,
        /// Parser error details.
        details: String,
    },

    /// Region is not present in the endpoint table.
    #[error("No automatic endpoint could be derived from region [{region}]")]
    UnknownRegion {
        /// The rejected region.
        region: String,
    },

    /// Only one half of a static key pair was supplied.
    #[error("Incomplete credentials: [{missing}] must be set together with [{present}]")]
    IncompleteCredentials {
        /// The key that was provided.
        present: &'static str,
        /// The key that is missing.
        missing: &'static str,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },

    /// IMDS (Instance Metadata Service) error.
    #[error("IMDS error: {message}")]
    ImdsError {
        /// Details about the IMDS error.
        message: String,
    },
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error details.
        message: String,
    },

    /// HTTP client could not be built (TLS backend, proxy URL).
    #[error("TLS error: {message}")]
    TlsError {
        /// Error details.
        message: String,
    },
}

impl NetworkError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NetworkError::ConnectionFailed { .. })
    }
}

/// Component lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The component or client has been closed.
    #[error("Closed: the s3 service has been closed")]
    Closed,

    /// Transition not allowed from the current state.
    #[error("Illegal lifecycle transition: cannot {action} from state [{state}]")]
    IllegalTransition {
        /// The attempted action.
        action: &'static str,
        /// The current state.
        state: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_family() {
        let err: S3Error = ConfigurationError::UnknownRegion {
            region: "mars-1".to_string(),
        }
        .into();
        assert!(err.is_invalid_config());
        assert!(!err.is_retryable());

        let err: S3Error = LifecycleError::Closed.into();
        assert!(!err.is_invalid_config());
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigurationError::InvalidProtocol {
            protocol: "ftp".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No protocol supported [ftp], can either be [http] or [https]"
        );

        let err = ConfigurationError::UnknownRegion {
            region: "mars-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No automatic endpoint could be derived from region [mars-1]"
        );
    }

    #[test]
    fn test_network_retryable() {
        let err = S3Error::Network(NetworkError::ConnectionFailed {
            message: "reset".to_string(),
        });
        assert!(err.is_retryable());

        let err = S3Error::Network(NetworkError::TlsError {
            message: "bad".to_string(),
        });
        assert!(!err.is_retryable());
    }
}
