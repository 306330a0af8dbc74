//! Transport configuration for the storage client.
//!
//! [`ClientConfiguration`] carries everything the underlying client needs
//! apart from credentials and endpoint: protocol, proxy and timeouts.

mod region;

pub use region::{endpoint_for_region, known_regions, REGION_ENDPOINTS};

use crate::error::{ConfigurationError, S3Error};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Wire protocol used to reach the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// URL scheme for this protocol.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = S3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            _ => Err(S3Error::Configuration(ConfigurationError::InvalidProtocol {
                protocol: s.to_string(),
            })),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// HTTP proxy the client connects through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy host name.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

impl ProxyConfig {
    /// Create a new proxy configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a proxy port setting. Surrounding whitespace is rejected.
    pub fn parse_port(value: &str) -> Result<u16, S3Error> {
        value.parse::<u16>().map_err(|e| {
            S3Error::Configuration(ConfigurationError::InvalidProxyPort {
                value: value.to_string(),
                details: e.to_string(),
            })
        })
    }

    /// Proxy URL in the form reqwest expects.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Check that host and port form a usable proxy URL.
    pub fn validate(&self) -> Result<(), S3Error> {
        let invalid = |message: String| {
            S3Error::Configuration(ConfigurationError::InvalidConfiguration {
                field: "proxy_host".to_string(),
                message,
            })
        };

        if self.host.trim().is_empty() {
            return Err(invalid("Proxy host must not be empty".to_string()));
        }

        let url = Url::parse(&self.url())
            .map_err(|e| invalid(format!("[{}] is not a valid proxy host: {}", self.host, e)))?;
        // Anything beyond a bare host would shift into userinfo, path or query
        let bare = url.host_str().is_some()
            && url.username().is_empty()
            && url.password().is_none()
            && url.path() == "/"
            && url.query().is_none()
            && url.fragment().is_none();
        if !bare {
            return Err(invalid(format!("[{}] is not a bare host name", self.host)));
        }

        Ok(())
    }
}

/// Client transport configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfiguration {
    /// Protocol used for requests.
    pub protocol: Protocol,
    /// Optional proxy.
    pub proxy: Option<ProxyConfig>,
    /// User-Agent header value.
    pub user_agent: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout for individual requests.
    pub read_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub max_connections: usize,
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            proxy: None,
            user_agent: format!("aws-s3-service/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(50),
            max_connections: 50,
        }
    }
}

impl ClientConfiguration {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigurationBuilder {
        ClientConfigurationBuilder::default()
    }
}

/// Builder for [`ClientConfiguration`].
#[derive(Default)]
pub struct ClientConfigurationBuilder {
    protocol: Option<Protocol>,
    proxy: Option<ProxyConfig>,
    user_agent: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_connections: Option<usize>,
}

impl ClientConfigurationBuilder {
    /// Set the protocol.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Route requests through a proxy.
    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(ProxyConfig::new(host, port));
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    pub fn max_connections(mut self, connections: usize) -> Self {
        self.max_connections = Some(connections);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ClientConfiguration, S3Error> {
        let defaults = ClientConfiguration::default();

        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }

        Ok(ClientConfiguration {
            protocol: self.protocol.unwrap_or(defaults.protocol),
            proxy: self.proxy,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
        })
    }
}
