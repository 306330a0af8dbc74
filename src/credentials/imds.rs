//! Instance profile credentials served by the EC2 instance metadata service.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, S3Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::{debug, trace, warn};

const TOKEN_PATH: &str = "/latest/api/token";
const ROLE_PATH: &str = "/latest/meta-data/iam/security-credentials/";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// IMDS version configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImdsVersion {
    /// IMDSv1 (no token required).
    V1,
    /// IMDSv2 (requires session token).
    V2,
    /// Auto-detect: try v2 first, fall back to v1.
    #[default]
    Auto,
}

/// Configuration for the instance profile provider.
#[derive(Debug, Clone)]
pub struct ImdsConfig {
    /// IMDS endpoint URL.
    pub endpoint: String,
    /// IMDS version to use.
    pub version: ImdsVersion,
    /// Timeout for IMDS requests.
    pub timeout: Duration,
    /// Number of retries for IMDS requests.
    pub retries: u32,
    /// Token TTL for IMDSv2 (in seconds).
    pub token_ttl_seconds: u32,
}

impl Default for ImdsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://169.254.169.254".to_string(),
            version: ImdsVersion::Auto,
            timeout: Duration::from_secs(1),
            retries: 3,
            token_ttl_seconds: 21600, // 6 hours
        }
    }
}

impl ImdsConfig {
    /// Create a new IMDS configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IMDS endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the IMDS version.
    pub fn version(mut self, version: ImdsVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Credentials provider backed by the instance's IAM role.
///
/// Nothing is fetched on construction. The first call to
/// [`get_credentials`](CredentialsProvider::get_credentials) discovers the
/// role name and fetches its temporary credentials, which are then cached
/// until five minutes before they expire.
pub struct InstanceProfileCredentialsProvider {
    config: ImdsConfig,
    http_client: reqwest::Client,
    cached_token: RwLock<Option<CachedToken>>,
    cached_credentials: RwLock<Option<AwsCredentials>>,
    detected_version: RwLock<Option<ImdsVersion>>,
}

impl InstanceProfileCredentialsProvider {
    /// Create a provider with default configuration.
    pub fn new() -> Result<Self, S3Error> {
        Self::with_config(ImdsConfig::default())
    }

    /// Create a provider with custom configuration.
    pub fn with_config(config: ImdsConfig) -> Result<Self, S3Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .no_proxy()
            .build()
            .map_err(|e| {
                S3Error::Credentials(CredentialsError::ImdsError {
                    message: format!("Failed to create HTTP client: {}", e),
                })
            })?;

        Ok(Self {
            config,
            http_client,
            cached_token: RwLock::new(None),
            cached_credentials: RwLock::new(None),
            detected_version: RwLock::new(None),
        })
    }

    /// The provider configuration.
    pub fn config(&self) -> &ImdsConfig {
        &self.config
    }

    fn imds_error(message: String) -> S3Error {
        S3Error::Credentials(CredentialsError::ImdsError { message })
    }

    async fn get_token(&self) -> Result<String, S3Error> {
        {
            let cache = self.cached_token.read();
            if let Some(cached) = cache.as_ref() {
                if Utc::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let url = format!("{}{}", self.config.endpoint, TOKEN_PATH);
        let response = self
            .http_client
            .put(&url)
            .header(TOKEN_TTL_HEADER, self.config.token_ttl_seconds.to_string())
            .send()
            .await
            .map_err(|e| Self::imds_error(format!("Failed to get IMDS token: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::imds_error(format!(
                "IMDS token request failed with status: {}",
                response.status()
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| Self::imds_error(format!("Failed to read IMDS token response: {}", e)))?;

        // Refresh one minute early
        *self.cached_token.write() = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now()
                + chrono::Duration::seconds(self.config.token_ttl_seconds as i64 - 60),
        });

        Ok(token)
    }

    async fn get_role_name(&self, token: Option<&str>) -> Result<String, S3Error> {
        let url = format!("{}{}", self.config.endpoint, ROLE_PATH);

        let mut request = self.http_client.get(&url);
        if let Some(t) = token {
            request = request.header(TOKEN_HEADER, t);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::imds_error(format!("Failed to get IAM role name: {}", e)))?;

        if response.status().as_u16() == 401 {
            return Err(Self::imds_error(
                "IMDSv2 token required but not provided".to_string(),
            ));
        }

        if !response.status().is_success() {
            return Err(Self::imds_error(format!(
                "Failed to get IAM role name: status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::imds_error(format!("Failed to read IAM role name: {}", e)))?;

        // The response may list several roles; the first one wins
        body.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Self::imds_error("No IAM role found".to_string()))
    }

    async fn get_role_credentials(
        &self,
        role_name: &str,
        token: Option<&str>,
    ) -> Result<AwsCredentials, S3Error> {
        let url = format!("{}{}{}", self.config.endpoint, ROLE_PATH, role_name);

        let mut request = self.http_client.get(&url);
        if let Some(t) = token {
            request = request.header(TOKEN_HEADER, t);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::imds_error(format!("Failed to get role credentials: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::imds_error(format!(
                "Failed to get role credentials: status {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            Self::imds_error(format!("Failed to read credentials response: {}", e))
        })?;

        parse_credentials_response(&body)
    }

    async fn detect_version(&self) -> ImdsVersion {
        if let Some(v) = *self.detected_version.read() {
            return v;
        }

        let version = match self.get_token().await {
            Ok(_) => {
                debug!("IMDSv2 is available");
                ImdsVersion::V2
            }
            Err(_) => {
                debug!("IMDSv2 not available, falling back to v1");
                ImdsVersion::V1
            }
        };

        *self.detected_version.write() = Some(version);
        version
    }

    async fn fetch_credentials(&self) -> Result<AwsCredentials, S3Error> {
        let version = match self.config.version {
            ImdsVersion::Auto => self.detect_version().await,
            v => v,
        };

        let token = match version {
            ImdsVersion::V2 => Some(self.get_token().await?),
            _ => None,
        };

        let role_name = self.get_role_name(token.as_deref()).await?;
        trace!("Found IAM role: {}", role_name);
        self.get_role_credentials(&role_name, token.as_deref()).await
    }
}

/// Upper bound on the pause between IMDS attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Exponential backoff from 100ms, capped at [`MAX_RETRY_DELAY`].
fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(100u64.saturating_mul(factor)).min(MAX_RETRY_DELAY)
}

/// Parse the JSON credential document served for a role.
fn parse_credentials_response(body: &str) -> Result<AwsCredentials, S3Error> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct CredentialsResponse {
        access_key_id: String,
        secret_access_key: String,
        token: Option<String>,
        expiration: Option<String>,
    }

    let creds: CredentialsResponse = serde_json::from_str(body).map_err(|e| {
        S3Error::Credentials(CredentialsError::ImdsError {
            message: format!("Failed to parse credentials JSON: {}", e),
        })
    })?;

    let expiration = creds.expiration.as_ref().and_then(|exp| {
        DateTime::parse_from_rfc3339(exp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    });

    let credentials = match (creds.token, expiration) {
        (Some(token), Some(exp)) => {
            AwsCredentials::temporary(creds.access_key_id, creds.secret_access_key, token, exp)
        }
        (Some(token), None) => {
            AwsCredentials::with_session_token(creds.access_key_id, creds.secret_access_key, token)
        }
        (None, _) => AwsCredentials::new(creds.access_key_id, creds.secret_access_key),
    };

    Ok(credentials)
}

#[async_trait]
impl CredentialsProvider for InstanceProfileCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
        {
            let cache = self.cached_credentials.read();
            if let Some(creds) = cache.as_ref() {
                if !creds.will_expire_within(chrono::Duration::minutes(5)) {
                    return Ok(creds.clone());
                }
            }
        }

        let mut last_error = None;
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                trace!("IMDS retry attempt {}/{}", attempt, self.config.retries);
                tokio::time::sleep(retry_delay(attempt)).await;
            }

            match self.fetch_credentials().await {
                Ok(creds) => {
                    *self.cached_credentials.write() = Some(creds.clone());
                    return Ok(creds);
                }
                Err(e) => {
                    warn!("IMDS credentials fetch failed: {:?}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Self::imds_error("IMDS credentials fetch failed after retries".to_string())
        }))
    }

    async fn refresh_credentials(&self) -> Result<AwsCredentials, S3Error> {
        *self.cached_credentials.write() = None;
        self.get_credentials().await
    }

    fn name(&self) -> &'static str {
        "instance_profile"
    }
}

impl std::fmt::Debug for InstanceProfileCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceProfileCredentialsProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
