//! Environment variable credentials provider.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, S3Error};
use async_trait::async_trait;
use std::env;

/// Environment variable names for AWS credentials.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Legacy alias of [`AWS_ACCESS_KEY_ID`].
pub const AWS_ACCESS_KEY: &str = "AWS_ACCESS_KEY";
/// Secret access key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Legacy alias of [`AWS_SECRET_ACCESS_KEY`].
pub const AWS_SECRET_KEY: &str = "AWS_SECRET_KEY";
/// Optional session token variable.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Credentials provider that reads from environment variables.
///
/// The access key is read from `AWS_ACCESS_KEY_ID`, or `AWS_ACCESS_KEY` when
/// the former is unset; the secret from `AWS_SECRET_ACCESS_KEY` or
/// `AWS_SECRET_KEY`. `AWS_SESSION_TOKEN` is optional.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialsProvider;

impl EnvCredentialsProvider {
    /// Create a new environment credentials provider.
    pub fn new() -> Self {
        Self
    }

    fn read(primary: &str, alias: &str) -> Result<String, S3Error> {
        let (var, value) = match env::var(primary) {
            Ok(value) => (primary, value),
            Err(_) => match env::var(alias) {
                Ok(value) => (alias, value),
                Err(_) => return Err(S3Error::Credentials(CredentialsError::NotFound)),
            },
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(S3Error::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", var),
            }));
        }

        Ok(value.to_string())
    }
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
        let access_key_id = Self::read(AWS_ACCESS_KEY_ID, AWS_ACCESS_KEY)?;
        let secret_access_key = Self::read(AWS_SECRET_ACCESS_KEY, AWS_SECRET_KEY)?;

        // Session token is optional
        let session_token = env::var(AWS_SESSION_TOKEN)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let credentials = match session_token {
            Some(token) => {
                AwsCredentials::with_session_token(access_key_id, secret_access_key, token)
            }
            None => AwsCredentials::new(access_key_id, secret_access_key),
        };

        Ok(credentials)
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
