use std::time::{Duration, SystemTime};

use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, future, ProvideCredentials};
use aws_credential_types::Credentials;
use aws_types::region::Region;
use aws_types::SdkConfig;

use crate::cache::{SsoToken, TokenCache};
use crate::error::{Error, Result};
use crate::identity::{self, RoleIdentity};

const PROVIDER_NAME: &str = "SsoTokenCache";

/// Exchanges a cached SSO access token for role credentials of `identity`.
pub async fn role_credentials(
    config: &SdkConfig,
    token: &SsoToken,
    identity: &RoleIdentity,
) -> Result<Credentials> {
    let sso_config = aws_sdk_sso::config::Builder::from(config)
        .region(Region::new(token.region.clone()))
        .build();
    let sso = aws_sdk_sso::Client::from_conf(sso_config);

    let output = sso
        .get_role_credentials()
        .account_id(&identity.account)
        .role_name(&identity.permission_set)
        .access_token(&token.access_token)
        .send()
        .await
        .map_err(|e| Error::CredentialExchange(e.into()))?;

    let missing = |field| Error::MissingField {
        operation: "GetRoleCredentials",
        field,
    };
    let creds = output
        .role_credentials()
        .ok_or_else(|| missing("roleCredentials"))?;
    let access_key_id = creds.access_key_id().ok_or_else(|| missing("accessKeyId"))?;
    let secret_access_key = creds
        .secret_access_key()
        .ok_or_else(|| missing("secretAccessKey"))?;
    let session_token = creds.session_token().ok_or_else(|| missing("sessionToken"))?;

    // milliseconds since the epoch, 0 when unknown
    let expiry = u64::try_from(creds.expiration())
        .ok()
        .filter(|ms| *ms > 0)
        .map(|ms| SystemTime::UNIX_EPOCH + Duration::from_millis(ms));

    Ok(Credentials::new(
        access_key_id,
        secret_access_key,
        Some(session_token.to_owned()),
        expiry,
        PROVIDER_NAME,
    ))
}

/// Credentials for an SSO profile, built from the token `aws sso login` left
/// in the cache.
#[derive(Debug)]
pub struct SsoCredentialsProvider {
    profile: String,
    start_url: String,
    cache: TokenCache,
}

impl SsoCredentialsProvider {
    pub fn new(profile: impl Into<String>, start_url: impl Into<String>, cache: TokenCache) -> Self {
        Self {
            profile: profile.into(),
            start_url: start_url.into(),
            cache,
        }
    }

    async fn load_credentials(&self) -> Result<Credentials> {
        // fail before touching the network when nobody is logged in
        let token = self.cache.resolve(&self.start_url)?;

        let config = aws_config::from_env()
            .profile_name(&self.profile)
            .load()
            .await;

        let identity = identity::caller_identity(&config).await?;
        log::info!(
            "exchanging token for {} in account {}",
            identity.permission_set,
            identity.account
        );

        role_credentials(&config, &token, &identity).await
    }
}

impl ProvideCredentials for SsoCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(async move {
            let result: provider::Result = self.load_credentials().await.map_err(|e| match e {
                Error::TokenNotFound { .. } => CredentialsError::not_loaded(e),
                e => CredentialsError::provider_error(e),
            });
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SsoCredentialsProvider::new(
            "dev",
            "https://d-1234567890.awsapps.com/start",
            TokenCache::new(dir.path()),
        );

        let err = provider.provide_credentials().await.unwrap_err();
        assert!(
            matches!(err, CredentialsError::CredentialsNotLoaded(_)),
            "{err:?}"
        );

        // the login hint must survive for the CLI's `{:#}` diagnostic
        let mut chain = Vec::new();
        let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(e) = cur {
            chain.push(e.to_string());
            cur = e.source();
        }
        assert!(chain.join(": ").contains("aws sso login"), "{chain:?}");
    }

    #[tokio::test]
    async fn unreadable_cache_is_a_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "").unwrap();

        let provider = SsoCredentialsProvider::new(
            "dev",
            "https://d-1234567890.awsapps.com/start",
            TokenCache::new(&file),
        );

        let err = provider.provide_credentials().await.unwrap_err();
        assert!(matches!(err, CredentialsError::ProviderError(_)), "{err:?}");
    }
}
