use aws_config::profile::profile_file::ProfileFiles;
use aws_config::profile::ProfileSet;
use aws_types::os_shim_internal::{Env, Fs};

use crate::error::{Error, Result};

const START_URL: &str = "sso_start_url";

/// Reads `sso_start_url` for `profile` from the shared AWS config files.
///
/// `AWS_CONFIG_FILE` and `AWS_SHARED_CREDENTIALS_FILE` are honoured the same
/// way the SDK honours them.
pub async fn sso_start_url(profile: &str) -> Result<String> {
    let profiles = aws_config::profile::load(&Fs::real(), &Env::real(), &ProfileFiles::default(), None)
        .await
        .map_err(|e| Error::ProfileLoad(e.into()))?;

    start_url_from(&profiles, profile)
}

fn start_url_from(profiles: &ProfileSet, profile: &str) -> Result<String> {
    let section = profiles
        .get_profile(profile)
        .ok_or_else(|| Error::ProfileNotFound(profile.to_owned()))?;

    let start_url = section
        .get(START_URL)
        .ok_or_else(|| Error::MissingStartUrl(profile.to_owned()))?;
    log::debug!("profile {profile} uses SSO start URL {start_url}");
    Ok(start_url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    async fn load(config: &str) -> ProfileSet {
        let fs = Fs::from_map(HashMap::from([(
            "/home/test/.aws/config".to_owned(),
            config.as_bytes().to_vec(),
        )]));
        let env = Env::from_slice(&[("HOME", "/home/test")]);
        aws_config::profile::load(&fs, &env, &ProfileFiles::default(), None)
            .await
            .unwrap()
    }

    const CONFIG: &str = "\
[profile dev]
sso_start_url = https://d-1234567890.awsapps.com/start
sso_region = eu-west-1
sso_account_id = 123456789012
sso_role_name = Developer

[profile static]
region = us-east-1
";

    #[tokio::test]
    async fn finds_start_url_of_profile() {
        let profiles = load(CONFIG).await;
        assert_eq!(
            start_url_from(&profiles, "dev").unwrap(),
            "https://d-1234567890.awsapps.com/start"
        );
    }

    #[tokio::test]
    async fn profile_without_sso_is_rejected() {
        let profiles = load(CONFIG).await;
        assert!(matches!(
            start_url_from(&profiles, "static"),
            Err(Error::MissingStartUrl(p)) if p == "static"
        ));
        assert!(matches!(
            start_url_from(&profiles, "prod"),
            Err(Error::ProfileNotFound(p)) if p == "prod"
        ));
    }
}
