use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error coming back from an AWS SDK call or loader.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// No cached token for the start URL is still valid.
    #[error("access token for {start_url} not found (looked for {expected_file} in {}), try `aws sso login`", dir.display())]
    TokenNotFound {
        start_url: String,
        dir: PathBuf,
        expected_file: String,
    },

    #[error("cannot parse arn: {0}")]
    MalformedArn(String),

    #[error("cannot parse role: {0}")]
    MalformedRole(String),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Only raised when the cache is read in strict mode.
    #[error("malformed cache entry {}: {reason}", path.display())]
    MalformedCacheEntry { path: PathBuf, reason: String },

    #[error("home directory could not be determined")]
    NoHomeDirectory,

    #[error("failed to load AWS profiles")]
    ProfileLoad(#[source] BoxError),

    #[error("profile `{0}` not found in the AWS config files")]
    ProfileNotFound(String),

    #[error("profile `{0}` has no sso_start_url")]
    MissingStartUrl(String),

    #[error("sts:GetCallerIdentity failed")]
    Identity(#[source] BoxError),

    #[error("sso:GetRoleCredentials failed")]
    CredentialExchange(#[source] BoxError),

    #[error("{operation} response is missing `{field}`")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
