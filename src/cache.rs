//! Lookup of SSO access tokens in the shared AWS SSO cache.
//!
//! `aws sso login` drops one JSON document per login into `~/.aws/sso/cache`.
//! The same directory also holds client registrations and files written by
//! other tools, so every file is classified before it is considered. Among the
//! tokens for the requested start URL that have not expired yet, the one that
//! expires last wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// Cache location relative to the home directory.
pub const CACHE_DIR: &str = ".aws/sso/cache";

const START_URL: &str = "startUrl";
const ACCESS_TOKEN: &str = "accessToken";
const REGION: &str = "region";
const EXPIRES_AT: &str = "expiresAt";

/// A well-formed SSO token record.
#[derive(Clone, PartialEq, Eq)]
pub struct SsoToken {
    pub start_url: String,
    pub access_token: String,
    pub region: String,
    pub expires_at: DateTime<Utc>,
}

// Keep the bearer token out of logs.
impl std::fmt::Debug for SsoToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoToken")
            .field("start_url", &self.start_url)
            .field("access_token", &"** redacted **")
            .field("region", &self.region)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What a single cache file turned out to be.
#[derive(Debug, PartialEq, Eq)]
pub enum CacheEntry {
    Token(SsoToken),
    /// Anything lacking one of the token fields, e.g. client registrations
    /// or legacy role caches.
    Foreign { missing: &'static str },
}

impl CacheEntry {
    /// Classifies a parsed JSON object. Only a complete record with a bad
    /// `expiresAt` is an error.
    pub fn classify(record: &Map<String, Value>) -> Result<Self, String> {
        let field = |key: &'static str| record.get(key).and_then(Value::as_str).ok_or(key);

        let fields = field(START_URL).and_then(|start_url| {
            Ok((start_url, field(ACCESS_TOKEN)?, field(REGION)?, field(EXPIRES_AT)?))
        });
        let (start_url, access_token, region, expires_at) = match fields {
            Ok(fields) => fields,
            Err(missing) => return Ok(CacheEntry::Foreign { missing }),
        };

        let expires_at = DateTime::parse_from_rfc3339(expires_at)
            .map_err(|e| format!("invalid {EXPIRES_AT} `{expires_at}`: {e}"))?
            .with_timezone(&Utc);

        Ok(CacheEntry::Token(SsoToken {
            start_url: start_url.to_owned(),
            access_token: access_token.to_owned(),
            region: region.to_owned(),
            expires_at,
        }))
    }
}

/// File name the AWS CLI uses for the token of `start_url`.
pub fn cache_file_name(start_url: &str) -> String {
    format!("{}.json", hex::encode(Sha1::digest(start_url.as_bytes())))
}

/// Picks the token for `start_url` that expires last, ignoring empty tokens
/// and anything not strictly valid at `now`. On equal expiry the earlier token
/// is kept.
pub fn select_token<'a, I>(tokens: I, start_url: &str, now: DateTime<Utc>) -> Option<&'a SsoToken>
where
    I: IntoIterator<Item = &'a SsoToken>,
{
    tokens
        .into_iter()
        .filter(|t| t.expires_at > now && t.start_url == start_url && !t.access_token.is_empty())
        .fold(None, |best: Option<&SsoToken>, t| match best {
            Some(b) if t.expires_at <= b.expires_at => Some(b),
            _ => Some(t),
        })
}

#[derive(Debug, Clone)]
pub struct TokenCache {
    dir: PathBuf,
    strict: bool,
}

impl TokenCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            strict: false,
        }
    }

    /// The cache under the current user's home directory.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(Error::NoHomeDirectory)?;
        Ok(Self::new(home.join(CACHE_DIR)))
    }

    /// Abort on unparseable files, and on files holding anything but string
    /// values, instead of skipping them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns the valid token for `start_url` that expires last.
    pub fn resolve(&self, start_url: &str) -> Result<SsoToken> {
        self.resolve_at(start_url, Utc::now())
    }

    pub fn resolve_at(&self, start_url: &str, now: DateTime<Utc>) -> Result<SsoToken> {
        let tokens = self.tokens()?;
        log::debug!(
            "found {} SSO token(s) in {}",
            tokens.len(),
            self.dir.display()
        );

        match select_token(&tokens, start_url, now) {
            Some(token) => {
                log::info!(
                    "using SSO token for {} expiring at {}",
                    token.start_url,
                    token.expires_at
                );
                Ok(token.clone())
            }
            None => Err(Error::TokenNotFound {
                start_url: start_url.to_owned(),
                dir: self.dir.clone(),
                expected_file: cache_file_name(start_url),
            }),
        }
    }

    /// Every well-formed token in the cache, in file name order.
    pub fn tokens(&self) -> Result<Vec<SsoToken>> {
        let mut tokens = Vec::new();
        for path in self.files()? {
            if let Some(CacheEntry::Token(token)) = self.read_entry(&path)? {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        let io_err = |source| Error::Io {
            path: self.dir.clone(),
            source,
        };
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("SSO cache directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_err(e)),
        };

        let mut files = Vec::new();
        for entry in dir {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            // symlinks stay in so that a broken link fails on read
            let is_dir = entry.file_type().map_err(io_err)?.is_dir();
            if !is_dir && path.extension().map_or(false, |ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// `Ok(None)` means the file was malformed and skipped.
    fn read_entry(&self, path: &Path) -> Result<Option<CacheEntry>> {
        let raw = fs::read(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;

        let entry = serde_json::from_slice::<Map<String, Value>>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|record| {
                if self.strict {
                    if let Some((key, _)) = record.iter().find(|(_, v)| !v.is_string()) {
                        return Err(format!("value of `{key}` is not a string"));
                    }
                }
                CacheEntry::classify(&record)
            });

        match entry {
            Ok(CacheEntry::Foreign { missing }) => {
                log::debug!("skipping {}: no `{missing}`", path.display());
                Ok(Some(CacheEntry::Foreign { missing }))
            }
            Ok(entry) => Ok(Some(entry)),
            Err(reason) if self.strict => Err(Error::MalformedCacheEntry {
                path: path.to_owned(),
                reason,
            }),
            Err(reason) => {
                log::warn!("ignoring malformed cache file {}: {reason}", path.display());
                Ok(None)
            }
        }
    }
}
