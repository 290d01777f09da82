use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `export` statements for a POSIX shell
    Env,
    /// a JSON object
    Json,
}

/// Print temporary credentials for an AWS SSO profile using the token cached
/// by `aws sso login`.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Env)]
    pub format: OutputFormat,

    /// Profile to use, same value as passed to AWS CLI --profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Move ~/.aws/credentials aside and also export AWS_PROFILE
    #[arg(long)]
    pub force: bool,

    /// SSO token cache directory [default: ~/.aws/sso/cache]
    #[arg(long, env = "SSO_CREDENTIALS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Fail on unparseable cache files instead of skipping them
    #[arg(long)]
    pub strict_cache: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// The profile from `--profile` or `AWS_PROFILE`, if non-empty.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref().filter(|p| !p.is_empty())
    }
}
