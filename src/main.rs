mod cache;
mod cli;
mod error;
mod identity;
mod output;
mod profile;
mod sso;

use std::process::ExitCode;

use anyhow::{bail, Context};
use aws_credential_types::provider::ProvideCredentials;
use clap::Parser;
use log::LevelFilter;

use crate::cache::TokenCache;
use crate::cli::Args;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .filter_module("aws_config", LevelFilter::Error)
        .filter_module("aws_smithy_runtime", LevelFilter::Error)
        .filter_module("aws_smithy_http", LevelFilter::Error)
        .filter_module("hyper", LevelFilter::Error)
        .filter_module("rustls", LevelFilter::Error)
        .filter_module("tracing", LevelFilter::Error)
        .parse_default_env()
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let Some(profile) = args.profile() else {
        bail!("AWS_PROFILE is not set and no profile passed as --profile");
    };

    if args.force {
        let aws_dir = dirs::home_dir()
            .context("home directory could not be determined")?
            .join(".aws");
        output::backup_credentials_file(&aws_dir)
            .with_context(|| format!("failed to back up credentials in {}", aws_dir.display()))?;
    }

    let start_url = profile::sso_start_url(profile).await?;

    let cache = match &args.cache_dir {
        Some(dir) => TokenCache::new(dir),
        None => TokenCache::from_home()?,
    }
    .strict(args.strict_cache);

    let provider = sso::SsoCredentialsProvider::new(profile, start_url, cache);
    let creds = provider
        .provide_credentials()
        .await
        .context("failed to load SSO credentials")?;

    let exported_profile = args.force.then_some(profile);
    print!("{}", output::render(args.format, &creds, exported_profile)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
