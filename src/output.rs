use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use aws_credential_types::Credentials;
use serde::Serialize;

use crate::cli::OutputFormat;

const CREDENTIALS_FILE: &str = "credentials";
const CREDENTIALS_BACKUP: &str = "old.credentials.backup";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonCredentials<'a> {
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: &'a str,
}

/// Renders `creds` for stdout. `exported_profile` adds an `AWS_PROFILE`
/// export in env format.
pub fn render(
    format: OutputFormat,
    creds: &Credentials,
    exported_profile: Option<&str>,
) -> serde_json::Result<String> {
    let session_token = creds.session_token().unwrap_or_default();
    match format {
        OutputFormat::Env => {
            let mut out = String::new();
            let mut export = |name: &str, value: &str| {
                let _ = writeln!(out, "export {name}='{value}'");
            };
            if let Some(profile) = exported_profile {
                export("AWS_PROFILE", profile);
            }
            export("AWS_ACCESS_KEY_ID", creds.access_key_id());
            export("AWS_SECRET_ACCESS_KEY", creds.secret_access_key());
            export("AWS_SESSION_TOKEN", session_token);
            Ok(out)
        }
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(&JsonCredentials {
                access_key_id: creds.access_key_id(),
                secret_access_key: creds.secret_access_key(),
                session_token,
            })?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Moves `<aws_dir>/credentials` out of the way so static keys there cannot
/// shadow the exported ones. Returns whether a file was moved.
pub fn backup_credentials_file(aws_dir: &Path) -> io::Result<bool> {
    let from = aws_dir.join(CREDENTIALS_FILE);
    let to = aws_dir.join(CREDENTIALS_BACKUP);
    match fs::rename(&from, &to) {
        Ok(()) => {
            log::info!("moved {} to {}", from.display(), to.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
