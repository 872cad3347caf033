use crate::{api, sanity};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub sanity_project_id: String,
    pub sanity_dataset: String,
    pub sanity_api_version: String,
    pub sanity_token: SecretString,
    pub sanity_api_host: Option<String>,
    pub sanity_timeout_seconds: u64,
    pub admin_password: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

/// Build the Sanity client configuration from the CLI arguments.
///
/// # Errors
/// Returns an error if the project id, dataset, API version or host are invalid.
pub fn sanity_config(args: &Args) -> Result<sanity::Config> {
    let mut config = sanity::Config::new(
        &args.sanity_project_id,
        &args.sanity_dataset,
        args.sanity_token.clone(),
    )
    .context("Invalid Sanity project or dataset")?
    .with_api_version(&args.sanity_api_version)
    .context("Invalid Sanity API version")?
    .with_timeout(Duration::from_secs(args.sanity_timeout_seconds));

    if let Some(host) = &args.sanity_api_host {
        config = config
            .with_api_host(host)
            .context("Invalid Sanity API host")?;
    }

    Ok(config)
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = sanity_config(&args)?;

    debug!("Sanity config: {:?}", config);

    let auth = api::AuthConfig::new(args.admin_password).with_cookie_secure(args.cookie_secure);

    api::new(args.port, config, auth, args.session_ttl_seconds).await
}
