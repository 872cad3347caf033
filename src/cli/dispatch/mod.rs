//! Maps validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{sanity, session, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let sanity_opts = sanity::Options::parse(matches)?;
    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        sanity_project_id: sanity_opts.project_id,
        sanity_dataset: sanity_opts.dataset,
        sanity_api_version: sanity_opts.api_version,
        sanity_token: sanity_opts.token,
        sanity_api_host: sanity_opts.api_host,
        sanity_timeout_seconds: sanity_opts.timeout_seconds,
        admin_password: session_opts.admin_password,
        session_ttl_seconds: session_opts.session_ttl_seconds,
        cookie_secure: session_opts.cookie_secure,
    }))
}
