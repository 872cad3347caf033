use crate::sanity::{DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECONDS};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PROJECT_ID: &str = "sanity-project-id";
pub const ARG_DATASET: &str = "sanity-dataset";
pub const ARG_API_VERSION: &str = "sanity-api-version";
pub const ARG_TOKEN: &str = "sanity-token";
pub const ARG_API_HOST: &str = "sanity-api-host";
pub const ARG_TIMEOUT: &str = "sanity-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROJECT_ID)
                .long(ARG_PROJECT_ID)
                .help("Sanity project id")
                .env("SANITY_PROJECT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DATASET)
                .long(ARG_DATASET)
                .help("Sanity dataset holding the order documents")
                .env("SANITY_DATASET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_VERSION)
                .long(ARG_API_VERSION)
                .help("Sanity API version, YYYY-MM-DD")
                .env("SANITY_API_VERSION")
                .default_value(DEFAULT_API_VERSION),
        )
        .arg(
            Arg::new(ARG_TOKEN)
                .long(ARG_TOKEN)
                .help("Sanity API token with read and write access to the dataset")
                .env("SANITY_API_TOKEN")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_HOST)
                .long(ARG_API_HOST)
                .help("Sanity API host (default: https://<project-id>.api.sanity.io)")
                .env("SANITY_API_HOST"),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Timeout in seconds for each Sanity request")
                .env("SANITY_TIMEOUT_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub token: SecretString,
    pub api_host: Option<String>,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            project_id: matches
                .get_one::<String>(ARG_PROJECT_ID)
                .cloned()
                .context("missing required argument: --sanity-project-id")?,
            dataset: matches
                .get_one::<String>(ARG_DATASET)
                .cloned()
                .context("missing required argument: --sanity-dataset")?,
            api_version: matches
                .get_one::<String>(ARG_API_VERSION)
                .cloned()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            token: matches
                .get_one::<String>(ARG_TOKEN)
                .cloned()
                .map(SecretString::from)
                .context("missing required argument: --sanity-token")?,
            api_host: matches.get_one::<String>(ARG_API_HOST).cloned(),
            timeout_seconds: matches
                .get_one::<u64>(ARG_TIMEOUT)
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_apply() {
        temp_env::with_vars(
            [
                ("SANITY_API_VERSION", None::<&str>),
                ("SANITY_API_HOST", None),
                ("SANITY_TIMEOUT_SECONDS", None),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec![
                    "test",
                    "--sanity-project-id",
                    "abc123",
                    "--sanity-dataset",
                    "production",
                    "--sanity-token",
                    "sk-secret",
                ]);
                let options = Options::parse(&matches).unwrap();
                assert_eq!(options.project_id, "abc123");
                assert_eq!(options.api_version, DEFAULT_API_VERSION);
                assert_eq!(options.token.expose_secret(), "sk-secret");
                assert_eq!(options.api_host, None);
                assert_eq!(options.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
            },
        );
    }

    #[test]
    fn token_is_required() {
        temp_env::with_vars([("SANITY_API_TOKEN", None::<&str>)], || {
            let result = with_args(Command::new("test")).try_get_matches_from(vec![
                "test",
                "--sanity-project-id",
                "abc123",
                "--sanity-dataset",
                "production",
            ]);
            assert_eq!(
                result.map_err(|e| e.kind()).err(),
                Some(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }

    #[test]
    fn options_debug_hides_token() {
        temp_env::with_vars(
            [
                ("SANITY_PROJECT_ID", Some("abc123")),
                ("SANITY_DATASET", Some("production")),
                ("SANITY_API_TOKEN", Some("sk-secret")),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
                let options = Options::parse(&matches).unwrap();
                assert!(!format!("{options:?}").contains("sk-secret"));
            },
        );
    }
}
