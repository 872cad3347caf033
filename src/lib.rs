//! # Storefront Admin
//!
//! `storefront-admin` is the order back office for a storefront whose orders
//! live in a Sanity dataset. It loads every `order` document once at startup,
//! serves a filterable, expandable order table, and lets an operator change an
//! order's fulfillment status or delete it.
//!
//! ## Orders
//!
//! The local board is a best-effort mirror of the dataset. Mutations are sent
//! to Sanity first and only merged into the board after the store confirms
//! them, so a failed call never leaves a half-applied row behind.
//!
//! ## Sessions
//!
//! Every `/admin` page and `/v1/orders` endpoint sits behind a session gate.
//! Sessions are opaque random tokens issued by `POST /login`, kept in memory
//! with an expiry, and presented back as a cookie or bearer token.

pub mod api;
pub mod cli;
pub mod orders;
pub mod sanity;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
