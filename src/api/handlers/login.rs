//! Operator login and logout.
//!
//! There is a single operator passphrase; a match issues a session and the
//! session token is the only credential checked afterwards.

use super::render;
use crate::session::{
    guard::{clear_session_cookie, extract_session_token, session_cookie},
    now_unix, SessionStore,
};
use axum::{
    extract::{Extension, Form},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Clone)]
pub struct AuthConfig {
    admin_password: SecretString,
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub const fn new(admin_password: SecretString) -> Self {
        Self {
            admin_password,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub const fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub const fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    fn accepts(&self, candidate: &str) -> bool {
        let expected = self.admin_password.expose_secret().as_bytes();
        let candidate = candidate.as_bytes();
        // No early exit on the first mismatching byte.
        expected.len() == candidate.len()
            && expected
                .iter()
                .zip(candidate)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_password", &"***")
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct Credentials {
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: u64,
}

pub async fn login_page() -> Html<String> {
    Html(render::login(None))
}

/// Form login for the HTML dashboard.
pub async fn login(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Extension(auth): Extension<AuthConfig>,
    Form(credentials): Form<Credentials>,
) -> Response {
    if !auth.accepts(&credentials.password) {
        warn!("rejected operator login");
        return (
            StatusCode::UNAUTHORIZED,
            Html(render::login(Some("Invalid password"))),
        )
            .into_response();
    }

    let token = match sessions.issue(now_unix()) {
        Ok((token, _)) => token,
        Err(e) => {
            error!("Failed to issue session: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(&token, sessions.ttl_seconds(), auth.cookie_secure()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(e) => {
            error!("Failed to build session cookie: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    info!("operator logged in");

    (headers, Redirect::to(DASHBOARD_PATH)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Session issued; send it as `Authorization: Bearer <token>`", body = SessionToken),
        (status = 401, description = "Invalid password")
    ),
    tag = "auth"
)]
pub async fn api_login(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Extension(auth): Extension<AuthConfig>,
    Json(credentials): Json<Credentials>,
) -> Response {
    if !auth.accepts(&credentials.password) {
        warn!("rejected operator login");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match sessions.issue(now_unix()) {
        Ok((token, session)) => Json(SessionToken {
            token,
            expires_at: session.expires_at,
        })
        .into_response(),
        Err(e) => {
            error!("Failed to issue session: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Revoke the presented session and clear the cookie.
pub async fn logout(
    headers: HeaderMap,
    Extension(sessions): Extension<Arc<SessionStore>>,
    Extension(auth): Extension<AuthConfig>,
) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        sessions.revoke(&token);
    }

    // Always clear the cookie, even if the session was already gone.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth.cookie_secure()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    (response_headers, Redirect::to("/login")).into_response()
}
