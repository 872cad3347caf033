//! Axum middleware running the session gate, plus cookie helpers.

use super::{now_unix, GuardState, SessionStore};
use axum::{
    extract::{Request, State},
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const SESSION_COOKIE_NAME: &str = "storefront_session";
pub const LOGIN_PATH: &str = "/login";

/// Gate for HTML pages: unauthenticated visitors are sent to the login page.
pub async fn require_page_session(
    State(sessions): State<Arc<SessionStore>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&sessions, &request) {
        GuardState::Authorized(session) => {
            let mut request = request;
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        _ => Redirect::to(LOGIN_PATH).into_response(),
    }
}

/// Gate for the JSON API: unauthenticated callers get `401`.
pub async fn require_api_session(
    State(sessions): State<Arc<SessionStore>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&sessions, &request) {
        GuardState::Authorized(session) => {
            let mut request = request;
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "title": "Unauthorized",
                "text": "Login required",
                "icon": "error",
            })),
        )
            .into_response(),
    }
}

fn check(sessions: &SessionStore, request: &Request) -> GuardState {
    let token = extract_session_token(request.headers());
    let state = GuardState::default()
        .mount()
        .decide(token.as_deref(), sessions, now_unix());

    debug!(
        "session guard for {}: {}",
        request.uri().path(),
        if state.renders_children() {
            "authorized"
        } else {
            "redirecting"
        }
    );

    state
}

/// Build an `HttpOnly` cookie carrying the session token.
///
/// # Errors
/// Returns an error if the token contains characters not allowed in headers.
pub fn session_cookie(
    token: &str,
    ttl_seconds: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// # Errors
/// Never in practice; the value is a fixed ASCII string.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Bearer token first, then the session cookie.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(sessions: Arc<SessionStore>) -> Router {
        Router::new()
            .route("/admin", get(|| async { "children" }))
            .route_layer(middleware::from_fn_with_state(
                sessions.clone(),
                require_page_session,
            ))
            .merge(
                Router::new()
                    .route("/v1/orders", get(|| async { "[]" }))
                    .route_layer(middleware::from_fn_with_state(
                        sessions,
                        require_api_session,
                    )),
            )
    }

    #[test]
    fn token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; storefront_session=abc123; other=1"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn token_from_bearer_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("storefront_session=cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn empty_cookie_value_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("storefront_session="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok", 3600, true).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("storefront_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.ends_with("; Secure"));

        let cleared = clear_session_cookie(false).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn page_redirects_without_session() {
        let response = app(Arc::new(SessionStore::new(60)))
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some(LOGIN_PATH)
        );
    }

    #[tokio::test]
    async fn page_renders_children_with_session() {
        let sessions = Arc::new(SessionStore::new(60));
        let (token, _) = sessions.issue(now_unix()).unwrap();

        let response = app(sessions)
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(COOKIE, format!("{SESSION_COOKIE_NAME}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("location").is_none());
    }

    #[tokio::test]
    async fn api_rejects_without_session() {
        let response = app(Arc::new(SessionStore::new(60)))
            .oneshot(
                Request::builder()
                    .uri("/v1/orders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
