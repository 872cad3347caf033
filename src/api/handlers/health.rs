use crate::{
    orders::{LoadState, OrderDesk},
    GIT_COMMIT_HASH,
};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    orders: String,
    count: usize,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Orders are loaded (or still loading)", body = [Health]),
        (status = 503, description = "The last order load failed", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, desk: Extension<Arc<OrderDesk>>) -> impl IntoResponse {
    let (load, count) = {
        let board = desk.0.board().await;
        (board.load_state().clone(), board.orders().len())
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        orders: load.as_str().to_string(),
        count,
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    if let LoadState::Failed(e) = &load {
        debug!("Orders are unavailable: {}", e);

        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    } else {
        (StatusCode::OK, headers, body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::tests::{body_json, test_app};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_loaded_orders() {
        let (app, _store, _token) = test_app(vec![crate::orders::tests::order("1", None)]).await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let x_app = response
            .headers()
            .get("X-App")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(x_app.starts_with(concat!(env!("CARGO_PKG_NAME"), ":", env!("CARGO_PKG_VERSION"))));

        let body = body_json(response).await;
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["orders"], "loaded");
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn health_unavailable_after_failed_load() {
        let (app, store, token) = test_app(Vec::new()).await;
        store.fail_fetch(true);

        let reload = app
            .clone()
            .oneshot(crate::api::tests::request(
                "POST",
                "/v1/orders/reload",
                &token,
                Body::empty(),
            ))
            .await
            .unwrap();
        assert_eq!(reload.status(), StatusCode::BAD_GATEWAY);

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key("X-App"));
    }
}
