use crate::{
    orders::{store::DynOrderStore, OrderDesk},
    sanity::{self, ImageUrls, SanityClient},
    session::{now_unix, require_api_session, require_page_session, SessionStore},
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
    response::Redirect,
    routing::{get, post, put},
    Router,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use self::handlers::login::AuthConfig;
pub use self::openapi::openapi;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Build the application router.
///
/// Routes under `/admin` render HTML and send visitors without a session to
/// `/login`; routes under `/v1/orders` answer `401` instead.
#[must_use]
pub fn router(
    desk: Arc<OrderDesk>,
    sessions: Arc<SessionStore>,
    images: ImageUrls,
    auth: AuthConfig,
) -> Router {
    use handlers::{dashboard, health, login, orders};

    let pages = Router::new()
        .route("/admin", get(dashboard::welcome))
        .route("/admin/dashboard", get(dashboard::dashboard))
        .route("/admin/reload", post(dashboard::reload))
        .route("/admin/orders/:id/status", post(dashboard::change_status))
        .route(
            "/admin/orders/:id/delete",
            get(dashboard::confirm_delete).post(dashboard::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            sessions.clone(),
            require_page_session,
        ));

    let api = Router::new()
        .route("/v1/orders", get(orders::list))
        .route("/v1/orders/reload", post(orders::reload))
        .route(
            "/v1/orders/:id",
            get(orders::get_order).delete(orders::delete),
        )
        .route("/v1/orders/:id/status", put(orders::change_status))
        .route_layer(middleware::from_fn_with_state(
            sessions.clone(),
            require_api_session,
        ));

    Router::new()
        .route("/", get(|| async { Redirect::to("/admin") }))
        .route("/login", get(login::login_page).post(login::login))
        .route("/logout", post(login::logout))
        .route("/v1/auth/login", post(login::api_login))
        .merge(pages)
        .merge(api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(desk.clone()))
                .layer(Extension(sessions))
                .layer(Extension(images))
                .layer(Extension(auth)),
        )
        .route("/health", get(health::health).options(health::health))
        .layer(Extension(desk))
}

/// Start the server
/// # Errors
/// Return error if the Sanity client cannot be built or the port cannot be bound
pub async fn new(
    port: u16,
    sanity: sanity::Config,
    auth: AuthConfig,
    session_ttl_seconds: u64,
) -> Result<()> {
    let client = SanityClient::new(sanity)?;
    let images = ImageUrls::new(client.config());

    info!(
        "Using Sanity project {} dataset {} (API {})",
        client.config().project_id(),
        client.config().dataset(),
        client.config().api_version()
    );

    let store: DynOrderStore = Arc::new(client);
    let desk = Arc::new(OrderDesk::new(store));
    let sessions = Arc::new(SessionStore::new(session_ttl_seconds));

    // Serve right away; the board reports `loading` until the first fetch returns.
    let loader = desk.clone();
    tokio::spawn(async move {
        loader.load().await;
    });

    let purger = sessions.clone();
    let purge = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purger.purge_expired(now_unix());
            if purged > 0 {
                debug!("purged {} expired sessions", purged);
            }
        }
    });

    let app = router(desk.clone(), sessions, images, auth);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            desk.close();
            info!("Gracefully shutdown");
        })
        .await?;

    purge.abort();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
