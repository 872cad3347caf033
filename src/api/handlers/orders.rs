use super::{valid_document_id, Notice};
use crate::{
    orders::{
        Confirmation, DeleteOutcome, Expansion, LoadState, Order, OrderDesk, RowState, Status,
        StatusFilter,
    },
    sanity::{ImageUrls, StoreError},
};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// `All`, `pending`, `success` or `dispatch`
    pub status: Option<String>,
    /// Id of the order whose details are open
    pub expanded: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// Must be `true` for the deletion to happen
    #[serde(default)]
    pub confirm: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct StatusChange {
    pub status: Status,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct CartItemView {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct OrderRow {
    pub order: Order,
    pub expanded: bool,
    pub row: RowState,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct OrderListing {
    pub filter: String,
    pub expanded: Option<String>,
    pub load: LoadState,
    pub orders: Vec<OrderRow>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct OrderDetail {
    pub order: Order,
    pub row: RowState,
    pub items: Vec<CartItemView>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MutationResult {
    pub notice: Notice,
    pub order: Option<Order>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ReloadResult {
    pub load: LoadState,
    pub count: usize,
}

fn notice_response(status: StatusCode, notice: Notice) -> Response {
    (
        status,
        Json(MutationResult {
            notice,
            order: None,
        }),
    )
        .into_response()
}

fn store_failure(error: &StoreError, notice: Notice) -> Response {
    match error {
        StoreError::Cancelled => notice_response(StatusCode::SERVICE_UNAVAILABLE, Notice::unavailable()),
        _ => notice_response(StatusCode::BAD_GATEWAY, notice),
    }
}

#[utoipa::path(
    get,
    path = "/v1/orders",
    params(ListQuery),
    responses(
        (status = 200, description = "Orders matching the filter, in load order", body = OrderListing),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "No active session")
    ),
    tag = "orders"
)]
#[instrument(skip(desk))]
pub async fn list(Extension(desk): Extension<Arc<OrderDesk>>, Query(query): Query<ListQuery>) -> Response {
    let filter = match query.status.as_deref().unwrap_or_default().parse::<StatusFilter>() {
        Ok(filter) => filter,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    let expansion = Expansion::new(query.expanded);

    let board = desk.board().await;
    let orders: Vec<OrderRow> = filter
        .apply(board.orders())
        .into_iter()
        .map(|order| OrderRow {
            expanded: expansion.is_expanded(&order.id),
            row: board.row_state(&order.id),
            order: order.clone(),
        })
        .collect();

    debug!("listing {} orders", orders.len());

    Json(OrderListing {
        filter: filter.as_str().to_string(),
        expanded: expansion.expanded().map(str::to_string),
        load: board.load_state().clone(),
        orders,
    })
    .into_response()
}

#[utoipa::path(
    get,
    path = "/v1/orders/{id}",
    params(("id" = String, Path, description = "Order document id")),
    responses(
        (status = 200, description = "Order with cart item image URLs", body = OrderDetail),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Order is not on the board")
    ),
    tag = "orders"
)]
pub async fn get_order(
    Extension(desk): Extension<Arc<OrderDesk>>,
    Extension(images): Extension<ImageUrls>,
    Path(id): Path<String>,
) -> Response {
    if !valid_document_id(&id) {
        return notice_response(StatusCode::BAD_REQUEST, Notice::invalid_id());
    }

    let board = desk.board().await;
    let Some(order) = board.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let items = order
        .cart_items
        .iter()
        .map(|item| CartItemView {
            name: item.name.clone(),
            image_url: item.image.as_ref().and_then(|image| images.url_for(image)),
        })
        .collect();

    Json(OrderDetail {
        order: order.clone(),
        row: board.row_state(&id),
        items,
    })
    .into_response()
}

#[utoipa::path(
    put,
    path = "/v1/orders/{id}/status",
    params(("id" = String, Path, description = "Order document id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status committed and mirrored locally", body = MutationResult),
        (status = 400, description = "Malformed id", body = MutationResult),
        (status = 502, description = "Document store rejected the patch", body = MutationResult)
    ),
    tag = "orders"
)]
#[instrument(skip(desk))]
pub async fn change_status(
    Extension(desk): Extension<Arc<OrderDesk>>,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Response {
    if !valid_document_id(&id) {
        return notice_response(StatusCode::BAD_REQUEST, Notice::invalid_id());
    }

    match desk.change_status(&id, change.status).await {
        Ok(order) => Json(MutationResult {
            notice: Notice::status_changed(change.status),
            order,
        })
        .into_response(),
        Err(e) => store_failure(&e, Notice::status_failed()),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/orders/{id}",
    params(("id" = String, Path, description = "Order document id"), DeleteQuery),
    responses(
        (status = 200, description = "Order deleted", body = MutationResult),
        (status = 400, description = "Malformed id", body = MutationResult),
        (status = 428, description = "Confirmation required, nothing was deleted", body = MutationResult),
        (status = 502, description = "Document store rejected the deletion", body = MutationResult)
    ),
    tag = "orders"
)]
#[instrument(skip(desk))]
pub async fn delete(
    Extension(desk): Extension<Arc<OrderDesk>>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Response {
    if !valid_document_id(&id) {
        return notice_response(StatusCode::BAD_REQUEST, Notice::invalid_id());
    }

    match desk.delete(&id, Confirmation::from(query.confirm)).await {
        Ok(DeleteOutcome::NeedsConfirmation) => {
            notice_response(StatusCode::PRECONDITION_REQUIRED, Notice::confirm_delete())
        }
        Ok(DeleteOutcome::Deleted(order)) => Json(MutationResult {
            notice: Notice::deleted(),
            order,
        })
        .into_response(),
        Err(e) => store_failure(&e, Notice::delete_failed()),
    }
}

#[utoipa::path(
    post,
    path = "/v1/orders/reload",
    responses(
        (status = 200, description = "Orders reloaded", body = ReloadResult),
        (status = 502, description = "Load failed; previous orders kept", body = ReloadResult)
    ),
    tag = "orders"
)]
#[instrument(skip(desk))]
pub async fn reload(Extension(desk): Extension<Arc<OrderDesk>>) -> Response {
    let load = desk.load().await;
    let count = desk.board().await.orders().len();

    let status = match load {
        LoadState::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };

    (status, Json(ReloadResult { load, count })).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        api::tests::{body_json, get, request, test_app},
        orders::tests::order,
    };
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use tower::ServiceExt;

    fn seed() -> Vec<Order> {
        vec![
            order("1", Some(Status::Pending)),
            order("2", Some(Status::Success)),
        ]
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (app, _store, token) = test_app(seed()).await;

        let response = app
            .oneshot(get("/v1/orders?status=pending", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["filter"], "pending");
        assert_eq!(body["orders"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["orders"][0]["order"]["_id"], "1");
    }

    #[tokio::test]
    async fn list_marks_expanded_row() {
        let (app, _store, token) = test_app(seed()).await;

        let response = app
            .oneshot(get("/v1/orders?expanded=2", &token))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["filter"], "All");
        assert_eq!(body["orders"][0]["expanded"], false);
        assert_eq!(body["orders"][1]["expanded"], true);
        assert_eq!(body["load"]["state"], "loaded");
    }

    #[tokio::test]
    async fn list_rejects_unknown_filter() {
        let (app, _store, token) = test_app(seed()).await;
        let response = app
            .oneshot(get("/v1/orders?status=shipped", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn change_status_scenario() {
        let (app, store, token) = test_app(seed()).await;

        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                "/v1/orders/1/status",
                &token,
                Body::from(json!({ "status": "dispatch" }).to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["notice"]["title"], "Dispatch");
        assert_eq!(body["notice"]["text"], "The order is now dispatch.");
        assert_eq!(body["order"]["status"], "dispatch");
        assert_eq!(store.status_of("1"), Some(Status::Dispatch));

        let listing = body_json(app.oneshot(get("/v1/orders", &token)).await.unwrap()).await;
        assert_eq!(listing["orders"][0]["order"]["status"], "dispatch");
        assert_eq!(listing["orders"][1]["order"]["status"], "success");
    }

    #[tokio::test]
    async fn change_status_failure() {
        let (app, store, token) = test_app(seed()).await;
        store.fail_mutations(true);

        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                "/v1/orders/1/status",
                &token,
                Body::from(json!({ "status": "success" }).to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["notice"]["text"], "Failed to change status");

        let listing = body_json(app.oneshot(get("/v1/orders", &token)).await.unwrap()).await;
        assert_eq!(listing["orders"][0]["order"]["status"], "pending");
        assert_eq!(listing["orders"][0]["row"]["state"], "failed");
    }

    #[tokio::test]
    async fn delete_without_confirmation_is_refused() {
        let (app, store, token) = test_app(seed()).await;

        let response = app
            .oneshot(request("DELETE", "/v1/orders/1", &token, Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PRECONDITION_REQUIRED);
        let body = body_json(response).await;
        assert_eq!(body["notice"]["title"], "Are you sure?");
        assert!(store.contains("1"));
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn delete_confirmed() {
        let (app, store, token) = test_app(seed()).await;

        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                "/v1/orders/1?confirm=true",
                &token,
                Body::empty(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!store.contains("1"));

        let listing = body_json(app.oneshot(get("/v1/orders", &token)).await.unwrap()).await;
        assert_eq!(listing["orders"].as_array().map(Vec::len), Some(1));
        assert_eq!(listing["orders"][0]["order"]["_id"], "2");
    }

    #[tokio::test]
    async fn invalid_id_never_reaches_store() {
        let (app, store, token) = test_app(seed()).await;

        let response = app
            .oneshot(request(
                "DELETE",
                "/v1/orders/bad%20id?confirm=true",
                &token,
                Body::empty(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn get_order_detail() {
        let mut seeded = seed();
        seeded[0].cart_items = vec![
            crate::orders::CartItem {
                name: Some("Chair".to_string()),
                image: Some(crate::orders::ImageRef {
                    asset: Some(crate::orders::AssetRef {
                        reference: "image-a1b2-100x100-png".to_string(),
                    }),
                }),
            },
            crate::orders::CartItem {
                name: Some("Table".to_string()),
                image: None,
            },
        ];
        let (app, _store, token) = test_app(seeded).await;

        let response = app
            .clone()
            .oneshot(get("/v1/orders/1", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["items"][0]["image_url"],
            "https://cdn.sanity.io/images/test/production/a1b2-100x100.png"
        );
        assert!(body["items"][1]["image_url"].is_null());

        let missing = app.oneshot(get("/v1/orders/9", &token)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reload_reports_failure() {
        let (app, store, token) = test_app(seed()).await;
        store.fail_fetch(true);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/orders/reload")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["load"]["state"], "failed");
        assert_eq!(body["count"], 2);
    }
}
