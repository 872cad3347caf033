//! HTML dashboard. Every mutation is a form post answered with a redirect
//! back to the dashboard, carrying the notice to show in the query string.

use super::{
    render::{self, dashboard_query, DashboardView},
    valid_document_id, NoticeCode,
};
use crate::{
    orders::{Confirmation, DeleteOutcome, Expansion, LoadState, OrderDesk, Status, StatusFilter},
    sanity::ImageUrls,
};
use axum::{
    extract::{Extension, Form, Path, Query},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Deserialize, Debug, Default)]
pub struct DashboardQuery {
    pub status: Option<String>,
    pub expanded: Option<String>,
    pub notice: Option<String>,
}

/// Where the operator was when they acted, so the redirect lands back there.
#[derive(Deserialize, Debug, Default)]
pub struct ViewForm {
    pub filter: Option<String>,
    pub expanded: Option<String>,
}

impl ViewForm {
    fn filter(&self) -> StatusFilter {
        parse_filter(self.filter.as_deref())
    }

    fn expansion(&self) -> Expansion {
        Expansion::new(self.expanded.clone())
    }
}

#[derive(Deserialize, Debug)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
    pub filter: Option<String>,
    pub expanded: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DeleteForm {
    pub confirm: Option<String>,
    pub filter: Option<String>,
    pub expanded: Option<String>,
}

fn parse_filter(raw: Option<&str>) -> StatusFilter {
    raw.unwrap_or_default().parse().unwrap_or_else(|e| {
        debug!("ignoring status filter: {}", e);
        StatusFilter::All
    })
}

fn back_to(filter: StatusFilter, expansion: &Expansion, notice: Option<NoticeCode>) -> Redirect {
    Redirect::to(&dashboard_query(
        filter,
        expansion.expanded(),
        notice.map(NoticeCode::as_str),
    ))
}

pub async fn welcome() -> Html<String> {
    Html(render::welcome())
}

pub async fn dashboard(
    Extension(desk): Extension<Arc<OrderDesk>>,
    Extension(images): Extension<ImageUrls>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let filter = parse_filter(query.status.as_deref());
    let expansion = Expansion::new(query.expanded);
    let notice = query
        .notice
        .as_deref()
        .and_then(NoticeCode::parse)
        .map(NoticeCode::notice);

    let board = desk.board().await;
    let rows = filter
        .apply(board.orders())
        .into_iter()
        .map(|order| (order.clone(), board.row_state(&order.id)))
        .collect();

    Html(render::dashboard(DashboardView {
        filter,
        expansion,
        rows,
        load: board.load_state().clone(),
        notice,
        images,
    }))
}

#[instrument(skip(desk, form))]
pub async fn change_status(
    Extension(desk): Extension<Arc<OrderDesk>>,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let filter = parse_filter(form.filter.as_deref());
    let expansion = Expansion::new(form.expanded);

    if !valid_document_id(&id) {
        return back_to(filter, &expansion, Some(NoticeCode::InvalidId));
    }

    let status = match form.status.parse::<Status>() {
        Ok(status) => status,
        Err(e) => {
            warn!("rejected status change: {}", e);
            return back_to(filter, &expansion, Some(NoticeCode::StatusError));
        }
    };

    let notice = match desk.change_status(&id, status).await {
        Ok(_) => NoticeCode::status_changed(status),
        Err(_) => NoticeCode::StatusError,
    };

    back_to(filter, &expansion, Some(notice))
}

pub async fn confirm_delete(
    Extension(desk): Extension<Arc<OrderDesk>>,
    Path(id): Path<String>,
    Query(view): Query<ViewForm>,
) -> Response {
    let filter = view.filter();
    let expansion = view.expansion();

    if !valid_document_id(&id) {
        return back_to(filter, &expansion, Some(NoticeCode::InvalidId)).into_response();
    }

    let board = desk.board().await;
    Html(render::confirm_delete(
        &id,
        board.get(&id),
        filter,
        expansion.expanded(),
    ))
    .into_response()
}

#[instrument(skip(desk, form))]
pub async fn delete(
    Extension(desk): Extension<Arc<OrderDesk>>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Redirect {
    let filter = parse_filter(form.filter.as_deref());
    let expansion = Expansion::new(form.expanded);

    if !valid_document_id(&id) {
        return back_to(filter, &expansion, Some(NoticeCode::InvalidId));
    }

    let confirmation = Confirmation::from(form.confirm.as_deref() == Some("yes"));

    match desk.delete(&id, confirmation).await {
        Ok(DeleteOutcome::NeedsConfirmation) => {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("filter", filter.as_str());
            if let Some(expanded) = expansion.expanded() {
                query.append_pair("expanded", expanded);
            }
            Redirect::to(&format!("/admin/orders/{id}/delete?{}", query.finish()))
        }
        Ok(DeleteOutcome::Deleted(_)) => {
            // A deleted order has no detail panel left to show.
            let expansion = if expansion.is_expanded(&id) {
                Expansion::default()
            } else {
                expansion
            };
            back_to(filter, &expansion, Some(NoticeCode::Deleted))
        }
        Err(_) => back_to(filter, &expansion, Some(NoticeCode::DeleteError)),
    }
}

/// Retry a failed load on request.
pub async fn reload(Extension(desk): Extension<Arc<OrderDesk>>) -> Redirect {
    let notice = match desk.load().await {
        LoadState::Failed(_) => Some(NoticeCode::LoadError),
        _ => None,
    };

    back_to(StatusFilter::All, &Expansion::default(), notice)
}
