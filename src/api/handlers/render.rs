//! Server-rendered pages for the dashboard. Each page is a Leptos component
//! rendered to a complete HTML document; text and attribute values are
//! escaped by the renderer.

use super::Notice;
use crate::{
    orders::{Expansion, LoadState, Order, RowState, Status, StatusFilter},
    sanity::ImageUrls,
};
use leptos::{prelude::*, tachys::view::RenderHtml};
use url::form_urlencoded;

const THUMBNAIL_SIZE: u32 = 100;

pub(crate) struct DashboardView {
    pub filter: StatusFilter,
    pub expansion: Expansion,
    pub rows: Vec<(Order, RowState)>,
    pub load: LoadState,
    pub notice: Option<Notice>,
    pub images: ImageUrls,
}

/// Query string for the dashboard, omitting defaults.
pub(crate) fn dashboard_query(
    filter: StatusFilter,
    expanded: Option<&str>,
    notice: Option<&str>,
) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if filter != StatusFilter::All {
        query.append_pair("status", filter.as_str());
    }
    if let Some(expanded) = expanded {
        query.append_pair("expanded", expanded);
    }
    if let Some(notice) = notice {
        query.append_pair("notice", notice);
    }
    let query = query.finish();
    if query.is_empty() {
        "/admin/dashboard".to_string()
    } else {
        format!("/admin/dashboard?{query}")
    }
}

fn back_query(filter: StatusFilter, expanded: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("filter", filter.as_str());
    if let Some(expanded) = expanded {
        query.append_pair("expanded", expanded);
    }
    query.finish()
}

fn document<F, V>(page: F) -> String
where
    F: FnOnce() -> V,
    V: IntoView,
{
    let owner = Owner::new();
    let html = owner.with(|| page().to_html());
    format!("<!DOCTYPE html>{html}")
}

pub(crate) fn login(error: Option<&str>) -> String {
    let error = error.map(str::to_string);
    document(move || view! { <LoginPage error=error /> })
}

pub(crate) fn welcome() -> String {
    document(|| view! { <WelcomePage /> })
}

pub(crate) fn dashboard(page: DashboardView) -> String {
    document(move || view! { <DashboardPage page=page /> })
}

pub(crate) fn confirm_delete(
    id: &str,
    order: Option<&Order>,
    filter: StatusFilter,
    expanded: Option<&str>,
) -> String {
    let id = id.to_string();
    let summary = order.map(|order| (order.id.clone(), order.customer_name()));
    let expanded = expanded.map(str::to_string);
    document(move || {
        view! { <ConfirmDeletePage id=id summary=summary filter=filter expanded=expanded /> }
    })
}

#[component]
fn Page(title: &'static str, children: Children) -> impl IntoView {
    view! {
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <title>{title}</title>
            </head>
            <body class="bg-gray-100">{children()}</body>
        </html>
    }
}

/// Title and text of a notice; the icon picks the banner style.
#[component]
fn NoticeBanner(notice: Notice) -> impl IntoView {
    let class = format!("notice notice-{}", notice.icon.as_str());

    view! {
        <div class=class role="alert">
            <strong>{notice.title}</strong>
            <span>{notice.text}</span>
        </div>
    }
}

#[component]
fn LoginPage(error: Option<String>) -> impl IntoView {
    view! {
        <Page title="Admin Login">
            <main class="login">
                <h1>"Admin Login"</h1>
                {error.map(|message| view! { <p class="error" role="alert">{message}</p> })}
                <form method="post" action="/login">
                    <label>
                        <span>"Password"</span>
                        <input type="password" name="password" required="required" autofocus="autofocus" />
                    </label>
                    <button type="submit">"Login"</button>
                </form>
            </main>
        </Page>
    }
}

#[component]
fn WelcomePage() -> impl IntoView {
    view! {
        <Page title="Admin">
            <h1>"Welcome to the Admin Dashboard"</h1>
            <p>
                <a href="/admin/dashboard">"Orders"</a>
            </p>
        </Page>
    }
}

/// Status tabs, banners and the order table with at most one open detail row.
#[component]
fn DashboardPage(page: DashboardView) -> impl IntoView {
    let DashboardView {
        filter,
        expansion,
        rows,
        load,
        notice,
        images,
    } = page;
    let expanded = expansion.expanded().map(str::to_string);

    let tabs = StatusFilter::TABS
        .into_iter()
        .map(|tab| {
            let active = tab == filter;
            let class = if active { "tab active" } else { "tab" };
            view! {
                <a href=dashboard_query(tab, None, None) aria-current=active.then_some("page") class=class>
                    {tab.tab_label()}
                </a>
            }
        })
        .collect_view();

    let load_error = match load {
        LoadState::Failed(error) => Some(view! {
            <div class="notice notice-error" role="alert">
                <strong>"Orders could not be loaded."</strong>
                <span>{error}</span>
                <form method="post" action="/admin/reload">
                    <button type="submit">"Retry"</button>
                </form>
            </div>
        }),
        _ => None,
    };

    let rows = rows
        .into_iter()
        .map(|(order, row)| {
            let toggle_href =
                dashboard_query(filter, expansion.toggle(&order.id).expanded(), None);
            let delete_href = format!(
                "/admin/orders/{}/delete?{}",
                order.id,
                back_query(filter, expanded.as_deref())
            );
            let total = format!("${}", order.total.map(|t| t.to_string()).unwrap_or_default());
            let details = expansion
                .is_expanded(&order.id)
                .then(|| view! { <OrderDetails order=order.clone() images=images.clone() /> });

            view! {
                <tr class="order-row">
                    <td>
                        <a href=toggle_href>{order.id.clone()}</a>
                    </td>
                    <td>{order.customer_name()}</td>
                    <td>{order.address.clone().unwrap_or_default()}</td>
                    <td>{order.display_date()}</td>
                    <td>{total}</td>
                    <td>
                        <StatusForm
                            id=order.id.clone()
                            status=order.status
                            filter=filter
                            expanded=expanded.clone()
                        />
                        <RowMarker row=row />
                    </td>
                    <td>
                        <a class="delete" href=delete_href>"Delete"</a>
                    </td>
                </tr>
                {details}
            }
        })
        .collect_view();

    view! {
        <Page title="Admin Dashboard">
            <nav class="bg-green-600 text-white">
                <h2>"Admin Dashboard"</h2>
                <div class="tabs">{tabs}</div>
                <form method="post" action="/logout">
                    <button type="submit">"Logout"</button>
                </form>
            </nav>
            {notice.map(|notice| view! { <NoticeBanner notice=notice /> })}
            {load_error}
            <main>
                <h2>"Orders"</h2>
                <table>
                    <thead>
                        <tr>
                            <th>"ID"</th>
                            <th>"Customer"</th>
                            <th>"Address"</th>
                            <th>"Date"</th>
                            <th>"Total"</th>
                            <th>"Status"</th>
                            <th>"Actions"</th>
                        </tr>
                    </thead>
                    <tbody>{rows}</tbody>
                </table>
            </main>
        </Page>
    }
}

/// Status select for one row. Posts back the current filter and expansion so
/// the redirect lands on the same view.
#[component]
fn StatusForm(
    id: String,
    status: Option<Status>,
    filter: StatusFilter,
    expanded: Option<String>,
) -> impl IntoView {
    let action = format!("/admin/orders/{id}/status");
    let options = Status::ALL
        .into_iter()
        .map(|option| {
            let selected = (status == Some(option)).then_some("selected");
            view! { <option value=option.as_str() selected=selected>{option.label()}</option> }
        })
        .collect_view();

    view! {
        <form method="post" action=action>
            <input type="hidden" name="filter" value=filter.as_str() />
            {expanded.map(|expanded| view! { <input type="hidden" name="expanded" value=expanded /> })}
            <select name="status">
                {status
                    .is_none()
                    .then(|| view! { <option value="" selected="selected" disabled="disabled"></option> })}
                {options}
            </select>
            <button type="submit">"Save"</button>
        </form>
    }
}

#[component]
fn RowMarker(row: RowState) -> impl IntoView {
    match row {
        RowState::Idle => None,
        RowState::Pending => Some(view! { <span class="row-pending">"Saving"</span> }.into_any()),
        RowState::Failed(error) => {
            Some(view! { <span class="row-failed" title=error>"Failed"</span> }.into_any())
        }
    }
}

#[component]
fn OrderDetails(order: Order, images: ImageUrls) -> impl IntoView {
    let Order {
        phone,
        email,
        city,
        cart_items,
        ..
    } = order;
    let size = THUMBNAIL_SIZE.to_string();

    let items = cart_items
        .into_iter()
        .map(|item| {
            let thumbnail = item
                .image
                .as_ref()
                .and_then(|image| images.sized(image, THUMBNAIL_SIZE, THUMBNAIL_SIZE))
                .map(|src| {
                    view! { <img src=src alt="image" width=size.clone() height=size.clone() /> }
                });
            view! {
                <li>
                    <span>{item.name.unwrap_or_default()}</span>
                    {thumbnail}
                </li>
            }
        })
        .collect_view();

    view! {
        <tr class="order-details">
            <td colspan="7">
                <h3>"Order Details"</h3>
                <p>
                    <strong>"Phone: "</strong>
                    <span>{phone.unwrap_or_default()}</span>
                </p>
                <p>
                    <strong>"Email: "</strong>
                    <span>{email.unwrap_or_default()}</span>
                </p>
                <p>
                    <strong>"City: "</strong>
                    <span>{city.unwrap_or_default()}</span>
                </p>
                <ul class="cart-items">{items}</ul>
            </td>
        </tr>
    }
}

#[component]
fn ConfirmDeletePage(
    id: String,
    summary: Option<(String, String)>,
    filter: StatusFilter,
    expanded: Option<String>,
) -> impl IntoView {
    let notice = Notice::confirm_delete();
    let action = format!("/admin/orders/{id}/delete");
    let back = dashboard_query(filter, expanded.as_deref(), None);

    view! {
        <Page title="Delete order">
            <main class="confirm">
                <h2>{notice.title}</h2>
                <p>{notice.text}</p>
                {summary
                    .map(|(id, customer)| {
                        view! {
                            <p class="summary">
                                <span>"Order "</span>
                                <span>{id}</span>
                                <span>" for "</span>
                                <span>{customer}</span>
                            </p>
                        }
                    })}
                <form method="post" action=action>
                    <input type="hidden" name="confirm" value="yes" />
                    <input type="hidden" name="filter" value=filter.as_str() />
                    {expanded.map(|expanded| view! { <input type="hidden" name="expanded" value=expanded /> })}
                    <button type="submit">"Yes, delete it!"</button>
                </form>
                <a href=back>"Cancel"</a>
            </main>
        </Page>
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        orders::{tests::order, AssetRef, CartItem, ImageRef},
        sanity::Config,
    };
    use secrecy::SecretString;

    fn images() -> ImageUrls {
        ImageUrls::new(
            &Config::new("test", "production", SecretString::from("t".to_string())).unwrap(),
        )
    }

    fn page(rows: Vec<(Order, RowState)>, expanded: Option<&str>) -> DashboardView {
        DashboardView {
            filter: StatusFilter::All,
            expansion: Expansion::new(expanded.map(str::to_string)),
            rows,
            load: LoadState::Loaded,
            notice: None,
            images: images(),
        }
    }

    #[test]
    fn dashboard_query_omits_defaults() {
        assert_eq!(dashboard_query(StatusFilter::All, None, None), "/admin/dashboard");
        assert_eq!(
            dashboard_query(StatusFilter::Only(Status::Pending), Some("1"), Some("deleted")),
            "/admin/dashboard?status=pending&expanded=1&notice=deleted"
        );
    }

    #[test]
    fn document_fields_are_escaped() {
        let mut o = order("1", None);
        o.first_name = Some(r#"<script>alert("x")</script>"#.to_string());
        o.address = Some("Fish & Chips Lane".to_string());

        let html = dashboard(page(vec![(o, RowState::Idle)], None));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Fish &amp; Chips Lane"));
    }

    #[test]
    fn failed_row_title_is_escaped() {
        let html = dashboard(page(
            vec![(
                order("1", None),
                RowState::Failed(r#"store said "no""#.to_string()),
            )],
            None,
        ));
        assert!(html.contains("row-failed"));
        assert!(html.contains(r#"title="store said &quot;no&quot;""#));
    }

    #[test]
    fn unset_status_renders_blank_selection() {
        let html = dashboard(page(vec![(order("1", None), RowState::Idle)], None));
        assert!(html.contains(r#"<option value="" selected="selected" disabled="disabled">"#));
        assert!(!html.contains(r#"value="pending" selected"#));

        let html = dashboard(page(
            vec![(order("1", Some(Status::Success)), RowState::Idle)],
            None,
        ));
        assert!(html.contains(r#"<option value="success" selected="selected">"#));
        assert!(!html.contains(r#"<option value="" selected"#));
    }

    #[test]
    fn details_render_items_with_and_without_images() {
        let mut o = order("1", None);
        o.cart_items = vec![
            CartItem {
                name: Some("Chair".to_string()),
                image: Some(ImageRef {
                    asset: Some(AssetRef {
                        reference: "image-a1b2-100x100-png".to_string(),
                    }),
                }),
            },
            CartItem {
                name: Some("Table".to_string()),
                image: None,
            },
        ];

        let html = dashboard(page(vec![(o, RowState::Idle)], Some("1")));
        assert!(html.contains(
            r#"src="https://cdn.sanity.io/images/test/production/a1b2-100x100.png?w=100&amp;h=100""#
        ));
        assert!(html.contains("<span>Chair</span>"));
        assert!(html.contains("<span>Table</span>"));
        assert_eq!(html.matches("<img").count(), 1);
        assert!(html.contains("<span>3001234567</span>"));
    }

    #[test]
    fn details_without_items_render_empty_list() {
        let html = dashboard(page(vec![(order("1", None), RowState::Idle)], Some("1")));
        assert!(html.contains(r#"class="cart-items""#));
        assert!(!html.contains("<li>"));
    }

    #[test]
    fn dashboard_renders_expanded_row_only() {
        let mut view = page(
            vec![
                (order("1", Some(Status::Pending)), RowState::Idle),
                (order("2", Some(Status::Success)), RowState::Pending),
            ],
            Some("2"),
        );
        view.notice = Some(Notice::deleted());

        let html = dashboard(view);
        assert_eq!(html.matches("order-details").count(), 1);
        assert!(html.contains("Your order has been deleted"));
        assert!(html.contains("row-pending"));
        // Clicking the expanded row collapses it; the other row expands itself.
        assert!(html.contains(r#"href="/admin/dashboard">2</a>"#));
        assert!(html.contains(r#"href="/admin/dashboard?expanded=1">1</a>"#));
    }

    #[test]
    fn load_failure_offers_retry() {
        let mut view = page(Vec::new(), None);
        view.load = LoadState::Failed("dataset <unavailable>".to_string());

        let html = dashboard(view);
        assert!(html.contains("Orders could not be loaded."));
        assert!(html.contains("dataset &lt;unavailable&gt;"));
        assert!(html.contains(r#"action="/admin/reload""#));
    }

    #[test]
    fn login_shows_error_only_when_given() {
        assert!(!login(None).contains("role=\"alert\""));
        let html = login(Some("Invalid password"));
        assert!(html.contains("Invalid password"));
        assert!(html.contains(r#"action="/login""#));
    }

    #[test]
    fn confirm_delete_keeps_view_state() {
        let o = order("1", None);
        let html = confirm_delete("1", Some(&o), StatusFilter::Only(Status::Pending), Some("1"));
        assert!(html.contains("Are you sure?"));
        assert!(html.contains(r#"action="/admin/orders/1/delete""#));
        assert!(html.contains(r#"name="filter" value="pending""#));
        assert!(html.contains(r#"name="expanded" value="1""#));
        assert!(html.contains(r#"href="/admin/dashboard?status=pending&amp;expanded=1""#));
        assert!(html.contains("<span>Ada Lovelace</span>"));
    }
}
