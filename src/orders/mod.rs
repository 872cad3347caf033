//! Order documents, their fulfillment status and the pure view operations
//! (status filter and row expansion) applied to the loaded board.

pub mod board;
pub mod desk;
pub mod store;

pub use self::board::{LoadState, OrderBoard, RowState};
pub use self::desk::{Confirmation, DeleteOutcome, OrderDesk};
pub use self::store::OrderStore;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use tracing::warn;
use utoipa::ToSchema;

/// GROQ projection used to load every order together with its cart items.
pub const ORDER_QUERY: &str = r#"*[_type == "order"]{
  _id,
  firstName,
  lastName,
  phone,
  email,
  address,
  city,
  zipCode,
  total,
  discount,
  orderData,
  status,
  cartItems[]{
    name,
    image
  }
}"#;

/// Fulfillment state of an order. The only field this service writes.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Success,
    Dispatch,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Success, Self::Dispatch];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Dispatch => "dispatch",
        }
    }

    /// Label shown in the status selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Dispatch => "Dispatched",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "dispatch" => Ok(Self::Dispatch),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Stored documents may carry `null`, nothing, or a value written by some
/// other tool. Anything that is not a known status reads as unset.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|value| value.parse().ok()))
}

/// Strings as-is, numbers in their plain decimal form, anything else unset.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number_text(&number)),
        _ => None,
    })
}

fn number_text(number: &serde_json::Number) -> String {
    match (number.as_i64(), number.as_f64()) {
        (Some(whole), _) => whole.to_string(),
        #[allow(clippy::cast_possible_truncation)]
        (None, Some(float)) if float.fract() == 0.0 && float.abs() < 1e15 => {
            (float as i64).to_string()
        }
        _ => number.to_string(),
    }
}

/// Numbers, or strings holding a number.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// `null` or a non-array reads as no items; items that do not decode are dropped.
fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_image<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|image| serde_json::from_value(image).ok()))
}

/// Decode each fetched document on its own. A document that cannot be read
/// at all (no string `_id`, not an object) is logged and skipped so the rest
/// of the dataset still loads.
#[must_use]
pub fn decode_orders(documents: Vec<Value>) -> Vec<Order> {
    let total = documents.len();
    let orders: Vec<Order> = documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("_id").cloned();
            serde_json::from_value(document)
                .map_err(|e| warn!("skipping order document {:?}: {}", id, e))
                .ok()
        })
        .collect();

    if orders.len() < total {
        warn!("decoded {} of {} order documents", orders.len(), total);
    }

    orders
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub reference: String,
}

/// Sanity image field as returned by the projection (`{ asset: { _ref } }`).
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetRef>,
}

impl ImageRef {
    #[must_use]
    pub fn asset_ref(&self) -> Option<&str> {
        self.asset.as_ref().map(|asset| asset.reference.as_str())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CartItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_image")]
    pub image: Option<ImageRef>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_name: Option<String>,
    /// Stored as a number by the checkout; kept as text for display.
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub order_data: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub cart_items: Vec<CartItem>,
}

impl Order {
    #[must_use]
    pub fn customer_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `orderData` rendered as `M/D/YYYY`, or `Invalid Date` when it does not parse.
    #[must_use]
    pub fn display_date(&self) -> String {
        self.order_data
            .as_deref()
            .and_then(parse_order_date)
            .map_or_else(
                || "Invalid Date".to_string(),
                |date| date.format("%-m/%-d/%Y").to_string(),
            )
    }
}

fn parse_order_date(raw: &str) -> Option<chrono::NaiveDate> {
    let raw = raw.trim();
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    if let Ok(datetime) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(datetime.date());
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Filter tab selected on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub const TABS: [Self; 4] = [
        Self::All,
        Self::Only(Status::Pending),
        Self::Only(Status::Success),
        Self::Only(Status::Dispatch),
    ];

    #[must_use]
    pub fn matches(self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Only(status) => order.status == Some(status),
        }
    }

    /// Keeps the relative order of `orders`.
    #[must_use]
    pub fn apply(self, orders: &[Order]) -> Vec<&Order> {
        orders.iter().filter(|order| self.matches(order)).collect()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(status) => status.as_str(),
        }
    }

    #[must_use]
    pub const fn tab_label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(Status::Pending) => "Pending",
            Self::Only(Status::Success) => "Success",
            Self::Only(Status::Dispatch) => "Dispatch",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed.parse().map(Self::Only)
    }
}

/// Which order's detail panel is open. At most one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expansion(Option<String>);

impl Expansion {
    #[must_use]
    pub fn new(expanded: Option<String>) -> Self {
        Self(expanded.filter(|id| !id.is_empty()))
    }

    /// Selecting the expanded order collapses it; any other order takes its place.
    #[must_use]
    pub fn toggle(&self, id: &str) -> Self {
        if self.is_expanded(id) {
            Self(None)
        } else {
            Self(Some(id.to_string()))
        }
    }

    #[must_use]
    pub fn is_expanded(&self, id: &str) -> bool {
        self.0.as_deref() == Some(id)
    }

    #[must_use]
    pub fn expanded(&self) -> Option<&str> {
        self.0.as_deref()
    }
}
