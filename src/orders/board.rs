//! In-memory mirror of the order documents.
//!
//! Every transform is keyed by order id, so concurrent mutations on different
//! orders can be merged in any order without losing each other's updates.

use super::{Order, Status};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Outcome of the most recent load.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Loading,
    Loaded,
    Failed(String),
}

impl LoadState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Per-row feedback while a mutation is in flight or after it failed.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum RowState {
    #[default]
    Idle,
    Pending,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct OrderBoard {
    orders: Vec<Order>,
    rows: HashMap<String, RowState>,
    load: LoadState,
}

impl OrderBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole board with a fresh load.
    pub fn replace(&mut self, orders: Vec<Order>) {
        self.orders = orders;
        self.rows.clear();
        self.load = LoadState::Loaded;
    }

    /// Record a failed load. Previously loaded orders are kept.
    pub fn fail_load(&mut self, error: String) {
        self.load = LoadState::Failed(error);
    }

    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    /// Set the status of the matching entry in place. Returns the updated order.
    pub fn set_status(&mut self, id: &str, status: Status) -> Option<&Order> {
        let order = self.orders.iter_mut().find(|order| order.id == id)?;
        order.status = Some(status);
        Some(order)
    }

    pub fn remove(&mut self, id: &str) -> Option<Order> {
        let index = self.orders.iter().position(|order| order.id == id)?;
        self.rows.remove(id);
        Some(self.orders.remove(index))
    }

    #[must_use]
    pub fn row_state(&self, id: &str) -> RowState {
        self.rows.get(id).cloned().unwrap_or_default()
    }

    pub fn mark_pending(&mut self, id: &str) {
        self.rows.insert(id.to_string(), RowState::Pending);
    }

    pub fn mark_idle(&mut self, id: &str) {
        self.rows.remove(id);
    }

    pub fn mark_failed(&mut self, id: &str, error: String) {
        self.rows.insert(id.to_string(), RowState::Failed(error));
    }
}
