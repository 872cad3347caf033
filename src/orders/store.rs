use super::{decode_orders, Order, Status, ORDER_QUERY};
use crate::sanity::{SanityClient, StoreError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub type DynOrderStore = Arc<dyn OrderStore + Send + Sync>;

/// Remote operations the dashboard needs from the document store.
#[async_trait]
pub trait OrderStore {
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError>;
    async fn set_status(&self, id: &str, status: Status) -> Result<(), StoreError>;
    async fn delete_order(&self, id: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl OrderStore for SanityClient {
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError> {
        let documents: Vec<Value> = self.fetch(ORDER_QUERY).await?;
        Ok(decode_orders(documents))
    }

    async fn set_status(&self, id: &str, status: Status) -> Result<(), StoreError> {
        self.patch(id)
            .set(json!({ "status": status }))
            .commit()
            .await
            .map(|_| ())
    }

    async fn delete_order(&self, id: &str) -> Result<(), StoreError> {
        self.delete(id).await.map(|_| ())
    }
}
