//! Coordinates the remote store with the local board.
//!
//! Mutations are confirmed by the store before they touch the board. The board
//! lock is never held across a remote call. Once the desk is closed, calls
//! still in flight are abandoned and their results are never merged.

use super::{
    board::{LoadState, OrderBoard},
    store::DynOrderStore,
    Order, Status,
};
use crate::sanity::StoreError;
use std::future::Future;
use tokio::sync::{watch, RwLock, RwLockReadGuard};
use tracing::{error, info, instrument, warn};

/// Whether the operator explicitly confirmed a destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Unconfirmed
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Nothing was sent to the store.
    NeedsConfirmation,
    /// The store deleted the document; carries the local entry if there was one.
    Deleted(Option<Order>),
}

pub struct OrderDesk {
    store: DynOrderStore,
    board: RwLock<OrderBoard>,
    lifetime: watch::Sender<bool>,
}

impl OrderDesk {
    #[must_use]
    pub fn new(store: DynOrderStore) -> Self {
        let (lifetime, _) = watch::channel(false);
        Self {
            store,
            board: RwLock::new(OrderBoard::new()),
            lifetime,
        }
    }

    pub async fn board(&self) -> RwLockReadGuard<'_, OrderBoard> {
        self.board.read().await
    }

    /// Fetch every order. Failures are logged and recorded on the board; the
    /// list stays as it was (empty on first load). There is no retry.
    #[instrument(skip(self))]
    pub async fn load(&self) -> LoadState {
        match self.until_closed(self.store.fetch_orders()).await {
            Ok(orders) => {
                info!("loaded {} orders", orders.len());
                let mut board = self.board.write().await;
                board.replace(orders);
                board.load_state().clone()
            }
            Err(StoreError::Cancelled) => {
                warn!("order load abandoned, desk closed");
                self.board.read().await.load_state().clone()
            }
            Err(e) => {
                error!("error fetching orders: {}", e);
                let mut board = self.board.write().await;
                board.fail_load(e.to_string());
                board.load_state().clone()
            }
        }
    }

    /// Patch the status remotely, then mirror it locally.
    ///
    /// Returns the updated local entry, or `None` if the order is not on the board.
    ///
    /// # Errors
    /// Returns the store error; the board entry is left untouched.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: &str,
        status: Status,
    ) -> Result<Option<Order>, StoreError> {
        self.board.write().await.mark_pending(id);

        let result = self
            .until_closed(self.store.set_status(id, status))
            .await;

        if self.is_closed() {
            self.board.write().await.mark_idle(id);
            return Err(StoreError::Cancelled);
        }

        let mut board = self.board.write().await;
        match result {
            Ok(()) => {
                board.mark_idle(id);
                Ok(board.set_status(id, status).cloned())
            }
            Err(e) => {
                error!("error updating order status: {}", e);
                board.mark_failed(id, e.to_string());
                Err(e)
            }
        }
    }

    /// Delete remotely, then drop the local entry. Without confirmation
    /// nothing is sent.
    ///
    /// # Errors
    /// Returns the store error; the board entry is left in place.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, StoreError> {
        if confirmation == Confirmation::Unconfirmed {
            return Ok(DeleteOutcome::NeedsConfirmation);
        }

        self.board.write().await.mark_pending(id);

        let result = self.until_closed(self.store.delete_order(id)).await;

        if self.is_closed() {
            self.board.write().await.mark_idle(id);
            return Err(StoreError::Cancelled);
        }

        let mut board = self.board.write().await;
        match result {
            Ok(()) => Ok(DeleteOutcome::Deleted(board.remove(id))),
            Err(e) => {
                error!("error deleting order: {}", e);
                board.mark_failed(id, e.to_string());
                Err(e)
            }
        }
    }

    /// End the desk's lifetime; pending and future remote calls are cancelled.
    pub fn close(&self) {
        self.lifetime.send_replace(true);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.lifetime.borrow()
    }

    async fn until_closed<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let mut closed = self.lifetime.subscribe();
        if *closed.borrow_and_update() {
            return Err(StoreError::Cancelled);
        }

        tokio::select! {
            result = call => result,
            _ = closed.wait_for(|closed| *closed) => Err(StoreError::Cancelled),
        }
    }
}

impl std::fmt::Debug for OrderDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderDesk")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
