//! Shared application state
//!
//! One store, one capacity ledger and one set of per-user locks per process.
//! Every handler is built from a clone of this.

use std::sync::Arc;

use crate::ledger::{CapacityLedger, UserLocks};
use crate::store::{SharedStore, StoreResult};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub ledger: Arc<CapacityLedger>,
    pub user_locks: Arc<UserLocks>,
}

impl AppState {
    /// State with an empty ledger. Call [`AppState::bootstrap`] instead unless
    /// the store is known to hold no bookings or activities.
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            ledger: Arc::new(CapacityLedger::new()),
            user_locks: Arc::new(UserLocks::new()),
        }
    }

    /// State whose ledger already reflects every stored booking and activity
    pub async fn bootstrap(store: SharedStore) -> StoreResult<Self> {
        let state = Self::new(store);
        crate::jobs::LedgerReconciler::new(&state).hydrate().await?;
        Ok(state)
    }
}
