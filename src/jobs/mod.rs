//! Scheduled Jobs
//!
//! The capacity ledger lives in memory while bookings and activities live in
//! the store. These jobs load the ledger at startup and periodically repair
//! any drift between the two.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};

use crate::domain::UserId;
use crate::ledger::{CapacityLedger, ResourceKey, UserLocks};
use crate::state::AppState;
use crate::store::{SharedStore, StoreResult};

// =========================================================================
// Ledger Reconciliation
// =========================================================================

/// Report from one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub resources_checked: usize,
    /// Holders present in the store but missing from the ledger
    pub holders_added: usize,
    /// Holders in the ledger with no stored row behind them
    pub holders_removed: usize,
    pub completed_at: DateTime<Utc>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.holders_added == 0 && self.holders_removed == 0
    }
}

pub struct LedgerReconciler {
    store: SharedStore,
    ledger: Arc<CapacityLedger>,
    user_locks: Arc<UserLocks>,
}

impl LedgerReconciler {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            ledger: Arc::clone(&state.ledger),
            user_locks: Arc::clone(&state.user_locks),
        }
    }

    /// Replace the ledger contents with what the store holds.
    /// Only safe before requests are served.
    pub async fn hydrate(&self) -> StoreResult<usize> {
        let holders = self.stored_holders().await?;

        let entries: Vec<(ResourceKey, UserId)> = holders
            .iter()
            .flat_map(|(key, users)| users.iter().map(move |user| (*key, *user)))
            .collect();
        let loaded = entries.len();

        self.ledger.hydrate(entries);

        tracing::info!(
            resources = holders.len(),
            holders = loaded,
            "Capacity ledger hydrated"
        );
        Ok(loaded)
    }

    /// Compare the ledger with the store and fix every difference.
    ///
    /// Each suspect holder is rechecked under that user's lock, since every
    /// ledger change for a user happens while holding it. A reservation whose
    /// row is still being written is therefore never mistaken for drift.
    pub async fn run_once(&self) -> StoreResult<ReconcileReport> {
        let stored = self.stored_holders().await?;

        let mut keys: HashSet<ResourceKey> = stored.keys().copied().collect();
        keys.extend(self.ledger.resources());

        let mut report = ReconcileReport {
            resources_checked: keys.len(),
            ..Default::default()
        };

        for key in keys {
            let expected = stored.get(&key).cloned().unwrap_or_default();
            let actual: HashSet<UserId> = self.ledger.holders_of(key).into_iter().collect();

            for user_id in expected.symmetric_difference(&actual) {
                let _guard = self.user_locks.acquire(*user_id).await;

                let in_store = self.holds_in_store(key, *user_id).await?;
                let in_ledger = self.ledger.is_held_by(key, *user_id);

                if in_store && !in_ledger {
                    self.ledger.restore(key, *user_id);
                    report.holders_added += 1;
                    tracing::warn!(
                        resource = %key,
                        user_id = %user_id,
                        "Ledger drift: holder restored"
                    );
                } else if !in_store && in_ledger {
                    self.ledger.release(key, *user_id);
                    report.holders_removed += 1;
                    tracing::warn!(
                        resource = %key,
                        user_id = %user_id,
                        "Ledger drift: holder released"
                    );
                }
            }
        }

        report.completed_at = Utc::now();

        if report.is_clean() {
            tracing::debug!(resources = report.resources_checked, "Capacity ledger in sync");
        } else {
            tracing::warn!(
                resources = report.resources_checked,
                added = report.holders_added,
                removed = report.holders_removed,
                "Capacity ledger repaired"
            );
        }

        Ok(report)
    }

    /// Run [`LedgerReconciler::run_once`] every `every` in the background.
    /// Returns a handle that can be used to abort the loop.
    pub fn start(self, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = every.as_secs(), "Ledger reconciler started");

            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; hydration already covered it
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Ledger reconciliation failed");
                }
            }
        })
    }

    async fn stored_holders(&self) -> StoreResult<HashMap<ResourceKey, HashSet<UserId>>> {
        let mut holders: HashMap<ResourceKey, HashSet<UserId>> = HashMap::new();

        for (room_id, user_id) in self.store.room_holders().await? {
            holders
                .entry(ResourceKey::Room(room_id))
                .or_default()
                .insert(user_id);
        }

        for (activity_type_id, user_id) in self.store.activity_holders().await? {
            holders
                .entry(ResourceKey::ActivityType(activity_type_id))
                .or_default()
                .insert(user_id);
        }

        Ok(holders)
    }

    async fn holds_in_store(&self, key: ResourceKey, user_id: UserId) -> StoreResult<bool> {
        match key {
            ResourceKey::Room(room_id) => Ok(self
                .store
                .find_booking_by_user(user_id)
                .await?
                .is_some_and(|b| b.is_for_room(room_id))),
            ResourceKey::ActivityType(activity_type_id) => {
                let Some(enrollment) = self.store.find_enrollment_by_user(user_id).await? else {
                    return Ok(false);
                };
                let held = self
                    .store
                    .list_activities_by_enrollment(enrollment.id)
                    .await?
                    .iter()
                    .any(|(a, _)| a.activity_type_id == activity_type_id);
                Ok(held)
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
