//! Per-user serialization
//!
//! Booking and enrollment changes for one user run one at a time, so two
//! concurrent requests from the same user cannot both pass the "no existing
//! booking" check and leave the user holding two rooms.
//!
//! A user's mutex only lives while someone holds or waits for it, so the map
//! is bounded by the number of users with a request in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::UserId;

#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s allocations
    pub async fn acquire(&self, user_id: UserId) -> UserLockGuard<'_> {
        let lock = Arc::clone(&self.locks.entry(user_id).or_default());
        let guard = lock.lock_owned().await;

        UserLockGuard {
            locks: self,
            user_id,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one user's allocations, released on drop
#[derive(Debug)]
pub struct UserLockGuard<'a> {
    locks: &'a UserLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so our own reference no longer counts
        self.guard.take();

        // `remove_if` holds the shard lock, which `acquire` also needs to
        // clone the mutex, so nobody can pick it up between check and removal.
        self.locks
            .locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.acquire(UserId(1)).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(UserId(1)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _first = locks.acquire(UserId(1)).await;
        let _second = locks.acquire(UserId(2)).await;
    }

    #[tokio::test]
    async fn test_idle_users_are_pruned() {
        let locks = UserLocks::new();

        for id in 0..50 {
            let _guard = locks.acquire(UserId(id)).await;
        }

        assert_eq!(locks.tracked_users(), 0);
    }

    #[tokio::test]
    async fn test_lock_survives_while_contended() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.acquire(UserId(7)).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(UserId(7)).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The waiter still references the mutex, so it must not be pruned
        drop(guard);
        assert_eq!(locks.tracked_users(), 1);

        contender.await.unwrap();
        assert_eq!(locks.tracked_users(), 0);
    }
}
