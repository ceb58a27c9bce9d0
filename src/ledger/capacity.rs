//! Capacity Ledger
//!
//! Tracks who currently holds a slot on each resource. Every resource has its
//! own lock, so the check-capacity-then-insert step in [`CapacityLedger::try_reserve`]
//! is atomic per resource while unrelated resources never contend.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::{ActivityTypeId, RoomId, UserId};

/// A finite-capacity resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Room(RoomId),
    ActivityType(ActivityTypeId),
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Room(id) => write!(f, "room:{}", id),
            ResourceKey::ActivityType(id) => write!(f, "activity_type:{}", id),
        }
    }
}

/// Outcome of a reservation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// A new slot was taken
    Reserved,
    /// The holder already had a slot; nothing changed
    AlreadyHeld,
    /// No slot left
    Full,
}

impl Reservation {
    pub fn is_granted(&self) -> bool {
        !matches!(self, Reservation::Full)
    }
}

type Holders = Arc<Mutex<HashSet<UserId>>>;

/// In-process occupancy ledger
#[derive(Debug, Default)]
pub struct CapacityLedger {
    slots: DashMap<ResourceKey, Holders>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn holders(&self, key: ResourceKey) -> Holders {
        Arc::clone(&self.slots.entry(key).or_default())
    }

    /// Current number of holders, zero for unknown resources
    pub fn current_occupancy(&self, key: ResourceKey) -> u32 {
        let holders = match self.slots.get(&key) {
            Some(entry) => Arc::clone(&entry),
            None => return 0,
        };
        let count = holders.lock().len();
        count as u32
    }

    pub fn is_held_by(&self, key: ResourceKey, holder: UserId) -> bool {
        let holders = match self.slots.get(&key) {
            Some(entry) => Arc::clone(&entry),
            None => return false,
        };
        let held = holders.lock().contains(&holder);
        held
    }

    /// Take a slot for `holder` if fewer than `capacity` are taken.
    ///
    /// Capacity is supplied by the caller; the ledger never infers it.
    pub fn try_reserve(&self, key: ResourceKey, holder: UserId, capacity: u32) -> Reservation {
        let holders = self.holders(key);
        let mut holders = holders.lock();

        if holders.contains(&holder) {
            return Reservation::AlreadyHeld;
        }

        if holders.len() as u32 >= capacity {
            tracing::debug!(resource = %key, capacity, "Reservation rejected: resource full");
            return Reservation::Full;
        }

        holders.insert(holder);
        tracing::debug!(
            resource = %key,
            holder = %holder,
            occupancy = holders.len(),
            capacity,
            "Slot reserved"
        );
        Reservation::Reserved
    }

    /// Like [`CapacityLedger::try_reserve`], but a newly taken slot is given
    /// back when the returned claim is dropped without
    /// [`SlotClaim::commit`]. `None` when the resource is full.
    pub fn claim(
        self: &Arc<Self>,
        key: ResourceKey,
        holder: UserId,
        capacity: u32,
    ) -> Option<SlotClaim> {
        let reservation = self.try_reserve(key, holder, capacity);
        if !reservation.is_granted() {
            return None;
        }

        Some(SlotClaim {
            ledger: Arc::clone(self),
            key,
            holder,
            pending: reservation == Reservation::Reserved,
        })
    }

    /// Give back `holder`'s slot. Returns false when there was nothing to release.
    pub fn release(&self, key: ResourceKey, holder: UserId) -> bool {
        let holders = match self.slots.get(&key) {
            Some(entry) => Arc::clone(&entry),
            None => return false,
        };
        let released = holders.lock().remove(&holder);

        if released {
            tracing::debug!(resource = %key, holder = %holder, "Slot released");
        }
        released
    }

    /// Record a holder known from persisted rows. Capacity is not checked.
    pub fn restore(&self, key: ResourceKey, holder: UserId) -> bool {
        let holders = self.holders(key);
        let added = holders.lock().insert(holder);
        added
    }

    /// Holders of one resource, sorted
    pub fn holders_of(&self, key: ResourceKey) -> Vec<UserId> {
        let holders = match self.slots.get(&key) {
            Some(entry) => Arc::clone(&entry),
            None => return Vec::new(),
        };
        let mut list: Vec<UserId> = holders.lock().iter().copied().collect();
        list.sort();
        list
    }

    /// Every resource the ledger has seen
    pub fn resources(&self) -> Vec<ResourceKey> {
        self.slots.iter().map(|entry| *entry.key()).collect()
    }

    /// Replace the holders of one resource with a recomputed set
    pub fn reset(&self, key: ResourceKey, holders: impl IntoIterator<Item = UserId>) {
        let slot = self.holders(key);
        let mut current = slot.lock();
        current.clear();
        current.extend(holders);
    }

    /// Load occupancy derived from persisted rows, discarding prior state
    pub fn hydrate(&self, entries: impl IntoIterator<Item = (ResourceKey, UserId)>) {
        let mut grouped: HashMap<ResourceKey, Vec<UserId>> = HashMap::new();
        for (key, holder) in entries {
            grouped.entry(key).or_default().push(holder);
        }

        for key in self.resources() {
            if !grouped.contains_key(&key) {
                self.reset(key, std::iter::empty());
            }
        }

        for (key, holders) in grouped {
            self.reset(key, holders);
        }
    }
}

/// A slot taken on behalf of a write that has not finished yet.
///
/// Dropping the claim before [`SlotClaim::commit`] releases the slot, which
/// covers both a failed store write and a request cancelled mid-write.
#[derive(Debug)]
#[must_use = "dropping a claim releases the slot"]
pub struct SlotClaim {
    ledger: Arc<CapacityLedger>,
    key: ResourceKey,
    holder: UserId,
    /// Only slots this claim took itself are released
    pending: bool,
}

impl SlotClaim {
    /// The write succeeded; the slot now belongs to its persisted row
    pub fn commit(mut self) {
        self.pending = false;
    }
}

impl Drop for SlotClaim {
    fn drop(&mut self) {
        if self.pending {
            self.ledger.release(self.key, self.holder);
            tracing::debug!(
                resource = %self.key,
                holder = %self.holder,
                "Uncommitted claim released"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    const ROOM: ResourceKey = ResourceKey::Room(RoomId(1));

    #[test]
    fn test_reserve_until_full() {
        let ledger = CapacityLedger::new();

        assert_eq!(ledger.try_reserve(ROOM, UserId(1), 2), Reservation::Reserved);
        assert_eq!(ledger.try_reserve(ROOM, UserId(2), 2), Reservation::Reserved);
        assert_eq!(ledger.try_reserve(ROOM, UserId(3), 2), Reservation::Full);
        assert_eq!(ledger.current_occupancy(ROOM), 2);
    }

    #[test]
    fn test_same_holder_does_not_consume_twice() {
        let ledger = CapacityLedger::new();

        assert_eq!(ledger.try_reserve(ROOM, UserId(1), 3), Reservation::Reserved);
        assert_eq!(ledger.try_reserve(ROOM, UserId(1), 3), Reservation::AlreadyHeld);
        assert_eq!(ledger.current_occupancy(ROOM), 1);
    }

    #[test]
    fn test_holder_already_present_is_granted_even_when_full() {
        let ledger = CapacityLedger::new();
        ledger.try_reserve(ROOM, UserId(1), 1);

        let result = ledger.try_reserve(ROOM, UserId(1), 1);
        assert!(result.is_granted());
        assert!(!ledger.try_reserve(ROOM, UserId(2), 1).is_granted());
    }

    #[test]
    fn test_dropped_claim_gives_slot_back() {
        let ledger = Arc::new(CapacityLedger::new());

        let claim = ledger.claim(ROOM, UserId(1), 1);
        assert!(claim.is_some());
        assert!(ledger.claim(ROOM, UserId(2), 1).is_none());

        drop(claim);
        assert_eq!(ledger.current_occupancy(ROOM), 0);
        assert!(ledger.claim(ROOM, UserId(2), 1).is_some());
    }

    #[test]
    fn test_committed_claim_keeps_slot() {
        let ledger = Arc::new(CapacityLedger::new());

        if let Some(claim) = ledger.claim(ROOM, UserId(1), 1) {
            claim.commit();
        }

        assert!(ledger.is_held_by(ROOM, UserId(1)));
        assert_eq!(ledger.current_occupancy(ROOM), 1);
    }

    #[test]
    fn test_claim_on_held_slot_never_releases_it() {
        let ledger = Arc::new(CapacityLedger::new());
        ledger.try_reserve(ROOM, UserId(1), 1);

        let again = ledger.claim(ROOM, UserId(1), 1);
        assert!(again.is_some());
        drop(again);

        assert!(ledger.is_held_by(ROOM, UserId(1)));
    }

    #[test]
    fn test_release_is_idempotent() {
        let ledger = CapacityLedger::new();
        ledger.try_reserve(ROOM, UserId(1), 3);

        assert!(ledger.release(ROOM, UserId(1)));
        assert!(!ledger.release(ROOM, UserId(1)));
        assert_eq!(ledger.current_occupancy(ROOM), 0);
    }

    #[test]
    fn test_release_unknown_resource_is_noop() {
        let ledger = CapacityLedger::new();
        assert!(!ledger.release(ResourceKey::ActivityType(ActivityTypeId(9)), UserId(1)));
        assert_eq!(ledger.current_occupancy(ResourceKey::ActivityType(ActivityTypeId(9))), 0);
    }

    #[test]
    fn test_zero_capacity_is_always_full() {
        let ledger = CapacityLedger::new();
        assert_eq!(ledger.try_reserve(ROOM, UserId(1), 0), Reservation::Full);
    }

    #[test]
    fn test_resources_are_independent() {
        let ledger = CapacityLedger::new();
        let other = ResourceKey::Room(RoomId(2));

        ledger.try_reserve(ROOM, UserId(1), 1);
        assert_eq!(ledger.try_reserve(other, UserId(2), 1), Reservation::Reserved);
        assert_eq!(ledger.current_occupancy(ROOM), 1);
        assert_eq!(ledger.current_occupancy(other), 1);
    }

    #[test]
    fn test_hydrate_replaces_state() {
        let ledger = CapacityLedger::new();
        let activity = ResourceKey::ActivityType(ActivityTypeId(4));
        ledger.try_reserve(activity, UserId(99), 10);

        ledger.hydrate(vec![
            (ROOM, UserId(1)),
            (ROOM, UserId(2)),
            (ResourceKey::Room(RoomId(2)), UserId(3)),
        ]);

        assert_eq!(ledger.current_occupancy(ROOM), 2);
        assert_eq!(ledger.current_occupancy(ResourceKey::Room(RoomId(2))), 1);
        assert_eq!(ledger.current_occupancy(activity), 0);
        assert_eq!(ledger.holders_of(ROOM), vec![UserId(1), UserId(2)]);
    }

    #[test]
    fn test_restore_ignores_capacity() {
        let ledger = CapacityLedger::new();
        ledger.try_reserve(ROOM, UserId(1), 1);

        assert!(ledger.restore(ROOM, UserId(2)));
        assert!(!ledger.restore(ROOM, UserId(2)));
        assert_eq!(ledger.current_occupancy(ROOM), 2);
    }

    #[test]
    fn test_concurrent_reservations_for_last_slot() {
        const CONTENDERS: i32 = 16;
        let ledger = Arc::new(CapacityLedger::new());

        // Capacity 3 with 2 already taken leaves exactly one slot.
        ledger.try_reserve(ROOM, UserId(1000), 3);
        ledger.try_reserve(ROOM, UserId(1001), 3);

        let barrier = Arc::new(Barrier::new(CONTENDERS as usize));
        let handles: Vec<_> = (0..CONTENDERS)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    ledger.try_reserve(ROOM, UserId(i), 3)
                })
            })
            .collect();

        let results: Vec<Reservation> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let granted = results.iter().filter(|r| **r == Reservation::Reserved).count();
        let full = results.iter().filter(|r| **r == Reservation::Full).count();

        assert_eq!(granted, 1);
        assert_eq!(full, CONTENDERS as usize - 1);
        assert_eq!(ledger.current_occupancy(ROOM), 3);
    }
}
