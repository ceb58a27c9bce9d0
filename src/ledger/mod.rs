//! Capacity Ledger module
//!
//! Occupancy bookkeeping for finite-capacity resources (hotel rooms and
//! activity sessions). The ledger is the only writer of occupancy.

mod capacity;
mod user_locks;

pub use capacity::{CapacityLedger, Reservation, ResourceKey, SlotClaim};
pub use user_locks::{UserLockGuard, UserLocks};
