//! Store module
//!
//! Logical read/write access to enrollments, tickets, lodging and activities.
//! Durability is the store's job; capacity correctness is the ledger's.

mod error;
mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::domain::{
    Activity, ActivityId, ActivityType, ActivityTypeId, Booking, BookingId, Enrollment,
    EnrollmentId, Hotel, HotelId, Payment, Room, RoomId, Ticket, TicketId, TicketType,
    TicketTypeId, UserId,
};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle used by handlers
pub type SharedStore = Arc<dyn Store>;

/// Session tokens are stored only as their SHA-256 hex digest
pub fn session_token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Card details kept with a payment
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub value: Decimal,
    pub card_issuer: String,
    pub card_last_digits: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Resolve a session token hash to its user
    async fn find_session_user(&self, token_hash: &str) -> StoreResult<Option<UserId>>;

    async fn find_enrollment_by_user(&self, user_id: UserId) -> StoreResult<Option<Enrollment>>;

    /// The enrollment's ticket together with its type
    async fn find_ticket_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Option<(Ticket, TicketType)>>;

    /// Ticket types ordered by id
    async fn list_ticket_types(&self) -> StoreResult<Vec<TicketType>>;

    async fn find_ticket_type(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> StoreResult<Option<TicketType>>;

    /// Create a RESERVED ticket. Fails with `UniqueViolation` if the
    /// enrollment already has one.
    async fn insert_ticket(
        &self,
        enrollment_id: EnrollmentId,
        ticket_type_id: TicketTypeId,
    ) -> StoreResult<Ticket>;

    /// Record a confirmed payment and flip the ticket to PAID in one step
    async fn record_payment(
        &self,
        ticket_id: TicketId,
        details: PaymentDetails,
    ) -> StoreResult<Payment>;

    /// Hotels ordered by id
    async fn list_hotels(&self) -> StoreResult<Vec<Hotel>>;

    async fn find_hotel(&self, hotel_id: HotelId) -> StoreResult<Option<Hotel>>;

    /// Rooms of a hotel ordered by id
    async fn list_rooms_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Room>>;

    async fn find_room(&self, room_id: RoomId) -> StoreResult<Option<Room>>;

    async fn find_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>>;

    async fn find_booking_by_user(&self, user_id: UserId) -> StoreResult<Option<Booking>>;

    /// Create the user's booking, or move the existing one to `room_id`.
    /// A user never ends up with two booking rows.
    async fn save_booking(&self, user_id: UserId, room_id: RoomId) -> StoreResult<Booking>;

    /// Activity types ordered by date, then id
    async fn list_activity_types(&self) -> StoreResult<Vec<ActivityType>>;

    async fn find_activity_type(
        &self,
        activity_type_id: ActivityTypeId,
    ) -> StoreResult<Option<ActivityType>>;

    /// An enrollment's activities with their types
    async fn list_activities_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Vec<(Activity, ActivityType)>>;

    /// Fails with `UniqueViolation` if the enrollment already holds the type
    async fn insert_activity(
        &self,
        enrollment_id: EnrollmentId,
        activity_type_id: ActivityTypeId,
    ) -> StoreResult<Activity>;

    async fn find_activity(&self, activity_id: ActivityId) -> StoreResult<Option<Activity>>;

    /// Returns false when the row was already gone
    async fn delete_activity(&self, activity_id: ActivityId) -> StoreResult<bool>;

    /// Every (room, user) pair with a live booking
    async fn room_holders(&self) -> StoreResult<Vec<(RoomId, UserId)>>;

    /// Every (activity type, user) pair with a live activity
    async fn activity_holders(&self) -> StoreResult<Vec<(ActivityTypeId, UserId)>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_hash_is_stable_hex() {
        let hash = session_token_hash("token-123");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, session_token_hash("token-123"));
        assert_ne!(hash, session_token_hash("token-124"));
    }
}
