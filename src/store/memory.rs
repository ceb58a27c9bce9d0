//! In-memory store
//!
//! Thread-safe implementation of [`Store`] backed by plain vectors. Used by the
//! test suites and for running the API without PostgreSQL. The `create_*`
//! methods seed rows directly, bypassing the allocation rules, the same way
//! database fixtures would.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::{
    activity, Activity, ActivityId, ActivityType, ActivityTypeId, Booking, BookingId, Enrollment,
    EnrollmentId, Hotel, HotelId, Payment, PaymentId, Room, RoomId, Ticket, TicketId,
    TicketStatus, TicketType, TicketTypeId, UserId,
};

use super::{session_token_hash, PaymentDetails, Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    sequence: i32,
    sessions: HashMap<String, UserId>,
    enrollments: Vec<Enrollment>,
    ticket_types: Vec<TicketType>,
    tickets: Vec<Ticket>,
    payments: Vec<Payment>,
    hotels: Vec<Hotel>,
    rooms: Vec<Room>,
    bookings: Vec<Booking>,
    activity_types: Vec<ActivityType>,
    activities: Vec<Activity>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }

    fn user_of_enrollment(&self, enrollment_id: EnrollmentId) -> Option<UserId> {
        self.enrollments
            .iter()
            .find(|e| e.id == enrollment_id)
            .map(|e| e.user_id)
    }
}

/// In-memory [`Store`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub fn create_user(&self) -> UserId {
        UserId(self.tables.write().next_id())
    }

    /// Register a session; `token` is what clients send as bearer token
    pub fn create_session(&self, user_id: UserId, token: &str) {
        self.tables
            .write()
            .sessions
            .insert(session_token_hash(token), user_id);
    }

    pub fn create_enrollment(&self, user_id: UserId) -> Enrollment {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let enrollment = Enrollment {
            id: EnrollmentId(tables.next_id()),
            user_id,
            name: format!("Attendee {}", user_id),
            created_at: now,
            updated_at: now,
        };
        tables.enrollments.push(enrollment.clone());
        enrollment
    }

    pub fn create_ticket_type(
        &self,
        name: &str,
        price: Decimal,
        is_remote: bool,
        includes_hotel: bool,
    ) -> TicketType {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let ticket_type = TicketType {
            id: TicketTypeId(tables.next_id()),
            name: name.to_string(),
            price,
            is_remote,
            includes_hotel,
            created_at: now,
            updated_at: now,
        };
        tables.ticket_types.push(ticket_type.clone());
        ticket_type
    }

    pub fn create_ticket(
        &self,
        enrollment_id: EnrollmentId,
        ticket_type_id: TicketTypeId,
        status: TicketStatus,
    ) -> Ticket {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let ticket = Ticket {
            id: TicketId(tables.next_id()),
            enrollment_id,
            ticket_type_id,
            status,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.push(ticket.clone());
        ticket
    }

    pub fn create_hotel(&self, name: &str) -> Hotel {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let hotel = Hotel {
            id: HotelId(tables.next_id()),
            name: name.to_string(),
            image: format!(
                "https://images.example.com/{}.jpg",
                name.to_lowercase().replace(' ', "-")
            ),
            created_at: now,
            updated_at: now,
        };
        tables.hotels.push(hotel.clone());
        hotel
    }

    pub fn create_room(&self, hotel_id: HotelId, capacity: u32) -> Room {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let id = RoomId(tables.next_id());
        let room = Room {
            id,
            name: format!("{}", 100 + id.value()),
            capacity,
            hotel_id,
            created_at: now,
            updated_at: now,
        };
        tables.rooms.push(room.clone());
        room
    }

    /// Insert a booking row as-is, without capacity checks
    pub fn create_booking(&self, user_id: UserId, room_id: RoomId) -> Booking {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let booking = Booking {
            id: BookingId(tables.next_id()),
            user_id,
            room_id,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.push(booking.clone());
        booking
    }

    pub fn create_activity_type(
        &self,
        name: &str,
        schedules: &str,
        capacity: u32,
        activity_date: NaiveDate,
    ) -> ActivityType {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let activity_type = ActivityType {
            id: ActivityTypeId(tables.next_id()),
            name: name.to_string(),
            schedules: schedules.to_string(),
            capacity,
            activity_date,
            place: "Auditório Principal".to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.activity_types.push(activity_type.clone());
        activity_type
    }

    /// Insert an activity row as-is, without capacity checks
    pub fn create_activity(
        &self,
        enrollment_id: EnrollmentId,
        activity_type_id: ActivityTypeId,
    ) -> Activity {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let activity = Activity {
            id: ActivityId(tables.next_id()),
            activity_type_id,
            enrollment_id,
            created_at: now,
            updated_at: now,
        };
        tables.activities.push(activity.clone());
        activity
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn booking_count_for_user(&self, user_id: UserId) -> usize {
        self.tables
            .read()
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .count()
    }

    pub fn bookings_in_room(&self, room_id: RoomId) -> usize {
        self.tables
            .read()
            .bookings
            .iter()
            .filter(|b| b.room_id == room_id)
            .count()
    }

    pub fn activities_of_type(&self, activity_type_id: ActivityTypeId) -> usize {
        self.tables
            .read()
            .activities
            .iter()
            .filter(|a| a.activity_type_id == activity_type_id)
            .count()
    }

    pub fn ticket(&self, ticket_id: TicketId) -> Option<Ticket> {
        self.tables
            .read()
            .tickets
            .iter()
            .find(|t| t.id == ticket_id)
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_session_user(&self, token_hash: &str) -> StoreResult<Option<UserId>> {
        Ok(self.tables.read().sessions.get(token_hash).copied())
    }

    async fn find_enrollment_by_user(&self, user_id: UserId) -> StoreResult<Option<Enrollment>> {
        Ok(self
            .tables
            .read()
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id)
            .cloned())
    }

    async fn find_ticket_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Option<(Ticket, TicketType)>> {
        let tables = self.tables.read();
        let Some(ticket) = tables.tickets.iter().find(|t| t.enrollment_id == enrollment_id) else {
            return Ok(None);
        };

        let ticket_type = tables
            .ticket_types
            .iter()
            .find(|tt| tt.id == ticket.ticket_type_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::Decode(format!(
                    "ticket {} references missing ticket type {}",
                    ticket.id, ticket.ticket_type_id
                ))
            })?;

        Ok(Some((ticket.clone(), ticket_type)))
    }

    async fn list_ticket_types(&self) -> StoreResult<Vec<TicketType>> {
        let mut types = self.tables.read().ticket_types.clone();
        types.sort_by_key(|t| t.id);
        Ok(types)
    }

    async fn find_ticket_type(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> StoreResult<Option<TicketType>> {
        Ok(self
            .tables
            .read()
            .ticket_types
            .iter()
            .find(|t| t.id == ticket_type_id)
            .cloned())
    }

    async fn insert_ticket(
        &self,
        enrollment_id: EnrollmentId,
        ticket_type_id: TicketTypeId,
    ) -> StoreResult<Ticket> {
        let mut tables = self.tables.write();

        if !tables.ticket_types.iter().any(|t| t.id == ticket_type_id) {
            return Err(StoreError::NotFound(format!("ticket type {}", ticket_type_id)));
        }
        if tables.tickets.iter().any(|t| t.enrollment_id == enrollment_id) {
            return Err(StoreError::UniqueViolation("tickets_enrollment_id_key".to_string()));
        }

        let now = Utc::now();
        let ticket = Ticket {
            id: TicketId(tables.next_id()),
            enrollment_id,
            ticket_type_id,
            status: TicketStatus::Reserved,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn record_payment(
        &self,
        ticket_id: TicketId,
        details: PaymentDetails,
    ) -> StoreResult<Payment> {
        let mut tables = self.tables.write();
        let now = Utc::now();

        let index = tables
            .tickets
            .iter()
            .position(|t| t.id == ticket_id)
            .ok_or_else(|| StoreError::NotFound(format!("ticket {}", ticket_id)))?;

        let paid = tables.tickets[index].clone().confirm_payment(now)?;
        tables.tickets[index] = paid;

        let payment = Payment {
            id: PaymentId(tables.next_id()),
            ticket_id,
            value: details.value,
            card_issuer: details.card_issuer,
            card_last_digits: details.card_last_digits,
            created_at: now,
        };
        tables.payments.push(payment.clone());
        Ok(payment)
    }

    async fn list_hotels(&self) -> StoreResult<Vec<Hotel>> {
        let mut hotels = self.tables.read().hotels.clone();
        hotels.sort_by_key(|h| h.id);
        Ok(hotels)
    }

    async fn find_hotel(&self, hotel_id: HotelId) -> StoreResult<Option<Hotel>> {
        Ok(self
            .tables
            .read()
            .hotels
            .iter()
            .find(|h| h.id == hotel_id)
            .cloned())
    }

    async fn list_rooms_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Room>> {
        let mut rooms: Vec<Room> = self
            .tables
            .read()
            .rooms
            .iter()
            .filter(|r| r.hotel_id == hotel_id)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.id);
        Ok(rooms)
    }

    async fn find_room(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        Ok(self
            .tables
            .read()
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .cloned())
    }

    async fn find_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        Ok(self
            .tables
            .read()
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned())
    }

    async fn find_booking_by_user(&self, user_id: UserId) -> StoreResult<Option<Booking>> {
        Ok(self
            .tables
            .read()
            .bookings
            .iter()
            .find(|b| b.user_id == user_id)
            .cloned())
    }

    async fn save_booking(&self, user_id: UserId, room_id: RoomId) -> StoreResult<Booking> {
        let mut tables = self.tables.write();
        let now = Utc::now();

        if !tables.rooms.iter().any(|r| r.id == room_id) {
            return Err(StoreError::NotFound(format!("room {}", room_id)));
        }

        if let Some(existing) = tables.bookings.iter_mut().find(|b| b.user_id == user_id) {
            existing.room_id = room_id;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let booking = Booking {
            id: BookingId(tables.next_id()),
            user_id,
            room_id,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn list_activity_types(&self) -> StoreResult<Vec<ActivityType>> {
        let mut types = self.tables.read().activity_types.clone();
        types.sort_by(activity::listing_order);
        Ok(types)
    }

    async fn find_activity_type(
        &self,
        activity_type_id: ActivityTypeId,
    ) -> StoreResult<Option<ActivityType>> {
        Ok(self
            .tables
            .read()
            .activity_types
            .iter()
            .find(|t| t.id == activity_type_id)
            .cloned())
    }

    async fn list_activities_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Vec<(Activity, ActivityType)>> {
        let tables = self.tables.read();
        let rows: StoreResult<Vec<_>> = tables
            .activities
            .iter()
            .filter(|a| a.enrollment_id == enrollment_id)
            .map(|a| -> StoreResult<(Activity, ActivityType)> {
                let activity_type = tables
                    .activity_types
                    .iter()
                    .find(|t| t.id == a.activity_type_id)
                    .cloned()
                    .ok_or_else(|| {
                        StoreError::Decode(format!(
                            "activity {} references missing type {}",
                            a.id, a.activity_type_id
                        ))
                    })?;
                Ok((a.clone(), activity_type))
            })
            .collect();
        rows
    }

    async fn insert_activity(
        &self,
        enrollment_id: EnrollmentId,
        activity_type_id: ActivityTypeId,
    ) -> StoreResult<Activity> {
        let mut tables = self.tables.write();

        if !tables.activity_types.iter().any(|t| t.id == activity_type_id) {
            return Err(StoreError::NotFound(format!("activity type {}", activity_type_id)));
        }

        let duplicate = tables
            .activities
            .iter()
            .any(|a| a.enrollment_id == enrollment_id && a.activity_type_id == activity_type_id);
        if duplicate {
            return Err(StoreError::UniqueViolation(
                "activities_enrollment_id_activity_type_id_key".to_string(),
            ));
        }

        let now = Utc::now();
        let activity = Activity {
            id: ActivityId(tables.next_id()),
            activity_type_id,
            enrollment_id,
            created_at: now,
            updated_at: now,
        };
        tables.activities.push(activity.clone());
        Ok(activity)
    }

    async fn find_activity(&self, activity_id: ActivityId) -> StoreResult<Option<Activity>> {
        Ok(self
            .tables
            .read()
            .activities
            .iter()
            .find(|a| a.id == activity_id)
            .cloned())
    }

    async fn delete_activity(&self, activity_id: ActivityId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let before = tables.activities.len();
        tables.activities.retain(|a| a.id != activity_id);
        Ok(tables.activities.len() < before)
    }

    async fn room_holders(&self) -> StoreResult<Vec<(RoomId, UserId)>> {
        Ok(self
            .tables
            .read()
            .bookings
            .iter()
            .map(|b| (b.room_id, b.user_id))
            .collect())
    }

    async fn activity_holders(&self) -> StoreResult<Vec<(ActivityTypeId, UserId)>> {
        let tables = self.tables.read();
        let holders = tables
            .activities
            .iter()
            .filter_map(|a| {
                tables
                    .user_of_enrollment(a.enrollment_id)
                    .map(|user_id| (a.activity_type_id, user_id))
            })
            .collect();
        Ok(holders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_save_booking_moves_existing_row() {
        let store = MemoryStore::new();
        let user = store.create_user();
        let hotel = store.create_hotel("Driven Resort");
        let first = store.create_room(hotel.id, 3);
        let second = store.create_room(hotel.id, 3);

        let booking = store.save_booking(user, first.id).await.unwrap();
        let moved = store.save_booking(user, second.id).await.unwrap();

        assert_eq!(booking.id, moved.id);
        assert_eq!(moved.room_id, second.id);
        assert_eq!(store.booking_count_for_user(user), 1);
    }

    #[tokio::test]
    async fn test_save_booking_unknown_room() {
        let store = MemoryStore::new();
        let user = store.create_user();

        let result = store.save_booking(user, RoomId(404)).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_record_payment_flips_ticket() {
        let store = MemoryStore::new();
        let user = store.create_user();
        let enrollment = store.create_enrollment(user);
        let ticket_type = store.create_ticket_type("Presencial", dec!(250), false, true);
        let ticket = store.create_ticket(enrollment.id, ticket_type.id, TicketStatus::Reserved);

        let details = PaymentDetails {
            value: dec!(250),
            card_issuer: "VISA".to_string(),
            card_last_digits: "4242".to_string(),
        };
        store.record_payment(ticket.id, details.clone()).await.unwrap();
        assert_eq!(store.ticket(ticket.id).unwrap().status, TicketStatus::Paid);

        // A second payment is an illegal transition
        let again = store.record_payment(ticket.id, details).await;
        assert!(matches!(again, Err(StoreError::Domain(_))));
    }

    #[tokio::test]
    async fn test_insert_ticket_is_reserved_and_unique() {
        let store = MemoryStore::new();
        let user = store.create_user();
        let enrollment = store.create_enrollment(user);
        let ticket_type = store.create_ticket_type("Online", dec!(100), true, false);

        let ticket = store.insert_ticket(enrollment.id, ticket_type.id).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Reserved);

        let again = store.insert_ticket(enrollment.id, ticket_type.id).await;
        assert!(matches!(again, Err(ref e) if e.is_unique_violation()));

        let unknown = store.insert_ticket(enrollment.id, TicketTypeId(999)).await;
        assert!(matches!(unknown, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_activity_rejects_duplicate() {
        let store = MemoryStore::new();
        let user = store.create_user();
        let enrollment = store.create_enrollment(user);
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let activity_type = store.create_activity_type("Workshop", "09:00 - 10:00", 5, date);

        store.insert_activity(enrollment.id, activity_type.id).await.unwrap();
        let again = store.insert_activity(enrollment.id, activity_type.id).await;

        assert!(matches!(again, Err(ref e) if e.is_unique_violation()));
    }

    #[tokio::test]
    async fn test_activity_holders_resolve_users() {
        let store = MemoryStore::new();
        let user = store.create_user();
        let enrollment = store.create_enrollment(user);
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let activity_type = store.create_activity_type("Palestra", "14:00 - 15:00", 5, date);
        store.create_activity(enrollment.id, activity_type.id);

        let holders = store.activity_holders().await.unwrap();
        assert_eq!(holders, vec![(activity_type.id, user)]);
    }
}
