//! Booking Handler
//!
//! Grants hotel rooms. A user holds at most one booking; booking another room
//! moves it, booking the same room again is a no-op.

use std::sync::Arc;

use crate::domain::{BookingId, ConflictReason, DomainError, ForbiddenReason, RoomId, UserId};
use crate::error::AppResult;
use crate::ledger::{CapacityLedger, ResourceKey, UserLocks};
use crate::state::AppState;
use crate::store::SharedStore;

use super::eligibility::TicketGate;
use super::{BookingOutcome, BookingStatus, BookingView};

/// Handler for room bookings
pub struct BookingHandler {
    store: SharedStore,
    ledger: Arc<CapacityLedger>,
    user_locks: Arc<UserLocks>,
    gate: TicketGate,
}

impl BookingHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            ledger: Arc::clone(&state.ledger),
            user_locks: Arc::clone(&state.user_locks),
            gate: TicketGate::new(Arc::clone(&state.store)),
        }
    }

    /// Book `room_id` for `user_id`, moving any existing booking
    pub async fn book(&self, user_id: UserId, room_id: RoomId) -> AppResult<BookingOutcome> {
        let eligibility = self.gate.check_eligibility(user_id).await?;
        eligibility.require_hotel()?;

        let room = self
            .store
            .find_room(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound(room_id))?;

        let _guard = self.user_locks.acquire(user_id).await;

        let current = self.store.find_booking_by_user(user_id).await?;
        if let Some(existing) = current.as_ref().filter(|b| b.is_for_room(room_id)) {
            tracing::debug!(user_id = %user_id, room_id = %room_id, "Room already booked by user");
            return Ok(BookingOutcome::new(existing.clone(), BookingStatus::Unchanged));
        }

        let Some(claim) = self
            .ledger
            .claim(ResourceKey::Room(room_id), user_id, room.capacity)
        else {
            tracing::warn!(
                user_id = %user_id,
                room_id = %room_id,
                capacity = room.capacity,
                "Room is full"
            );
            return Err(DomainError::Conflict(ConflictReason::RoomFull).into());
        };

        // An error or a dropped request leaves the claim uncommitted
        let booking = self.store.save_booking(user_id, room_id).await?;
        claim.commit();

        let status = match current {
            Some(previous) => {
                self.ledger.release(ResourceKey::Room(previous.room_id), user_id);
                tracing::info!(
                    user_id = %user_id,
                    booking_id = %booking.id,
                    from_room_id = %previous.room_id,
                    room_id = %room_id,
                    "Booking moved"
                );
                BookingStatus::Moved
            }
            None => {
                tracing::info!(
                    user_id = %user_id,
                    booking_id = %booking.id,
                    room_id = %room_id,
                    "Booking created"
                );
                BookingStatus::Created
            }
        };

        Ok(BookingOutcome::new(booking, status))
    }

    /// The user's booking and its room
    pub async fn find_for_user(&self, user_id: UserId) -> AppResult<BookingView> {
        let booking = self
            .store
            .find_booking_by_user(user_id)
            .await?
            .ok_or(DomainError::NoBookingForUser(user_id))?;

        let room = self
            .store
            .find_room(booking.room_id)
            .await?
            .ok_or(DomainError::RoomNotFound(booking.room_id))?;

        Ok(BookingView {
            id: booking.id,
            room,
        })
    }

    /// Move an existing booking, which must belong to `user_id`
    pub async fn change(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        room_id: RoomId,
    ) -> AppResult<BookingOutcome> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(DomainError::BookingNotFound(booking_id))?;

        if booking.user_id != user_id {
            tracing::warn!(
                user_id = %user_id,
                booking_id = %booking_id,
                "Booking change refused: not the owner"
            );
            return Err(DomainError::Forbidden(ForbiddenReason::NotBookingOwner).into());
        }

        self.book(user_id, room_id).await
    }
}
