//! Hotel Handler
//!
//! Hotel and room listings for users whose ticket includes lodging.
//! Occupancy figures come from the capacity ledger.

use std::sync::Arc;

use crate::domain::{DomainError, Hotel, HotelId, Room, UserId};
use crate::error::AppResult;
use crate::ledger::{CapacityLedger, ResourceKey};
use crate::state::AppState;
use crate::store::SharedStore;

use super::eligibility::TicketGate;
use super::{HotelWithRooms, RoomAvailability, RoomWithOccupancy};

pub struct HotelHandler {
    store: SharedStore,
    ledger: Arc<CapacityLedger>,
    gate: TicketGate,
}

impl HotelHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            ledger: Arc::clone(&state.ledger),
            gate: TicketGate::new(Arc::clone(&state.store)),
        }
    }

    async fn require_lodging(&self, user_id: UserId) -> AppResult<()> {
        self.gate.check_eligibility(user_id).await?.require_hotel()?;
        Ok(())
    }

    pub async fn list_hotels(&self, user_id: UserId) -> AppResult<Vec<Hotel>> {
        self.require_lodging(user_id).await?;
        Ok(self.store.list_hotels().await?)
    }

    pub async fn hotel_with_rooms(
        &self,
        user_id: UserId,
        hotel_id: HotelId,
    ) -> AppResult<HotelWithRooms> {
        self.require_lodging(user_id).await?;
        let (hotel, rooms) = self.load_hotel(hotel_id).await?;

        let rooms = rooms
            .into_iter()
            .map(|room| {
                let occupancy = self.occupancy(&room);
                RoomWithOccupancy { room, occupancy }
            })
            .collect();

        Ok(HotelWithRooms { hotel, rooms })
    }

    /// Capacity and free slots for every room of a hotel
    pub async fn room_availability(
        &self,
        user_id: UserId,
        hotel_id: HotelId,
    ) -> AppResult<Vec<RoomAvailability>> {
        self.require_lodging(user_id).await?;
        let (_, rooms) = self.load_hotel(hotel_id).await?;

        Ok(rooms
            .iter()
            .map(|room| RoomAvailability::new(room, self.occupancy(room)))
            .collect())
    }

    async fn load_hotel(&self, hotel_id: HotelId) -> AppResult<(Hotel, Vec<Room>)> {
        let hotel = self
            .store
            .find_hotel(hotel_id)
            .await?
            .ok_or(DomainError::HotelNotFound(hotel_id))?;
        let rooms = self.store.list_rooms_by_hotel(hotel_id).await?;
        Ok((hotel, rooms))
    }

    fn occupancy(&self, room: &Room) -> u32 {
        self.ledger.current_occupancy(ResourceKey::Room(room.id))
    }
}
