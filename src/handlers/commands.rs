//! Command definitions
//!
//! Commands are the request bodies clients send; results are what the
//! handlers hand back for serialization.

use serde::{Deserialize, Serialize};

use crate::domain::{
    ActivityTypeId, Booking, BookingId, Hotel, Room, RoomId, Ticket, TicketId, TicketType,
    TicketTypeId,
};

// =========================================================================
// Booking
// =========================================================================

/// Command to book (or move to) a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRoomCommand {
    pub room_id: RoomId,
}

impl BookRoomCommand {
    pub fn new(room_id: RoomId) -> Self {
        Self { room_id }
    }
}

/// What a successful `book` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// First booking for the user
    Created,
    /// Existing booking moved to another room
    Moved,
    /// Already booked in the requested room
    Unchanged,
}

/// Result of a successful booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub status: BookingStatus,
}

impl BookingOutcome {
    pub fn new(booking: Booking, status: BookingStatus) -> Self {
        Self { booking, status }
    }

    pub fn booking_id(&self) -> BookingId {
        self.booking.id
    }
}

/// A user's booking together with the booked room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    pub id: BookingId,
    pub room: Room,
}

// =========================================================================
// Activities
// =========================================================================

/// Command to take a seat in an activity session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollActivityCommand {
    pub activity_type_id: ActivityTypeId,
}

impl EnrollActivityCommand {
    pub fn new(activity_type_id: ActivityTypeId) -> Self {
        Self { activity_type_id }
    }
}

// =========================================================================
// Tickets
// =========================================================================

/// Command to reserve a ticket of the given type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketCommand {
    pub ticket_type_id: TicketTypeId,
}

impl CreateTicketCommand {
    pub fn new(ticket_type_id: TicketTypeId) -> Self {
        Self { ticket_type_id }
    }
}

/// A ticket with its type nested under `TicketType`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketWithType {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(rename = "TicketType")]
    pub ticket_type: TicketType,
}

impl From<(Ticket, TicketType)> for TicketWithType {
    fn from((ticket, ticket_type): (Ticket, TicketType)) -> Self {
        Self {
            ticket,
            ticket_type,
        }
    }
}

// =========================================================================
// Payments
// =========================================================================

/// Confirmation of an externally processed card payment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentCommand {
    pub ticket_id: TicketId,
    pub card_issuer: String,
    pub card_last_digits: String,
}

impl RecordPaymentCommand {
    pub fn new(ticket_id: TicketId, card_issuer: String, card_last_digits: String) -> Self {
        Self {
            ticket_id,
            card_issuer,
            card_last_digits,
        }
    }

    /// Card issuer must be present and the last digits exactly four digits
    pub fn validate(&self) -> Result<(), String> {
        if self.card_issuer.trim().is_empty() {
            return Err("cardIssuer must not be empty".to_string());
        }

        let digits = &self.card_last_digits;
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err("cardLastDigits must be exactly 4 digits".to_string());
        }

        Ok(())
    }
}

// =========================================================================
// Hotels
// =========================================================================

/// A room and how many of its slots are taken
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomWithOccupancy {
    #[serde(flatten)]
    pub room: Room,
    pub occupancy: u32,
}

/// A hotel with its rooms, ordered by room id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelWithRooms {
    #[serde(flatten)]
    pub hotel: Hotel,
    #[serde(rename = "Rooms")]
    pub rooms: Vec<RoomWithOccupancy>,
}

/// Per-room availability summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailability {
    pub room_id: RoomId,
    pub capacity: u32,
    pub occupancy: u32,
    pub available: u32,
}

impl RoomAvailability {
    pub fn new(room: &Room, occupancy: u32) -> Self {
        Self {
            room_id: room.id,
            capacity: room.capacity,
            occupancy,
            available: room.capacity.saturating_sub(occupancy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::domain::HotelId;

    fn room(capacity: u32) -> Room {
        let now = Utc::now();
        Room {
            id: RoomId(7),
            name: "107".to_string(),
            capacity,
            hotel_id: HotelId(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_book_room_command_is_camel_case() {
        let cmd: BookRoomCommand = serde_json::from_str(r#"{"roomId": 12}"#).unwrap();
        assert_eq!(cmd.room_id, RoomId(12));

        assert!(serde_json::from_str::<BookRoomCommand>(r#"{"room_id": 12}"#).is_err());
    }

    #[test]
    fn test_enroll_command_is_camel_case() {
        let cmd: EnrollActivityCommand =
            serde_json::from_str(r#"{"activityTypeId": 3}"#).unwrap();
        assert_eq!(cmd.activity_type_id, ActivityTypeId(3));
    }

    #[test]
    fn test_create_ticket_command_is_camel_case() {
        let cmd: CreateTicketCommand = serde_json::from_str(r#"{"ticketTypeId": 4}"#).unwrap();
        assert_eq!(cmd.ticket_type_id, TicketTypeId(4));

        assert!(serde_json::from_str::<CreateTicketCommand>(r#"{"ticket_type_id": 4}"#).is_err());
    }

    #[test]
    fn test_payment_command_is_camel_case() {
        let json = r#"{"ticketId": 3, "cardIssuer": "VISA", "cardLastDigits": "4242"}"#;

        let cmd: RecordPaymentCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.ticket_id, TicketId(3));
        assert_eq!(cmd.card_issuer, "VISA");
        assert_eq!(cmd.card_last_digits, "4242");
    }

    #[test]
    fn test_payment_command_validation() {
        let ok = RecordPaymentCommand::new(TicketId(1), "VISA".into(), "4242".into());
        assert!(ok.validate().is_ok());

        let short = RecordPaymentCommand::new(TicketId(1), "VISA".into(), "42".into());
        assert!(short.validate().is_err());

        let letters = RecordPaymentCommand::new(TicketId(1), "VISA".into(), "42a2".into());
        assert!(letters.validate().is_err());

        let no_issuer = RecordPaymentCommand::new(TicketId(1), "  ".into(), "4242".into());
        assert!(no_issuer.validate().is_err());
    }

    #[test]
    fn test_room_availability_never_negative() {
        let availability = RoomAvailability::new(&room(2), 3);
        assert_eq!(availability.available, 0);

        let availability = RoomAvailability::new(&room(3), 1);
        assert_eq!(availability.available, 2);
    }

    #[test]
    fn test_room_with_occupancy_flattens_room() {
        let value = serde_json::to_value(RoomWithOccupancy {
            room: room(3),
            occupancy: 1,
        })
        .unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["capacity"], 3);
        assert_eq!(value["occupancy"], 1);
        assert_eq!(value["hotelId"], 1);
    }
}
