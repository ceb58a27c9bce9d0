//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use std::fmt;

use thiserror::Error;

use super::ids::{ActivityId, ActivityTypeId, BookingId, HotelId, RoomId, TicketTypeId, UserId};
use super::ticket::TicketStatus;

/// Why an otherwise known user may not proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Ticket is still RESERVED
    NoPayment,
    /// Remote tickets never grant on-site access
    RemoteTicket,
    /// Ticket type does not include a hotel stay
    NoHotelTicket,
    /// Activities require an active room booking
    NoBooking,
    /// Booking belongs to another user
    NotBookingOwner,
}

impl ForbiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForbiddenReason::NoPayment => "no_payment",
            ForbiddenReason::RemoteTicket => "remote_ticket",
            ForbiddenReason::NoHotelTicket => "no_hotel_ticket",
            ForbiddenReason::NoBooking => "no_booking",
            ForbiddenReason::NotBookingOwner => "not_booking_owner",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capacity or state conflict on a finite resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    RoomFull,
    ActivityFull,
    AlreadyEnrolled,
    ScheduleOverlap,
    /// An enrollment holds at most one ticket
    TicketAlreadyExists,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::RoomFull => "room_full",
            ConflictReason::ActivityFull => "activity_full",
            ConflictReason::AlreadyEnrolled => "already_enrolled",
            ConflictReason::ScheduleOverlap => "schedule_overlap",
            ConflictReason::TicketAlreadyExists => "ticket_already_exists",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain-specific errors
///
/// Every variant is terminal for the request that produced it. The API layer
/// maps the not-found family to 404, `Forbidden` to 403 and `Conflict` to 409.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Enrollment not found for user {0}")]
    EnrollmentNotFound(UserId),

    #[error("Ticket not found for user {0}")]
    TicketNotFound(UserId),

    #[error("Ticket type not found: {0}")]
    TicketTypeNotFound(TicketTypeId),

    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Hotel not found: {0}")]
    HotelNotFound(HotelId),

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error("User {0} has no booking")]
    NoBookingForUser(UserId),

    #[error("Activity type not found: {0}")]
    ActivityTypeNotFound(ActivityTypeId),

    #[error("Activity not found: {0}")]
    ActivityNotFound(ActivityId),

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// Ticket status only ever moves RESERVED -> PAID
    #[error("Invalid ticket transition from {from} to {to}")]
    InvalidTicketTransition { from: TicketStatus, to: TicketStatus },
}

impl DomainError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EnrollmentNotFound(_)
                | Self::TicketNotFound(_)
                | Self::TicketTypeNotFound(_)
                | Self::RoomNotFound(_)
                | Self::HotelNotFound(_)
                | Self::BookingNotFound(_)
                | Self::NoBookingForUser(_)
                | Self::ActivityTypeNotFound(_)
                | Self::ActivityNotFound(_)
        )
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::InvalidTicketTransition { .. })
    }

    /// Stable machine-readable code for response bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EnrollmentNotFound(_) => "enrollment_not_found",
            Self::TicketNotFound(_) => "ticket_not_found",
            Self::TicketTypeNotFound(_) => "ticket_type_not_found",
            Self::RoomNotFound(_) => "room_not_found",
            Self::HotelNotFound(_) => "hotel_not_found",
            Self::BookingNotFound(_) | Self::NoBookingForUser(_) => "booking_not_found",
            Self::ActivityTypeNotFound(_) => "activity_type_not_found",
            Self::ActivityNotFound(_) => "activity_not_found",
            Self::Forbidden(reason) => reason.as_str(),
            Self::Conflict(reason) => reason.as_str(),
            Self::InvalidTicketTransition { .. } => "invalid_ticket_transition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family() {
        let err = DomainError::TicketNotFound(UserId(1));
        assert!(err.is_not_found());
        assert!(!err.is_forbidden());
        assert!(err.to_string().contains("user 1"));
    }

    #[test]
    fn test_forbidden_codes() {
        let err = DomainError::Forbidden(ForbiddenReason::RemoteTicket);
        assert!(err.is_forbidden());
        assert_eq!(err.error_code(), "remote_ticket");
        assert_eq!(err.to_string(), "Forbidden: remote_ticket");
    }

    #[test]
    fn test_conflict_codes() {
        let err = DomainError::Conflict(ConflictReason::RoomFull);
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert_eq!(err.error_code(), "room_full");
    }

    #[test]
    fn test_ticket_purchase_codes() {
        let missing = DomainError::TicketTypeNotFound(TicketTypeId(3));
        assert!(missing.is_not_found());
        assert_eq!(missing.error_code(), "ticket_type_not_found");

        let duplicate = DomainError::Conflict(ConflictReason::TicketAlreadyExists);
        assert!(duplicate.is_conflict());
        assert_eq!(duplicate.error_code(), "ticket_already_exists");
    }
}
