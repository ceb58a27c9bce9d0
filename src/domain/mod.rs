//! Domain module
//!
//! Core domain types and business rules for tickets, lodging and activities.

pub mod activity;
pub mod context;
pub mod error;
pub mod ids;
pub mod lodging;
pub mod ticket;
pub mod timestamp;

pub use activity::{Activity, ActivityType, TimeSlot};
pub use context::RequestContext;
pub use error::{ConflictReason, DomainError, ForbiddenReason};
pub use ids::{
    ActivityId, ActivityTypeId, BookingId, EnrollmentId, HotelId, PaymentId, RoomId, TicketId,
    TicketTypeId, UserId,
};
pub use lodging::{Booking, Hotel, Room, DEFAULT_ROOM_CAPACITY};
pub use ticket::{Enrollment, Payment, Ticket, TicketStatus, TicketType};
