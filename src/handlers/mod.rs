//! Handlers module
//!
//! Business operations behind the HTTP routes. Every operation takes the
//! acting user explicitly; none reads it from request state.

mod activity_handler;
mod booking_handler;
mod commands;
mod eligibility;
mod hotel_handler;
mod payment_handler;
mod ticket_handler;


pub use activity_handler::ActivityHandler;
pub use booking_handler::BookingHandler;
pub use commands::*;
pub use eligibility::{Eligibility, TicketGate};
pub use hotel_handler::HotelHandler;
pub use payment_handler::PaymentHandler;
pub use ticket_handler::TicketHandler;
