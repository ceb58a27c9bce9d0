//! event_booking Library
//!
//! Ticket gating, hotel booking and activity enrollment for an event
//! platform. Re-exports modules for integration testing and the binary.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod jobs;
pub mod ledger;
pub mod state;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{DomainError, RequestContext};
pub use state::AppState;
