//! Enrollment, ticket and payment types
//!
//! A ticket is the user's entitlement. Its status starts RESERVED at purchase
//! and flips to PAID exactly once, when a payment is recorded.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;
use super::ids::{EnrollmentId, PaymentId, TicketId, TicketTypeId, UserId};
use super::timestamp;

/// Ticket payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Reserved,
    Paid,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Reserved => "RESERVED",
            TicketStatus::Paid => "PAID",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, TicketStatus::Paid)
    }

    /// The single allowed edge: RESERVED -> PAID
    pub fn confirm_payment(self) -> Result<Self, DomainError> {
        match self {
            TicketStatus::Reserved => Ok(TicketStatus::Paid),
            TicketStatus::Paid => Err(DomainError::InvalidTicketTransition {
                from: TicketStatus::Paid,
                to: TicketStatus::Paid,
            }),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown ticket status: {0}")]
pub struct UnknownTicketStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownTicketStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(TicketStatus::Reserved),
            "PAID" => Ok(TicketStatus::Paid),
            other => Err(UnknownTicketStatus(other.to_string())),
        }
    }
}

/// Registration of a user for the event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub name: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Ticket category; decides which on-site resources a ticket unlocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: TicketTypeId,
    pub name: String,
    pub price: Decimal,
    pub is_remote: bool,
    pub includes_hotel: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub enrollment_id: EnrollmentId,
    pub ticket_type_id: TicketTypeId,
    pub status: TicketStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Apply a confirmed payment to this ticket
    pub fn confirm_payment(mut self, at: DateTime<Utc>) -> Result<Self, DomainError> {
        self.status = self.status.confirm_payment()?;
        self.updated_at = at;
        Ok(self)
    }
}

/// Confirmed payment for a ticket. Only its existence matters to booking rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub ticket_id: TicketId,
    pub value: Decimal,
    pub card_issuer: String,
    pub card_last_digits: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}
