//! Ticket/Payment Gate
//!
//! Read-only check shared by the booking, activity and hotel flows: the user
//! must be enrolled and hold a paid, on-site ticket.

use crate::domain::{DomainError, Enrollment, ForbiddenReason, Ticket, TicketType, UserId};
use crate::error::{AppError, AppResult};
use crate::store::SharedStore;

/// Proof that a user passed the gate
#[derive(Debug, Clone)]
pub struct Eligibility {
    pub enrollment: Enrollment,
    pub ticket: Ticket,
    pub ticket_type: TicketType,
}

impl Eligibility {
    /// Evaluate the gate rules against already loaded rows.
    ///
    /// Missing enrollment or ticket is reported first, then an unpaid ticket,
    /// then a remote one.
    pub fn evaluate(
        user_id: UserId,
        enrollment: Option<Enrollment>,
        ticket: Option<(Ticket, TicketType)>,
    ) -> Result<Self, DomainError> {
        let enrollment = enrollment.ok_or(DomainError::EnrollmentNotFound(user_id))?;
        let (ticket, ticket_type) = ticket.ok_or(DomainError::TicketNotFound(user_id))?;

        if !ticket.status.is_paid() {
            return Err(DomainError::Forbidden(ForbiddenReason::NoPayment));
        }

        if ticket_type.is_remote {
            return Err(DomainError::Forbidden(ForbiddenReason::RemoteTicket));
        }

        Ok(Self {
            enrollment,
            ticket,
            ticket_type,
        })
    }

    /// Lodging is only open to ticket types that include a hotel stay
    pub fn require_hotel(&self) -> Result<(), DomainError> {
        if self.ticket_type.includes_hotel {
            Ok(())
        } else {
            Err(DomainError::Forbidden(ForbiddenReason::NoHotelTicket))
        }
    }

    pub fn user_id(&self) -> UserId {
        self.enrollment.user_id
    }
}

/// Loads a user's enrollment and ticket and runs [`Eligibility::evaluate`]
#[derive(Clone)]
pub struct TicketGate {
    store: SharedStore,
}

impl TicketGate {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn check_eligibility(&self, user_id: UserId) -> AppResult<Eligibility> {
        let enrollment = self.store.find_enrollment_by_user(user_id).await?;

        let ticket = match &enrollment {
            Some(enrollment) => self.store.find_ticket_by_enrollment(enrollment.id).await?,
            None => None,
        };

        Eligibility::evaluate(user_id, enrollment, ticket).map_err(|err| {
            tracing::debug!(user_id = %user_id, reason = err.error_code(), "Gate refused user");
            AppError::Domain(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::domain::{EnrollmentId, TicketId, TicketStatus, TicketTypeId};

    fn enrollment() -> Enrollment {
        let now = Utc::now();
        Enrollment {
            id: EnrollmentId(1),
            user_id: UserId(10),
            name: "Ada".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn ticket(status: TicketStatus, is_remote: bool, includes_hotel: bool) -> (Ticket, TicketType) {
        let now = Utc::now();
        let ticket_type = TicketType {
            id: TicketTypeId(2),
            name: "Presencial".to_string(),
            price: dec!(300),
            is_remote,
            includes_hotel,
            created_at: now,
            updated_at: now,
        };
        let ticket = Ticket {
            id: TicketId(3),
            enrollment_id: EnrollmentId(1),
            ticket_type_id: ticket_type.id,
            status,
            created_at: now,
            updated_at: now,
        };
        (ticket, ticket_type)
    }

    #[test]
    fn test_missing_enrollment() {
        let result = Eligibility::evaluate(UserId(10), None, None);
        assert_eq!(result.unwrap_err(), DomainError::EnrollmentNotFound(UserId(10)));
    }

    #[test]
    fn test_missing_ticket() {
        let result = Eligibility::evaluate(UserId(10), Some(enrollment()), None);
        assert_eq!(result.unwrap_err(), DomainError::TicketNotFound(UserId(10)));
    }

    #[test]
    fn test_reserved_ticket_is_forbidden() {
        let result = Eligibility::evaluate(
            UserId(10),
            Some(enrollment()),
            Some(ticket(TicketStatus::Reserved, false, true)),
        );
        assert_eq!(
            result.unwrap_err(),
            DomainError::Forbidden(ForbiddenReason::NoPayment)
        );
    }

    #[test]
    fn test_payment_checked_before_remoteness() {
        let result = Eligibility::evaluate(
            UserId(10),
            Some(enrollment()),
            Some(ticket(TicketStatus::Reserved, true, false)),
        );
        assert_eq!(
            result.unwrap_err(),
            DomainError::Forbidden(ForbiddenReason::NoPayment)
        );
    }

    #[test]
    fn test_remote_ticket_is_forbidden() {
        let result = Eligibility::evaluate(
            UserId(10),
            Some(enrollment()),
            Some(ticket(TicketStatus::Paid, true, false)),
        );
        assert_eq!(
            result.unwrap_err(),
            DomainError::Forbidden(ForbiddenReason::RemoteTicket)
        );
    }

    #[test]
    fn test_paid_on_site_ticket_passes() {
        let eligibility = Eligibility::evaluate(
            UserId(10),
            Some(enrollment()),
            Some(ticket(TicketStatus::Paid, false, false)),
        )
        .unwrap();

        assert_eq!(eligibility.user_id(), UserId(10));
        assert_eq!(
            eligibility.require_hotel().unwrap_err(),
            DomainError::Forbidden(ForbiddenReason::NoHotelTicket)
        );
    }

    #[test]
    fn test_hotel_ticket_allows_lodging() {
        let eligibility = Eligibility::evaluate(
            UserId(10),
            Some(enrollment()),
            Some(ticket(TicketStatus::Paid, false, true)),
        )
        .unwrap();

        assert!(eligibility.require_hotel().is_ok());
    }
}
