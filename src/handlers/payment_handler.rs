//! Payment Handler
//!
//! Records a payment that was processed elsewhere and moves the user's ticket
//! from RESERVED to PAID. The charged value is always the ticket type's price.

use std::sync::Arc;

use crate::domain::{DomainError, Payment, UserId};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{PaymentDetails, SharedStore};

use super::RecordPaymentCommand;

pub struct PaymentHandler {
    store: SharedStore,
}

impl PaymentHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        command: RecordPaymentCommand,
    ) -> AppResult<Payment> {
        command.validate().map_err(AppError::InvalidRequest)?;

        let enrollment = self
            .store
            .find_enrollment_by_user(user_id)
            .await?
            .ok_or(DomainError::EnrollmentNotFound(user_id))?;

        // Tickets of other users are reported as missing
        let (ticket, ticket_type) = self
            .store
            .find_ticket_by_enrollment(enrollment.id)
            .await?
            .filter(|(ticket, _)| ticket.id == command.ticket_id)
            .ok_or(DomainError::TicketNotFound(user_id))?;

        let details = PaymentDetails {
            value: ticket_type.price,
            card_issuer: command.card_issuer,
            card_last_digits: command.card_last_digits,
        };

        let payment = self.store.record_payment(ticket.id, details).await?;

        tracing::info!(
            user_id = %user_id,
            ticket_id = %ticket.id,
            payment_id = %payment.id,
            value = %payment.value,
            "Ticket paid"
        );

        Ok(payment)
    }
}
