//! Ticket Handler
//!
//! Ticket catalogue and purchase. An enrolled user may reserve exactly one
//! ticket; it stays RESERVED until a payment is recorded for it.

use std::sync::Arc;

use crate::domain::{ConflictReason, DomainError, Enrollment, TicketType, UserId};
use crate::error::AppResult;
use crate::ledger::UserLocks;
use crate::state::AppState;
use crate::store::SharedStore;

use super::{CreateTicketCommand, TicketWithType};

pub struct TicketHandler {
    store: SharedStore,
    user_locks: Arc<UserLocks>,
}

impl TicketHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            user_locks: Arc::clone(&state.user_locks),
        }
    }

    async fn enrollment_of(&self, user_id: UserId) -> AppResult<Enrollment> {
        let enrollment = self
            .store
            .find_enrollment_by_user(user_id)
            .await?
            .ok_or(DomainError::EnrollmentNotFound(user_id))?;
        Ok(enrollment)
    }

    /// Every ticket type on sale
    pub async fn list_ticket_types(&self) -> AppResult<Vec<TicketType>> {
        Ok(self.store.list_ticket_types().await?)
    }

    /// The user's ticket with its type
    pub async fn find_for_user(&self, user_id: UserId) -> AppResult<TicketWithType> {
        let enrollment = self.enrollment_of(user_id).await?;

        let ticket = self
            .store
            .find_ticket_by_enrollment(enrollment.id)
            .await?
            .ok_or(DomainError::TicketNotFound(user_id))?;

        Ok(ticket.into())
    }

    /// Reserve a ticket of the requested type for `user_id`
    pub async fn purchase(
        &self,
        user_id: UserId,
        command: CreateTicketCommand,
    ) -> AppResult<TicketWithType> {
        let enrollment = self.enrollment_of(user_id).await?;

        let ticket_type = self
            .store
            .find_ticket_type(command.ticket_type_id)
            .await?
            .ok_or(DomainError::TicketTypeNotFound(command.ticket_type_id))?;

        let _guard = self.user_locks.acquire(user_id).await;

        if self.store.find_ticket_by_enrollment(enrollment.id).await?.is_some() {
            return Err(DomainError::Conflict(ConflictReason::TicketAlreadyExists).into());
        }

        let ticket = match self.store.insert_ticket(enrollment.id, ticket_type.id).await {
            Ok(ticket) => ticket,
            Err(e) if e.is_unique_violation() => {
                return Err(DomainError::Conflict(ConflictReason::TicketAlreadyExists).into());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            user_id = %user_id,
            ticket_id = %ticket.id,
            ticket_type_id = %ticket_type.id,
            price = %ticket_type.price,
            "Ticket reserved"
        );

        Ok(TicketWithType {
            ticket,
            ticket_type,
        })
    }
}
