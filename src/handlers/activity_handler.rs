//! Activity Handler
//!
//! Seats users in activity sessions. Users need a booking, cannot hold two
//! overlapping sessions, and a session never takes more than its capacity.

use std::sync::Arc;

use crate::domain::{
    Activity, ActivityId, ActivityType, ActivityTypeId, ConflictReason, DomainError,
    ForbiddenReason, UserId,
};
use crate::error::AppResult;
use crate::ledger::{CapacityLedger, ResourceKey, UserLocks};
use crate::state::AppState;
use crate::store::SharedStore;

use super::eligibility::{Eligibility, TicketGate};

/// Handler for activity enrollment
pub struct ActivityHandler {
    store: SharedStore,
    ledger: Arc<CapacityLedger>,
    user_locks: Arc<UserLocks>,
    gate: TicketGate,
}

impl ActivityHandler {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            ledger: Arc::clone(&state.ledger),
            user_locks: Arc::clone(&state.user_locks),
            gate: TicketGate::new(Arc::clone(&state.store)),
        }
    }

    /// Gate plus the booking precondition
    async fn admit(&self, user_id: UserId) -> AppResult<Eligibility> {
        let eligibility = self.gate.check_eligibility(user_id).await?;

        if self.store.find_booking_by_user(user_id).await?.is_none() {
            return Err(DomainError::Forbidden(ForbiddenReason::NoBooking).into());
        }

        Ok(eligibility)
    }

    /// All sessions, by date then id
    pub async fn list_activity_types(&self, user_id: UserId) -> AppResult<Vec<ActivityType>> {
        self.admit(user_id).await?;

        let mut types = self.store.list_activity_types().await?;
        types.sort_by(crate::domain::activity::listing_order);
        Ok(types)
    }

    /// Take a seat in `activity_type_id` for `user_id`
    pub async fn enroll(
        &self,
        user_id: UserId,
        activity_type_id: ActivityTypeId,
    ) -> AppResult<Activity> {
        let eligibility = self.admit(user_id).await?;
        let enrollment_id = eligibility.enrollment.id;

        let activity_type = self
            .store
            .find_activity_type(activity_type_id)
            .await?
            .ok_or(DomainError::ActivityTypeNotFound(activity_type_id))?;

        let _guard = self.user_locks.acquire(user_id).await;

        let held = self.store.list_activities_by_enrollment(enrollment_id).await?;

        if held.iter().any(|(a, _)| a.activity_type_id == activity_type_id) {
            return Err(DomainError::Conflict(ConflictReason::AlreadyEnrolled).into());
        }

        if let Some((_, other)) = held.iter().find(|(_, t)| t.collides_with(&activity_type)) {
            tracing::warn!(
                user_id = %user_id,
                activity_type_id = %activity_type_id,
                conflicting_activity_type_id = %other.id,
                "Schedule overlap"
            );
            return Err(DomainError::Conflict(ConflictReason::ScheduleOverlap).into());
        }

        let key = ResourceKey::ActivityType(activity_type_id);
        let Some(claim) = self.ledger.claim(key, user_id, activity_type.capacity) else {
            tracing::warn!(
                user_id = %user_id,
                activity_type_id = %activity_type_id,
                capacity = activity_type.capacity,
                "Activity is full"
            );
            return Err(DomainError::Conflict(ConflictReason::ActivityFull).into());
        };

        // Dropping the uncommitted claim gives the seat back
        let activity = match self.store.insert_activity(enrollment_id, activity_type_id).await {
            Ok(activity) => activity,
            Err(e) if e.is_unique_violation() => {
                return Err(DomainError::Conflict(ConflictReason::AlreadyEnrolled).into());
            }
            Err(e) => return Err(e.into()),
        };
        claim.commit();

        tracing::info!(
            user_id = %user_id,
            activity_id = %activity.id,
            activity_type_id = %activity_type_id,
            "Enrolled in activity"
        );

        Ok(activity)
    }

    /// Give up a seat. Only the owner's enrollment may cancel it.
    pub async fn cancel(&self, user_id: UserId, activity_id: ActivityId) -> AppResult<()> {
        let eligibility = self.gate.check_eligibility(user_id).await?;

        let _guard = self.user_locks.acquire(user_id).await;

        let activity = self
            .store
            .find_activity(activity_id)
            .await?
            .filter(|a| a.enrollment_id == eligibility.enrollment.id)
            .ok_or(DomainError::ActivityNotFound(activity_id))?;

        if !self.store.delete_activity(activity_id).await? {
            return Err(DomainError::ActivityNotFound(activity_id).into());
        }

        self.ledger
            .release(ResourceKey::ActivityType(activity.activity_type_id), user_id);

        tracing::info!(
            user_id = %user_id,
            activity_id = %activity_id,
            activity_type_id = %activity.activity_type_id,
            "Activity cancelled"
        );

        Ok(())
    }
}
