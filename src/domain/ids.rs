//! Identifier types
//!
//! Integer row identifiers wrapped in newtypes so a room id can never be
//! passed where an activity type id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
                Serialize, Deserialize, sqlx::Type,
            )]
            #[serde(transparent)]
            #[sqlx(transparent)]
            pub struct $name(pub i32);

            impl $name {
                pub fn value(self) -> i32 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i32> for $name {
                fn from(value: i32) -> Self {
                    Self(value)
                }
            }
        )+
    };
}

define_id!(
    /// Authenticated user
    UserId,
    EnrollmentId,
    TicketTypeId,
    TicketId,
    PaymentId,
    HotelId,
    RoomId,
    BookingId,
    ActivityTypeId,
    ActivityId,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&RoomId(7)).unwrap();
        assert_eq!(json, "7");

        let id: ActivityTypeId = serde_json::from_str("12").unwrap();
        assert_eq!(id, ActivityTypeId(12));
    }
}
