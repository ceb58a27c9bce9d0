//! Activity types and enrollments
//!
//! An activity type is a session held on a given date within a time range
//! (`schedules`, e.g. `"09:00 - 10:00"`). An activity is one enrollment's
//! seat in that session.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ActivityId, ActivityTypeId, EnrollmentId};
use super::timestamp;

/// Field order is part of the API contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityType {
    pub id: ActivityTypeId,
    pub name: String,
    pub schedules: String,
    pub capacity: u32,
    pub activity_date: NaiveDate,
    pub place: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ActivityType {
    /// Parsed time range, if `schedules` is well formed
    pub fn time_slot(&self) -> Option<TimeSlot> {
        TimeSlot::parse(&self.schedules)
    }

    /// Whether a single attendee could not take part in both sessions.
    ///
    /// Sessions on different dates never collide. On the same date the time
    /// ranges are compared half-open, so back-to-back sessions are allowed;
    /// when either range is unparseable the raw strings are compared instead.
    pub fn collides_with(&self, other: &ActivityType) -> bool {
        if self.activity_date != other.activity_date {
            return false;
        }

        match (self.time_slot(), other.time_slot()) {
            (Some(a), Some(b)) => a.overlaps(&b),
            _ => self.schedules.trim() == other.schedules.trim(),
        }
    }
}

/// Ordering used when listing activity types: date, then id
pub fn listing_order(a: &ActivityType, b: &ActivityType) -> std::cmp::Ordering {
    a.activity_date
        .cmp(&b.activity_date)
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub activity_type_id: ActivityTypeId,
    pub enrollment_id: EnrollmentId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Half-open `[start, end)` time range within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Parse `"HH:MM - HH:MM"`; whitespace around the dash is optional
    pub fn parse(raw: &str) -> Option<Self> {
        let (start, end) = raw.split_once('-')?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;

        if start >= end {
            return None;
        }

        Some(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity_type(id: i32, date: (i32, u32, u32), schedules: &str) -> ActivityType {
        let now = Utc::now();
        ActivityType {
            id: ActivityTypeId(id),
            name: format!("Session {}", id),
            schedules: schedules.to_string(),
            capacity: 10,
            activity_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            place: "Main Hall".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_time_slot_parse() {
        let slot = TimeSlot::parse("09:00 - 10:30").unwrap();
        assert_eq!(slot.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(slot.end, NaiveTime::from_hms_opt(10, 30, 0).unwrap());

        assert!(TimeSlot::parse("14:00-15:00").is_some());
        assert!(TimeSlot::parse("morning").is_none());
        assert!(TimeSlot::parse("10:00 - 09:00").is_none());
    }

    #[test]
    fn test_overlapping_sessions_collide() {
        let a = activity_type(1, (2026, 11, 2), "09:00 - 10:00");
        let b = activity_type(2, (2026, 11, 2), "09:30 - 11:00");
        assert!(a.collides_with(&b));
        assert!(b.collides_with(&a));
    }

    #[test]
    fn test_back_to_back_sessions_do_not_collide() {
        let a = activity_type(1, (2026, 11, 2), "09:00 - 10:00");
        let b = activity_type(2, (2026, 11, 2), "10:00 - 11:00");
        assert!(!a.collides_with(&b));
    }

    #[test]
    fn test_different_dates_never_collide() {
        let a = activity_type(1, (2026, 11, 2), "09:00 - 10:00");
        let b = activity_type(2, (2026, 11, 3), "09:00 - 10:00");
        assert!(!a.collides_with(&b));
    }

    #[test]
    fn test_unparseable_schedules_compare_textually() {
        let a = activity_type(1, (2026, 11, 2), "morning");
        let b = activity_type(2, (2026, 11, 2), "morning");
        let c = activity_type(3, (2026, 11, 2), "afternoon");
        assert!(a.collides_with(&b));
        assert!(!a.collides_with(&c));
    }

    #[test]
    fn test_listing_order_by_date_then_id() {
        let mut types = vec![
            activity_type(3, (2026, 11, 3), "09:00 - 10:00"),
            activity_type(2, (2026, 11, 2), "11:00 - 12:00"),
            activity_type(1, (2026, 11, 3), "08:00 - 09:00"),
        ];
        types.sort_by(listing_order);

        let ids: Vec<i32> = types.iter().map(|t| t.id.value()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_activity_type_json_field_order() {
        let t = activity_type(5, (2026, 11, 2), "09:00 - 10:00");
        let json = serde_json::to_string(&t).unwrap();

        let fields = [
            "\"id\"",
            "\"name\"",
            "\"schedules\"",
            "\"capacity\"",
            "\"activityDate\"",
            "\"place\"",
            "\"createdAt\"",
            "\"updatedAt\"",
        ];
        let positions: Vec<usize> = fields
            .iter()
            .map(|f| json.find(f).unwrap_or_else(|| panic!("missing {}", f)))
            .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);
        assert!(json.contains("\"activityDate\":\"2026-11-02\""));
    }
}
