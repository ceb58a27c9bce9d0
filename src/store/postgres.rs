//! PostgreSQL store
//!
//! [`Store`] implementation over a sqlx connection pool. Row structs mirror
//! the tables in `migrations/` and are converted into domain types at the
//! boundary.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{
    Activity, ActivityId, ActivityType, ActivityTypeId, Booking, BookingId, Enrollment,
    EnrollmentId, Hotel, HotelId, Payment, PaymentId, Room, RoomId, Ticket, TicketId,
    TicketStatus, TicketType, TicketTypeId, UserId,
};

use super::error::classify;
use super::{PaymentDetails, Store, StoreError, StoreResult};

// =========================================================================
// Row types
// =========================================================================

#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    id: i32,
    user_id: i32,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Enrollment {
            id: EnrollmentId(row.id),
            user_id: UserId(row.user_id),
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketWithTypeRow {
    ticket_id: i32,
    enrollment_id: i32,
    ticket_type_id: i32,
    status: String,
    ticket_created_at: DateTime<Utc>,
    ticket_updated_at: DateTime<Utc>,
    type_name: String,
    price: Decimal,
    is_remote: bool,
    includes_hotel: bool,
    type_created_at: DateTime<Utc>,
    type_updated_at: DateTime<Utc>,
}

impl TicketWithTypeRow {
    fn into_domain(self) -> StoreResult<(Ticket, TicketType)> {
        let status: TicketStatus = self.status.parse()?;

        let ticket = Ticket {
            id: TicketId(self.ticket_id),
            enrollment_id: EnrollmentId(self.enrollment_id),
            ticket_type_id: TicketTypeId(self.ticket_type_id),
            status,
            created_at: self.ticket_created_at,
            updated_at: self.ticket_updated_at,
        };
        let ticket_type = TicketType {
            id: TicketTypeId(self.ticket_type_id),
            name: self.type_name,
            price: self.price,
            is_remote: self.is_remote,
            includes_hotel: self.includes_hotel,
            created_at: self.type_created_at,
            updated_at: self.type_updated_at,
        };
        Ok((ticket, ticket_type))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketTypeRow {
    id: i32,
    name: String,
    price: Decimal,
    is_remote: bool,
    includes_hotel: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TicketTypeRow> for TicketType {
    fn from(row: TicketTypeRow) -> Self {
        TicketType {
            id: TicketTypeId(row.id),
            name: row.name,
            price: row.price,
            is_remote: row.is_remote,
            includes_hotel: row.includes_hotel,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i32,
    enrollment_id: i32,
    ticket_type_id: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: TicketId(row.id),
            enrollment_id: EnrollmentId(row.enrollment_id),
            ticket_type_id: TicketTypeId(row.ticket_type_id),
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i32,
    ticket_id: i32,
    value: Decimal,
    card_issuer: String,
    card_last_digits: String,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: PaymentId(row.id),
            ticket_id: TicketId(row.ticket_id),
            value: row.value,
            card_issuer: row.card_issuer,
            card_last_digits: row.card_last_digits,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HotelRow {
    id: i32,
    name: String,
    image: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<HotelRow> for Hotel {
    fn from(row: HotelRow) -> Self {
        Hotel {
            id: HotelId(row.id),
            name: row.name,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i32,
    name: String,
    capacity: i32,
    hotel_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Room {
            id: RoomId(row.id),
            name: row.name,
            capacity: decode_capacity(row.capacity)?,
            hotel_id: HotelId(row.hotel_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: i32,
    user_id: i32,
    room_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: BookingId(row.id),
            user_id: UserId(row.user_id),
            room_id: RoomId(row.room_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActivityTypeRow {
    id: i32,
    name: String,
    schedules: String,
    capacity: i32,
    activity_date: NaiveDate,
    place: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ActivityTypeRow> for ActivityType {
    type Error = StoreError;

    fn try_from(row: ActivityTypeRow) -> Result<Self, Self::Error> {
        Ok(ActivityType {
            id: ActivityTypeId(row.id),
            name: row.name,
            schedules: row.schedules,
            capacity: decode_capacity(row.capacity)?,
            activity_date: row.activity_date,
            place: row.place,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: i32,
    activity_type_id: i32,
    enrollment_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Activity {
            id: ActivityId(row.id),
            activity_type_id: ActivityTypeId(row.activity_type_id),
            enrollment_id: EnrollmentId(row.enrollment_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Activity joined with its type; type columns are prefixed `type_`
#[derive(Debug, sqlx::FromRow)]
struct ActivityWithTypeRow {
    id: i32,
    activity_type_id: i32,
    enrollment_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    type_name: String,
    type_schedules: String,
    type_capacity: i32,
    type_activity_date: NaiveDate,
    type_place: String,
    type_created_at: DateTime<Utc>,
    type_updated_at: DateTime<Utc>,
}

impl ActivityWithTypeRow {
    fn into_domain(self) -> StoreResult<(Activity, ActivityType)> {
        let activity_type = ActivityType {
            id: ActivityTypeId(self.activity_type_id),
            name: self.type_name,
            schedules: self.type_schedules,
            capacity: decode_capacity(self.type_capacity)?,
            activity_date: self.type_activity_date,
            place: self.type_place,
            created_at: self.type_created_at,
            updated_at: self.type_updated_at,
        };
        let activity = Activity {
            id: ActivityId(self.id),
            activity_type_id: ActivityTypeId(self.activity_type_id),
            enrollment_id: EnrollmentId(self.enrollment_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((activity, activity_type))
    }
}

fn decode_capacity(raw: i32) -> StoreResult<u32> {
    u32::try_from(raw).map_err(|_| StoreError::Decode(format!("negative capacity {}", raw)))
}

const TICKET_TYPE_COLUMNS: &str =
    "id, name, price, is_remote, includes_hotel, created_at, updated_at";

const ACTIVITY_TYPE_COLUMNS: &str =
    "id, name, schedules, capacity, activity_date, place, created_at, updated_at";

// =========================================================================
// PgStore
// =========================================================================

/// PostgreSQL-backed [`Store`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_session_user(&self, token_hash: &str) -> StoreResult<Option<UserId>> {
        let user_id: Option<i32> =
            sqlx::query_scalar("SELECT user_id FROM sessions WHERE token_hash = $1")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user_id.map(UserId))
    }

    async fn find_enrollment_by_user(&self, user_id: UserId) -> StoreResult<Option<Enrollment>> {
        let row: Option<EnrollmentRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, created_at, updated_at
            FROM enrollments
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Enrollment::from))
    }

    async fn find_ticket_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Option<(Ticket, TicketType)>> {
        let row: Option<TicketWithTypeRow> = sqlx::query_as(
            r#"
            SELECT
                t.id AS ticket_id,
                t.enrollment_id,
                t.ticket_type_id,
                t.status,
                t.created_at AS ticket_created_at,
                t.updated_at AS ticket_updated_at,
                tt.name AS type_name,
                tt.price,
                tt.is_remote,
                tt.includes_hotel,
                tt.created_at AS type_created_at,
                tt.updated_at AS type_updated_at
            FROM tickets t
            JOIN ticket_types tt ON tt.id = t.ticket_type_id
            WHERE t.enrollment_id = $1
            "#,
        )
        .bind(enrollment_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TicketWithTypeRow::into_domain).transpose()
    }

    async fn list_ticket_types(&self) -> StoreResult<Vec<TicketType>> {
        let sql = format!("SELECT {} FROM ticket_types ORDER BY id", TICKET_TYPE_COLUMNS);
        let rows: Vec<TicketTypeRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(TicketType::from).collect())
    }

    async fn find_ticket_type(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> StoreResult<Option<TicketType>> {
        let sql = format!("SELECT {} FROM ticket_types WHERE id = $1", TICKET_TYPE_COLUMNS);
        let row: Option<TicketTypeRow> = sqlx::query_as(&sql)
            .bind(ticket_type_id.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TicketType::from))
    }

    async fn insert_ticket(
        &self,
        enrollment_id: EnrollmentId,
        ticket_type_id: TicketTypeId,
    ) -> StoreResult<Ticket> {
        // tickets.enrollment_id is unique: a second purchase fails here
        let row: TicketRow = sqlx::query_as(
            r#"
            INSERT INTO tickets (enrollment_id, ticket_type_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, enrollment_id, ticket_type_id, status, created_at, updated_at
            "#,
        )
        .bind(enrollment_id.value())
        .bind(ticket_type_id.value())
        .bind(TicketStatus::Reserved.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        row.try_into()
    }

    async fn record_payment(
        &self,
        ticket_id: TicketId,
        details: PaymentDetails,
    ) -> StoreResult<Payment> {
        let mut tx = self.pool.begin().await?;

        // Lock the ticket row so two confirmations cannot both see RESERVED
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(ticket_id.value())
                .fetch_optional(&mut *tx)
                .await?;

        let status: TicketStatus = status
            .ok_or_else(|| StoreError::NotFound(format!("ticket {}", ticket_id)))?
            .parse()?;
        let next = status.confirm_payment()?;

        sqlx::query("UPDATE tickets SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(ticket_id.value())
            .bind(next.as_str())
            .execute(&mut *tx)
            .await?;

        let row: PaymentRow = sqlx::query_as(
            r#"
            INSERT INTO payments (ticket_id, value, card_issuer, card_last_digits)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ticket_id, value, card_issuer, card_last_digits, created_at
            "#,
        )
        .bind(ticket_id.value())
        .bind(details.value)
        .bind(&details.card_issuer)
        .bind(&details.card_last_digits)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket_id,
            payment_id = row.id,
            "Payment recorded, ticket paid"
        );
        Ok(row.into())
    }

    async fn list_hotels(&self) -> StoreResult<Vec<Hotel>> {
        let rows: Vec<HotelRow> = sqlx::query_as(
            "SELECT id, name, image, created_at, updated_at FROM hotels ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Hotel::from).collect())
    }

    async fn find_hotel(&self, hotel_id: HotelId) -> StoreResult<Option<Hotel>> {
        let row: Option<HotelRow> = sqlx::query_as(
            "SELECT id, name, image, created_at, updated_at FROM hotels WHERE id = $1",
        )
        .bind(hotel_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Hotel::from))
    }

    async fn list_rooms_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Room>> {
        let rows: Vec<RoomRow> = sqlx::query_as(
            r#"
            SELECT id, name, capacity, hotel_id, created_at, updated_at
            FROM rooms
            WHERE hotel_id = $1
            ORDER BY id
            "#,
        )
        .bind(hotel_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Room::try_from).collect()
    }

    async fn find_room(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT id, name, capacity, hotel_id, created_at, updated_at FROM rooms WHERE id = $1",
        )
        .bind(room_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Room::try_from).transpose()
    }

    async fn find_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, user_id, room_id, created_at, updated_at FROM bookings WHERE id = $1",
        )
        .bind(booking_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn find_booking_by_user(&self, user_id: UserId) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, user_id, room_id, created_at, updated_at FROM bookings WHERE user_id = $1",
        )
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn save_booking(&self, user_id: UserId, room_id: RoomId) -> StoreResult<Booking> {
        // bookings.user_id is unique: a second booking moves the existing row
        let row: BookingRow = sqlx::query_as(
            r#"
            INSERT INTO bookings (user_id, room_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET room_id = EXCLUDED.room_id, updated_at = NOW()
            RETURNING id, user_id, room_id, created_at, updated_at
            "#,
        )
        .bind(user_id.value())
        .bind(room_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into())
    }

    async fn list_activity_types(&self) -> StoreResult<Vec<ActivityType>> {
        let sql = format!(
            "SELECT {} FROM activity_types ORDER BY activity_date ASC, id ASC",
            ACTIVITY_TYPE_COLUMNS
        );
        let rows: Vec<ActivityTypeRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(ActivityType::try_from).collect()
    }

    async fn find_activity_type(
        &self,
        activity_type_id: ActivityTypeId,
    ) -> StoreResult<Option<ActivityType>> {
        let sql = format!("SELECT {} FROM activity_types WHERE id = $1", ACTIVITY_TYPE_COLUMNS);
        let row: Option<ActivityTypeRow> = sqlx::query_as(&sql)
            .bind(activity_type_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ActivityType::try_from).transpose()
    }

    async fn list_activities_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Vec<(Activity, ActivityType)>> {
        let rows: Vec<ActivityWithTypeRow> = sqlx::query_as(
            r#"
            SELECT
                a.id,
                a.activity_type_id,
                a.enrollment_id,
                a.created_at,
                a.updated_at,
                aty.name AS type_name,
                aty.schedules AS type_schedules,
                aty.capacity AS type_capacity,
                aty.activity_date AS type_activity_date,
                aty.place AS type_place,
                aty.created_at AS type_created_at,
                aty.updated_at AS type_updated_at
            FROM activities a
            JOIN activity_types aty ON aty.id = a.activity_type_id
            WHERE a.enrollment_id = $1
            ORDER BY aty.activity_date, a.id
            "#,
        )
        .bind(enrollment_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ActivityWithTypeRow::into_domain).collect()
    }

    async fn insert_activity(
        &self,
        enrollment_id: EnrollmentId,
        activity_type_id: ActivityTypeId,
    ) -> StoreResult<Activity> {
        let row: ActivityRow = sqlx::query_as(
            r#"
            INSERT INTO activities (activity_type_id, enrollment_id)
            VALUES ($1, $2)
            RETURNING id, activity_type_id, enrollment_id, created_at, updated_at
            "#,
        )
        .bind(activity_type_id.value())
        .bind(enrollment_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into())
    }

    async fn find_activity(&self, activity_id: ActivityId) -> StoreResult<Option<Activity>> {
        let row: Option<ActivityRow> = sqlx::query_as(
            r#"
            SELECT id, activity_type_id, enrollment_id, created_at, updated_at
            FROM activities
            WHERE id = $1
            "#,
        )
        .bind(activity_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Activity::from))
    }

    async fn delete_activity(&self, activity_id: ActivityId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1")
            .bind(activity_id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn room_holders(&self) -> StoreResult<Vec<(RoomId, UserId)>> {
        let rows: Vec<(i32, i32)> = sqlx::query_as("SELECT room_id, user_id FROM bookings")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(room_id, user_id)| (RoomId(room_id), UserId(user_id)))
            .collect())
    }

    async fn activity_holders(&self) -> StoreResult<Vec<(ActivityTypeId, UserId)>> {
        let rows: Vec<(i32, i32)> = sqlx::query_as(
            r#"
            SELECT a.activity_type_id, e.user_id
            FROM activities a
            JOIN enrollments e ON e.id = a.enrollment_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(activity_type_id, user_id)| (ActivityTypeId(activity_type_id), UserId(user_id)))
            .collect())
    }
}
