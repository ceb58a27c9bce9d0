//! Database module
//!
//! Database connectivity and schema verification.
//! The schema itself lives in raw SQL files under `migrations/`.

use sqlx::PgPool;

/// Tables the store reads and writes
const REQUIRED_TABLES: &[&str] = &[
    "users",
    "sessions",
    "enrollments",
    "ticket_types",
    "tickets",
    "payments",
    "hotels",
    "rooms",
    "bookings",
    "activity_types",
    "activities",
];

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    tracing::info!(tables = REQUIRED_TABLES.len(), "Database schema verified");
    Ok(true)
}
