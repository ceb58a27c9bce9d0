//! Seed Tool
//!
//! Fills an empty database with hotels, rooms and an activity program.
//! Run with: cargo run --bin seed -- --hotels 3 --rooms 6 --days 3

use std::time::Instant;

use chrono::{Days, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;

use event_booking::Config;

/// Daily program: (name, schedules, capacity, place)
const PROGRAM: &[(&str, &str, i32, &str)] = &[
    ("Abertura", "09:00 - 10:00", 200, "Auditório Principal"),
    ("Workshop de Rust", "10:00 - 12:00", 30, "Sala Lateral"),
    ("Painel de Carreira", "10:30 - 11:30", 80, "Auditório Lateral"),
    ("Almoço com Palestrantes", "12:00 - 13:00", 20, "Sala de Workshop"),
    ("Hackathon", "14:00 - 18:00", 50, "Sala de Workshop"),
];

/// Value following `flag`, or `default` when the flag is absent
fn arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> anyhow::Result<T> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(default);
    };
    let Some(raw) = args.get(i + 1) else {
        anyhow::bail!("missing value for {}", flag);
    };
    raw.parse().map_err(|_| anyhow::anyhow!("invalid value for {}: {:?}", flag, raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let hotel_count: u32 = arg(&args, "--hotels", 3)?;
    let rooms_per_hotel: u32 = arg(&args, "--rooms", 6)?;
    let days: u64 = arg(&args, "--days", 3)?;
    let first_day: NaiveDate = arg(&args, "--start", Utc::now().date_naive())?;

    let config = Config::from_env()?;

    println!(
        "Seeding {} hotels x {} rooms (capacity {}), {} days of activities from {}",
        hotel_count, rooms_per_hotel, config.default_room_capacity, days, first_day
    );
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    let start = Instant::now();
    let mut tx = pool.begin().await?;
    let mut rooms_created = 0u32;

    for h in 1..=hotel_count {
        let hotel_id: i32 = sqlx::query_scalar(
            "INSERT INTO hotels (name, image) VALUES ($1, $2) RETURNING id",
        )
        .bind(format!("Hotel {}", h))
        .bind(format!("https://images.example.com/hotel-{}.jpg", h))
        .fetch_one(&mut *tx)
        .await?;

        for r in 1..=rooms_per_hotel {
            sqlx::query("INSERT INTO rooms (name, capacity, hotel_id) VALUES ($1, $2, $3)")
                .bind(format!("{}{:02}", h, r))
                .bind(config.default_room_capacity as i32)
                .bind(hotel_id)
                .execute(&mut *tx)
                .await?;
            rooms_created += 1;
        }
    }

    let mut sessions_created = 0u32;
    for offset in 0..days {
        let Some(day) = first_day.checked_add_days(Days::new(offset)) else {
            anyhow::bail!("date overflow after {}", first_day);
        };

        for &(name, schedules, capacity, place) in PROGRAM {
            sqlx::query(
                r#"
                INSERT INTO activity_types (name, schedules, capacity, activity_date, place)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(name)
            .bind(schedules)
            .bind(capacity)
            .bind(day)
            .bind(place)
            .execute(&mut *tx)
            .await?;
            sessions_created += 1;
        }
    }

    tx.commit().await?;

    println!("\n=== Seed Results ===");
    println!("Hotels: {}", hotel_count);
    println!("Rooms: {}", rooms_created);
    println!("Activity sessions: {}", sessions_created);
    println!("Time: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_absent_flag_uses_default() {
        let args = argv(&["seed", "--rooms", "4"]);
        assert_eq!(arg(&args, "--hotels", 3u32).unwrap(), 3);
        assert_eq!(arg(&args, "--rooms", 6u32).unwrap(), 4);
    }

    #[test]
    fn test_unparsable_value_is_reported() {
        let args = argv(&["seed", "--hotels", "three", "--start", "2024-13-01"]);

        let err = arg(&args, "--hotels", 3u32).unwrap_err();
        assert!(err.to_string().contains("--hotels"));
        assert!(err.to_string().contains("three"));

        let today = Utc::now().date_naive();
        assert!(arg(&args, "--start", today).is_err());
    }

    #[test]
    fn test_flag_without_value_is_reported() {
        let args = argv(&["seed", "--days"]);
        assert!(arg(&args, "--days", 3u64).is_err());
    }
}
