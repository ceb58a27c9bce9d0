//! Common test utilities
//!
//! Factories over the in-memory store and a request helper for the router.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::util::ServiceExt;

use event_booking::api;
use event_booking::domain::{
    ActivityType, Enrollment, Hotel, Room, Ticket, TicketStatus, TicketType, UserId,
};
use event_booking::store::MemoryStore;
use event_booking::AppState;

/// A user with a registered session
pub struct TestUser {
    pub id: UserId,
    pub token: String,
}

pub fn create_user(store: &MemoryStore) -> TestUser {
    let id = store.create_user();
    let token = format!("session-{}-{}", id, uuid::Uuid::new_v4());
    store.create_session(id, &token);
    TestUser { id, token }
}

pub fn create_enrollment(store: &MemoryStore, user: &TestUser) -> Enrollment {
    store.create_enrollment(user.id)
}

/// On-site ticket type that includes a hotel stay
pub fn create_ticket_type_with_hotel(store: &MemoryStore) -> TicketType {
    store.create_ticket_type("Presencial + Hotel", dec!(600), false, true)
}

/// On-site ticket type without lodging
pub fn create_ticket_type_without_hotel(store: &MemoryStore) -> TicketType {
    store.create_ticket_type("Presencial", dec!(250), false, false)
}

pub fn create_ticket_type_remote(store: &MemoryStore) -> TicketType {
    store.create_ticket_type("Online", dec!(100), true, false)
}

pub fn create_ticket(
    store: &MemoryStore,
    enrollment: &Enrollment,
    ticket_type: &TicketType,
    status: TicketStatus,
) -> Ticket {
    store.create_ticket(enrollment.id, ticket_type.id, status)
}

pub fn create_hotel(store: &MemoryStore) -> Hotel {
    store.create_hotel("Driven Resort")
}

pub fn create_room(store: &MemoryStore, hotel: &Hotel, capacity: u32) -> Room {
    store.create_room(hotel.id, capacity)
}

pub fn create_activity_type(store: &MemoryStore, capacity: u32) -> ActivityType {
    let date = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();
    store.create_activity_type("Palestra: Rust na prática", "09:00 - 10:00", capacity, date)
}

/// Enrolled user with a paid hotel ticket and a booked room
pub fn create_lodged_user(store: &MemoryStore) -> TestUser {
    let user = create_user(store);
    let enrollment = create_enrollment(store, &user);
    let ticket_type = create_ticket_type_with_hotel(store);
    create_ticket(store, &enrollment, &ticket_type, TicketStatus::Paid);
    let hotel = create_hotel(store);
    let room = create_room(store, &hotel, 3);
    store.create_booking(user.id, room.id);
    user
}

/// Router over `store`, with the ledger loaded from whatever was seeded
pub async fn app(store: &MemoryStore) -> Router {
    let state = tokio_test::assert_ok!(AppState::bootstrap(Arc::new(store.clone())).await);
    api::build_app(state)
}

/// Send one request and decode the JSON body (Null when empty or not JSON)
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, value)
}
