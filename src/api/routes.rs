//! API Routes
//!
//! HTTP endpoint definitions. Every route here requires a session; the
//! authenticated user arrives in a [`RequestContext`] extension.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::domain::{
    Activity, ActivityId, ActivityType, Booking, BookingId, Hotel, HotelId, Payment,
    RequestContext, TicketType,
};
use crate::error::AppResult;
use crate::handlers::{
    ActivityHandler, BookRoomCommand, BookingHandler, BookingStatus, BookingView,
    CreateTicketCommand, EnrollActivityCommand, HotelHandler, HotelWithRooms, PaymentHandler,
    RecordPaymentCommand, RoomAvailability, TicketHandler, TicketWithType,
};
use crate::state::AppState;

// =========================================================================
// API Router
// =========================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Activities
        .route("/activity", get(list_activity_types).post(enroll_activity))
        .route("/activity/:activity_id", delete(cancel_activity))
        // Booking
        .route("/booking", get(get_booking).post(book_room))
        .route("/booking/:booking_id", put(change_booking))
        // Hotels
        .route("/hotels", get(list_hotels))
        .route("/hotels/:hotel_id", get(get_hotel_with_rooms))
        .route("/hotels/rooms/:hotel_id", get(get_room_availability))
        // Payments
        .route("/payments/process", post(process_payment))
        // Tickets
        .route("/tickets", get(get_ticket).post(create_ticket))
        .route("/tickets/types", get(list_ticket_types))
}

// =========================================================================
// /activity
// =========================================================================

/// Sessions open to the user, by date then id
async fn list_activity_types(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
) -> AppResult<Json<Vec<ActivityType>>> {
    let types = ActivityHandler::new(&state)
        .list_activity_types(request.user_id)
        .await?;

    Ok(Json(types))
}

async fn enroll_activity(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Json(command): Json<EnrollActivityCommand>,
) -> AppResult<(StatusCode, Json<Activity>)> {
    let activity = ActivityHandler::new(&state)
        .enroll(request.user_id, command.activity_type_id)
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

async fn cancel_activity(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Path(activity_id): Path<ActivityId>,
) -> AppResult<StatusCode> {
    ActivityHandler::new(&state)
        .cancel(request.user_id, activity_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// /booking
// =========================================================================

async fn get_booking(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
) -> AppResult<Json<BookingView>> {
    let view = BookingHandler::new(&state).find_for_user(request.user_id).await?;
    Ok(Json(view))
}

/// 201 when a booking was created or moved, 200 when nothing changed
async fn book_room(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Json(command): Json<BookRoomCommand>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let outcome = BookingHandler::new(&state)
        .book(request.user_id, command.room_id)
        .await?;

    let status = match outcome.status {
        BookingStatus::Unchanged => StatusCode::OK,
        BookingStatus::Created | BookingStatus::Moved => StatusCode::CREATED,
    };

    Ok((status, Json(outcome.booking)))
}

async fn change_booking(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Path(booking_id): Path<BookingId>,
    Json(command): Json<BookRoomCommand>,
) -> AppResult<Json<Booking>> {
    let outcome = BookingHandler::new(&state)
        .change(request.user_id, booking_id, command.room_id)
        .await?;

    Ok(Json(outcome.booking))
}

// =========================================================================
// /hotels
// =========================================================================

async fn list_hotels(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
) -> AppResult<Json<Vec<Hotel>>> {
    let hotels = HotelHandler::new(&state).list_hotels(request.user_id).await?;
    Ok(Json(hotels))
}

async fn get_hotel_with_rooms(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Path(hotel_id): Path<HotelId>,
) -> AppResult<Json<HotelWithRooms>> {
    let hotel = HotelHandler::new(&state)
        .hotel_with_rooms(request.user_id, hotel_id)
        .await?;

    Ok(Json(hotel))
}

async fn get_room_availability(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Path(hotel_id): Path<HotelId>,
) -> AppResult<Json<Vec<RoomAvailability>>> {
    let rooms = HotelHandler::new(&state)
        .room_availability(request.user_id, hotel_id)
        .await?;

    Ok(Json(rooms))
}

// =========================================================================
// /payments
// =========================================================================

async fn process_payment(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Json(command): Json<RecordPaymentCommand>,
) -> AppResult<Json<Payment>> {
    let payment = PaymentHandler::new(&state)
        .execute(request.user_id, command)
        .await?;

    Ok(Json(payment))
}

// =========================================================================
// /tickets
// =========================================================================

async fn list_ticket_types(State(state): State<AppState>) -> AppResult<Json<Vec<TicketType>>> {
    let types = TicketHandler::new(&state).list_ticket_types().await?;
    Ok(Json(types))
}

async fn get_ticket(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
) -> AppResult<Json<TicketWithType>> {
    let ticket = TicketHandler::new(&state).find_for_user(request.user_id).await?;
    Ok(Json(ticket))
}

async fn create_ticket(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Json(command): Json<CreateTicketCommand>,
) -> AppResult<(StatusCode, Json<TicketWithType>)> {
    let ticket = TicketHandler::new(&state)
        .purchase(request.user_id, command)
        .await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}
