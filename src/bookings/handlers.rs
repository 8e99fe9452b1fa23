// HTTP handlers for booking endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, StaffUser};
use crate::AppState;

use super::calculator::CalculationResult;
use super::error::BookingResult;
use super::incentives::{IncentiveBatchRequest, IncentiveEntry};
use super::models::{
    BookingDetail, BookingMutationRequest, BulkUpdateRequest, CalculationRequest,
    ClientBookingRequest, CreateBookingRequest,
};
use super::tracker::TrackerEntry;

/// Handler for POST /api/bookings/calculate
/// Prices a prospective booking and cross-checks the client's totals
#[utoipa::path(
    post,
    path = "/api/bookings/calculate",
    request_body = CalculationRequest,
    responses(
        (status = 200, description = "Totals recomputed from catalog prices", body = CalculationResult),
        (status = 400, description = "Invalid items, coupon or totals outside tolerance"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn calculate_booking_handler(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<CalculationRequest>,
) -> BookingResult<Json<CalculationResult>> {
    let result = state.bookings.preview(request).await?;
    Ok(Json(result))
}

/// Handler for POST /api/bookings
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingDetail),
        (status = 400, description = "Invalid items, coupon or totals outside tolerance"),
        (status = 403, description = "Non-staff caller booking for another user")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn create_booking_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBookingRequest>,
) -> BookingResult<(StatusCode, Json<BookingDetail>)> {
    let detail = state.bookings.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Handler for GET /api/bookings/{id}
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking with items and assigned staff", body = BookingDetail),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn get_booking_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> BookingResult<Json<BookingDetail>> {
    let detail = state.bookings.get(&user, id).await?;
    Ok(Json(detail))
}

/// Handler for PATCH /api/bookings/{id}
/// Applies one CRM mutation (staff only)
#[utoipa::path(
    patch,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = BookingMutationRequest,
    responses(
        (status = 200, description = "Mutation applied", body = BookingDetail),
        (status = 400, description = "Invalid mutation"),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Booking closed or modified concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn update_booking_handler(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    Json(request): Json<BookingMutationRequest>,
) -> BookingResult<Json<BookingDetail>> {
    let detail = state.bookings.mutate(&user, id, request).await?;
    Ok(Json(detail))
}

/// Handler for PATCH /api/bookings/{id}/bulk
#[utoipa::path(
    patch,
    path = "/api/bookings/{id}/bulk",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = BulkUpdateRequest,
    responses(
        (status = 200, description = "All actions applied", body = BookingDetail),
        (status = 400, description = "Invalid action payload"),
        (status = 409, description = "Booking closed or modified concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn bulk_update_booking_handler(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    Json(request): Json<BulkUpdateRequest>,
) -> BookingResult<Json<BookingDetail>> {
    let detail = state.bookings.bulk_update(&user, id, request).await?;
    Ok(Json(detail))
}

/// Handler for PATCH /api/client/bookings/{id}
/// Customer reschedule or cancel
#[utoipa::path(
    patch,
    path = "/api/client/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = ClientBookingRequest,
    responses(
        (status = 200, description = "Action applied", body = BookingDetail),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Booking closed")
    ),
    security(("bearer_auth" = [])),
    tag = "client"
)]
pub async fn client_booking_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ClientBookingRequest>,
) -> BookingResult<Json<BookingDetail>> {
    let detail = state.bookings.client_action(&user, id, request).await?;
    Ok(Json(detail))
}

/// Handler for POST /api/bookings/{id}/incentives
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/incentives",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = IncentiveBatchRequest,
    responses(
        (status = 201, description = "Batch recorded", body = Vec<IncentiveEntry>),
        (status = 400, description = "Invalid amounts or total above final amount"),
        (status = 409, description = "Booking cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn add_incentives_handler(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    Json(request): Json<IncentiveBatchRequest>,
) -> BookingResult<(StatusCode, Json<Vec<IncentiveEntry>>)> {
    let entries = state.bookings.add_incentives(&user, id, request).await?;
    Ok((StatusCode::CREATED, Json(entries)))
}

/// Handler for GET /api/bookings/{id}/actions
#[utoipa::path(
    get,
    path = "/api/bookings/{id}/actions",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Audit timeline, newest first", body = Vec<TrackerEntry>),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn booking_actions_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> BookingResult<Json<Vec<TrackerEntry>>> {
    let entries = state.bookings.actions(&user, id).await?;
    Ok(Json(entries))
}
