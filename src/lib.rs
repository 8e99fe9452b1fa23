// Lab booking and CRM backend
// Library root: module tree, shared state and the HTTP router

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod config;
pub mod coupons;
pub mod db;
pub mod error;
pub mod invoice;
pub mod notifications;
pub mod payments;
pub mod validation;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::AuthConfig;
use bookings::BookingService;
use coupons::CouponStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub coupons: Arc<dyn CouponStore>,
    pub auth: AuthConfig,
    pub payment_webhook_secret: Option<String>,
}

impl FromRef<AppState> for AuthConfig {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        bookings::handlers::calculate_booking_handler,
        bookings::handlers::create_booking_handler,
        bookings::handlers::get_booking_handler,
        bookings::handlers::update_booking_handler,
        bookings::handlers::bulk_update_booking_handler,
        bookings::handlers::client_booking_handler,
        bookings::handlers::add_incentives_handler,
        bookings::handlers::booking_actions_handler,
        coupons::handlers::validate_coupon_handler,
        payments::handlers::payment_webhook_handler,
        payments::handlers::refresh_payment_handler,
        payments::handlers::sync_payment_handler,
    ),
    components(
        schemas(
            bookings::Booking,
            bookings::BookingItem,
            bookings::BookingDetail,
            bookings::AssignedUser,
            bookings::BookingStatus,
            bookings::CustomerStatus,
            bookings::PaymentStatus,
            bookings::PaymentMethod,
            bookings::ItemRequest,
            bookings::CalculationRequest,
            bookings::CalculationResult,
            bookings::PricedLine,
            bookings::CreateBookingRequest,
            bookings::MutationKind,
            bookings::BookingMutationRequest,
            bookings::BulkAction,
            bookings::BulkUpdateRequest,
            bookings::ClientAction,
            bookings::ClientBookingRequest,
            bookings::IncentiveEntryRequest,
            bookings::IncentiveBatchRequest,
            bookings::IncentiveEntry,
            bookings::TrackerAction,
            bookings::TrackerEntry,
            catalog::ProductKind,
            coupons::DiscountKind,
            coupons::CouponValidationRequest,
            coupons::CouponValidationResponse,
            payments::BookingPayment,
            payments::GatewayWebhookPayload,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "bookings", description = "Booking calculation, lifecycle and audit endpoints"),
        (name = "client", description = "Customer self-service endpoints"),
        (name = "coupons", description = "Coupon validation"),
        (name = "payments", description = "Payment gateway callbacks and sync")
    ),
    info(
        title = "Lab Booking API",
        version = "1.0.0",
        description = "Lab test booking and CRM backend"
    )
)]
pub struct ApiDoc;

/// Build the application router with every route and the Swagger UI
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/bookings", post(bookings::handlers::create_booking_handler))
        .route(
            "/api/bookings/calculate",
            post(bookings::handlers::calculate_booking_handler),
        )
        .route(
            "/api/bookings/:id",
            get(bookings::handlers::get_booking_handler)
                .patch(bookings::handlers::update_booking_handler),
        )
        .route(
            "/api/bookings/:id/bulk",
            patch(bookings::handlers::bulk_update_booking_handler),
        )
        .route(
            "/api/bookings/:id/incentives",
            post(bookings::handlers::add_incentives_handler),
        )
        .route(
            "/api/bookings/:id/actions",
            get(bookings::handlers::booking_actions_handler),
        )
        .route(
            "/api/bookings/:id/payments/refresh",
            post(payments::handlers::refresh_payment_handler),
        )
        .route(
            "/api/bookings/:id/payments/sync",
            post(payments::handlers::sync_payment_handler),
        )
        .route(
            "/api/client/bookings/:id",
            patch(bookings::handlers::client_booking_handler),
        )
        .route(
            "/api/coupons/validate",
            post(coupons::handlers::validate_coupon_handler),
        )
        .route(
            "/api/payments/webhook",
            post(payments::handlers::payment_webhook_handler),
        )
        .with_state(state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .layer(CorsLayer::permissive())
}
