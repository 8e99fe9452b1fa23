use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use labbook_api::{
    auth::AuthConfig,
    bookings::{BookingService, CachedRolePolicy, PgBookingStore, PgRoleStatusPolicySource},
    catalog::PgProductCatalog,
    config::AppConfig,
    coupons::PgCouponStore,
    create_router, db,
    invoice::{HttpInvoiceGenerator, InvoiceGenerator, LogInvoiceGenerator},
    notifications::{
        LogNotificationSender, NotificationSender, OutboxWorker, PgOutboxStore,
        WebhookNotificationSender,
    },
    payments::{HttpPaymentGateway, PaymentGateway, UnconfiguredGateway},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Lab Booking API - Starting...");

    let config = AppConfig::from_env().context("invalid configuration")?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url)
        .await
        .context("failed to create database pool")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let gateway: Arc<dyn PaymentGateway> = match config.gateway.clone() {
        Some(gateway) => Arc::new(HttpPaymentGateway::new(gateway)),
        None => {
            tracing::warn!("No payment gateway configured; online payments will be rejected");
            Arc::new(UnconfiguredGateway)
        }
    };
    let invoices: Arc<dyn InvoiceGenerator> = match &config.invoice_service_url {
        Some(url) => Arc::new(HttpInvoiceGenerator::new(url.clone())),
        None => Arc::new(LogInvoiceGenerator),
    };
    let sender: Arc<dyn NotificationSender> = match &config.notification_webhook_url {
        Some(url) => Arc::new(WebhookNotificationSender::new(url.clone())),
        None => {
            tracing::info!("No notification webhook configured; notifications are logged only");
            Arc::new(LogNotificationSender)
        }
    };

    let coupons = Arc::new(PgCouponStore::new(pool.clone()));
    let role_policy = Arc::new(CachedRolePolicy::with_ttl(
        Arc::new(PgRoleStatusPolicySource::new(pool.clone())),
        config.policy_cache_ttl,
    ));
    let bookings = BookingService::new(
        Arc::new(PgBookingStore::new(pool.clone())),
        Arc::new(PgProductCatalog::new(pool.clone())),
        coupons.clone(),
        role_policy,
        gateway,
        invoices,
    );

    let worker = OutboxWorker::new(Arc::new(PgOutboxStore::new(pool.clone())), sender, &config.outbox);
    tokio::spawn(worker.run());
    tracing::info!("Notification outbox worker started");

    let app = create_router(AppState {
        bookings: Arc::new(bookings),
        coupons,
        auth: AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
        },
        payment_webhook_secret: config.payment_webhook_secret.clone(),
    });

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Lab Booking API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
