// Payment module
// Payment records, the hosted-link gateway and its signed webhook

pub mod gateway;
pub mod handlers;
pub mod models;
pub mod webhook;

pub use gateway::{map_gateway_status, HttpPaymentGateway, PaymentGateway, UnconfiguredGateway};
pub use models::{BookingPayment, GatewayWebhookPayload, LinkStatus, PaymentContact, PaymentLink};
