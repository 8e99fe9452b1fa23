// Coupon module
// Coupon rules, discount evaluation, redemption bookkeeping and the validate endpoint

pub mod evaluator;
pub mod handlers;
pub mod models;
pub mod repository;

pub use evaluator::{CouponEvaluator, CouponUsage};
pub use handlers::validate_coupon_handler;
pub use models::{
    Coupon, CouponRedemption, CouponValidationRequest, CouponValidationResponse, DiscountKind,
    NewRedemption,
};
pub use repository::{CouponStore, PgCouponStore};
