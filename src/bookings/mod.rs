// Booking module
// Calculation engine, state machine, audit log and the service tying them together

pub mod calculator;
pub mod error;
pub mod handlers;
pub mod incentives;
pub mod models;
pub mod repository;
pub mod role_policy;
pub mod service;
pub mod status_machine;
pub mod store;
pub mod sync;
pub mod tracker;
pub mod workflow;

pub use calculator::{BookingCalculator, CalculationResult, ClientTotals, PricedLine};
pub use error::{BookingError, BookingResult, LimitScope};
pub use incentives::{IncentiveBatchRequest, IncentiveEntry, IncentiveEntryRequest};
pub use models::{
    AssignedUser, Booking, BookingDetail, BookingItem, BookingMutationRequest, BookingStatus,
    BulkAction, BulkUpdateRequest, CalculationRequest, ClientAction, ClientBookingRequest,
    CreateBookingRequest, CustomerStatus, ItemRequest, MutationKind, PaymentMethod,
    PaymentStatus, UserAccount,
};
pub use repository::PgBookingStore;
pub use role_policy::{CachedRolePolicy, PgRoleStatusPolicySource, RoleStatusPolicy, RoleStatusPolicySource};
pub use service::BookingService;
pub use status_machine::StatusMachine;
pub use store::{BookingChangeSet, BookingStore};
pub use tracker::{TrackerAction, TrackerEntry};
