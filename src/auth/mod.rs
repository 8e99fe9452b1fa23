// Authentication module
// Bearer JWT verification for customers and staff; tokens are issued by the identity service

pub mod error;
pub mod middleware;
pub mod token;

pub use error::AuthError;
pub use middleware::{AuthConfig, AuthenticatedUser, StaffUser};
pub use token::{Claims, TokenService};
