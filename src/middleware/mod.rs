//! Request pipeline middleware
//!
//! Layer order per request: rate limiting, then authentication, then the
//! per-route role gate.

pub mod auth;
pub mod rate_limit;
pub mod require_role;

pub use auth::{authenticate, AuthState, CurrentUser};
pub use rate_limit::{rate_limit, RateLimiter};
pub use require_role::{require_role, RoleGate};
