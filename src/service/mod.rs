//! Business logic layer

pub mod auth;
pub mod lockout;
pub mod record;

pub use auth::AuthService;
pub use lockout::LockoutTracker;
pub use record::RecordService;
