//! Data access layer (Repository pattern)
//!
//! Every store sits behind an async trait so external storage can replace
//! the in-memory implementations without touching the pipeline or the
//! services.

pub mod membership;
pub mod record;
pub mod refresh_token;
pub mod user;

pub use membership::{InMemoryMembershipRepository, MembershipRepository};
pub use record::{InMemoryRecordRepository, RecordRepository};
pub use refresh_token::{InMemoryRefreshTokenRepository, RefreshTokenRepository};
pub use user::{InMemoryUserRepository, UserRepository};
