//! Domain models for CliniGate

pub mod record;
pub mod role;
pub mod user;

pub use record::*;
pub use role::*;
pub use user::*;
