//! REST API handlers

pub mod auth;
pub mod crypto;
pub mod health;
pub mod record;
