//! CliniGate - Tenant Security Core
//!
//! Request authentication, tenant isolation, rate governance, token
//! revocation, and field encryption for a multi-tenant clinical records
//! platform.

pub mod api;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod repository;
pub mod revocation;
pub mod server;
pub mod service;
pub mod telemetry;
pub mod tenant;
pub mod token;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
