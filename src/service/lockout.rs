//! Account lockout tracking
//!
//! Counts failed login attempts per login id and locks the account once
//! the budget is spent. Locks expire on their own; a successful login
//! clears the counter.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Default, Clone)]
struct AttemptState {
    failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// Process-local failed-attempt tracker
pub struct LockoutTracker {
    max_attempts: u32,
    duration: Duration,
    state: Mutex<HashMap<String, AttemptState>>,
}

impl LockoutTracker {
    pub fn new(config: LockoutConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            duration: Duration::seconds(config.duration_secs as i64),
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Fail fast when the account is locked. Expired locks are dropped here.
    pub fn check(&self, login_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(entry) = state.get(login_id) else {
            return Ok(());
        };

        match entry.locked_until {
            Some(until) if until > Utc::now() => {
                let remaining_mins = ((until - Utc::now()).num_seconds() + 59) / 60;
                Err(AppError::Unauthorized(format!(
                    "Account locked; try again in {} minute(s)",
                    remaining_mins
                )))
            }
            Some(_) => {
                // Lock has lapsed; start over
                state.remove(login_id);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Record a failed attempt; the budget's last failure locks the account
    pub fn record_failure(&self, login_id: &str) {
        let mut state = self.state.lock().unwrap();
        let entry = state.entry(login_id.to_string()).or_default();
        entry.failures += 1;

        if entry.failures >= self.max_attempts {
            entry.locked_until = Some(Utc::now() + self.duration);
            tracing::warn!(login_id, failures = entry.failures, "Account locked");
            metrics::counter!("clinigate_account_lockouts_total").increment(1);
        }
    }

    /// Successful login wipes the slate
    pub fn clear(&self, login_id: &str) {
        self.state.lock().unwrap().remove(login_id);
    }
}
