//! Platform roles

use serde::{Deserialize, Serialize};

/// Role carried by an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Platform operator; bypasses tenant scoping
    Admin,
    Doctor,
    Nurse,
    /// Institution front-desk staff
    Staff,
    Patient,
    /// Account created but not yet approved by an institution
    Wait,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Nurse => "NURSE",
            Role::Staff => "STAFF",
            Role::Patient => "PATIENT",
            Role::Wait => "WAIT",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "DOCTOR" => Ok(Role::Doctor),
            "NURSE" => Ok(Role::Nurse),
            "STAFF" => Ok(Role::Staff),
            "PATIENT" => Ok(Role::Patient),
            "WAIT" => Ok(Role::Wait),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
