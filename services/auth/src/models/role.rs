//! Role model and related functionality

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level of a user.
///
/// Ordinals leave a gap below `Admin` for intermediate roles. Privileged
/// operations compare for equality with `Admin`, not for "at least".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest = 0,
    Unverified = 1,
    #[default]
    Normal = 2,
    Admin = 100,
}

impl Role {
    /// Numeric value used for persistence
    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn from_value(value: i64) -> Option<Role> {
        match value {
            0 => Some(Role::Guest),
            1 => Some(Role::Unverified),
            2 => Some(Role::Normal),
            100 => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Guest => "guest",
            Role::Unverified => "unverified",
            Role::Normal => "normal",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "unverified" => Ok(Role::Unverified),
            "normal" => Ok(Role::Normal),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}
