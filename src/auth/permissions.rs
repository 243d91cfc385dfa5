//! Permission levels for API authorization

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission levels carried in JWT claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum PermissionLevel {
    /// No authentication - health/version probes only
    Public = 0,
    /// Authenticated student - normal application workflow
    #[default]
    Authenticated = 1,
    /// Admin - catalog import and seeding
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Public => write!(f, "PUBLIC"),
            PermissionLevel::Authenticated => write!(f, "AUTHENTICATED"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(PermissionLevel::Admin > PermissionLevel::Authenticated);
        assert!(PermissionLevel::Authenticated > PermissionLevel::Public);
    }

    #[test]
    fn test_serde_uppercase() {
        let json = serde_json::to_string(&PermissionLevel::Admin).unwrap();
        assert_eq!(json, r#""ADMIN""#);
        let level: PermissionLevel = serde_json::from_str(r#""AUTHENTICATED""#).unwrap();
        assert_eq!(level, PermissionLevel::Authenticated);
    }
}
