use core::str::FromStr;

use serde::{Deserialize, Serialize};

use devtrack_core::DomainError;

/// Project-scoped role used for RBAC.
///
/// Closed set: new capabilities are expressed in the rule table
/// (`Action::allowed_roles`), not by adding roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Dev,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Dev, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Dev => "DEV",
            Role::Viewer => "VIEWER",
        }
    }

    /// Whether this role may hold a ticket assignment.
    pub fn can_be_assigned(&self) -> bool {
        !matches!(self, Role::Viewer)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "DEV" => Ok(Role::Dev),
            "VIEWER" => Ok(Role::Viewer),
            other => Err(DomainError::validation(format!(
                "unknown role '{other}' (expected ADMIN, DEV or VIEWER)"
            ))),
        }
    }
}
