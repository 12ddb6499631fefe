use serde::{Deserialize, Serialize};

use devtrack_auth::Role;
use devtrack_core::{ProjectId, UserId};

/// The (user, project, role) relation. Unique per (user, project).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub role: Role,
}

/// A member listing row, joined with the user's email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberEntry {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_serializes_role_as_wire_name() {
        let m = Membership {
            user_id: UserId::new(),
            project_id: ProjectId::new(),
            role: Role::Dev,
        };
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["role"], "DEV");
    }
}
