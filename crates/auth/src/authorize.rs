use serde::Serialize;
use thiserror::Error;

use devtrack_core::ProjectId;

use crate::{Action, Principal, Role};

/// Why an authorization request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotAMember,
    InsufficientRole,
    NotAssignee,
    NotAuthor,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NotAMember => "not_a_member",
            DenyReason::InsufficientRole => "insufficient_role",
            DenyReason::NotAssignee => "not_assignee",
            DenyReason::NotAuthor => "not_author",
        }
    }

    /// Human-readable explanation surfaced to API callers.
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NotAMember => "you are not a member of this project",
            DenyReason::InsufficientRole => "your project role does not allow this action",
            DenyReason::NotAssignee => "only the assignee may move this ticket",
            DenyReason::NotAuthor => "only the author may change this comment",
        }
    }
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("forbidden: {0}")]
pub struct AuthzError(pub DenyReason);

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AuthzError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AuthzError(reason)),
        }
    }
}

/// What the Membership Registry knows about a principal in one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub project_id: ProjectId,
    pub role: Option<Role>,
}

impl ProjectAccess {
    pub fn new(project_id: ProjectId, role: Option<Role>) -> Self {
        Self { project_id, role }
    }
}

/// Decide whether `principal` may perform `action` in the project described by `access`.
///
/// - No IO
/// - No panics
/// - No caching: callers re-check on every operation
///
/// The coarse role table is consulted first; the assignee and author grants
/// are evaluated as additional predicates and OR-ed in.
pub fn authorize(principal: &Principal, access: &ProjectAccess, action: &Action) -> Decision {
    match action {
        Action::EditComment { author } | Action::DeleteComment { author } => {
            return if *author == principal.id {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotAuthor)
            };
        }
        _ => {}
    }

    let is_assignee = matches!(action, Action::MoveTicket { assignee: Some(a) } if *a == principal.id);

    let Some(role) = access.role else {
        // The assignee grant does not depend on a role.
        return if is_assignee {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::NotAMember)
        };
    };

    if action.allowed_roles().contains(&role) || is_assignee {
        return Decision::Allow;
    }

    match action {
        Action::MoveTicket { .. } => Decision::Deny(DenyReason::NotAssignee),
        _ => Decision::Deny(DenyReason::InsufficientRole),
    }
}
