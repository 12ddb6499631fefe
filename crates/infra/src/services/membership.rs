//! Membership registry: the (user, project, role) relation.
//!
//! Every function runs inside the caller's [`StoreTx`], so a role read for an
//! authorization decision and the write it guards see the same snapshot. The
//! registry itself performs no authorization; services pair
//! [`project_access`] with [`ensure`] before touching a project.

use tracing::{info, warn};

use devtrack_auth::{Action, Decision, Principal, ProjectAccess, Role, authorize};
use devtrack_core::{ProjectId, UserId, normalize_email};
use devtrack_projects::{MemberEntry, Membership, ProjectSummary};

use crate::store::StoreTx;

use super::ServiceError;

/// At most one role per (user, project).
pub(crate) async fn get_role(
    tx: &mut dyn StoreTx,
    user: UserId,
    project: ProjectId,
) -> Result<Option<Role>, ServiceError> {
    Ok(tx.role_of(user, project).await?)
}

/// Insert a membership. A second one for the same pair is `DuplicateMembership`.
pub(crate) async fn enroll(tx: &mut dyn StoreTx, membership: &Membership) -> Result<(), ServiceError> {
    tx.insert_membership(membership).await?;
    info!(
        user_id = %membership.user_id,
        project_id = %membership.project_id,
        role = %membership.role,
        "member enrolled"
    );
    Ok(())
}

/// Enroll an existing user, found by email.
///
/// A malformed or unknown email is `NotFound("user")`; a missing project is
/// `NotFound("project")`.
pub(crate) async fn add_member(
    tx: &mut dyn StoreTx,
    project: ProjectId,
    email: &str,
    role: Role,
) -> Result<Membership, ServiceError> {
    if tx.project_by_id(project).await?.is_none() {
        return Err(ServiceError::NotFound("project"));
    }
    let Ok(email) = normalize_email(email) else {
        return Err(ServiceError::NotFound("user"));
    };
    let user = tx
        .user_by_email(&email)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;

    let membership = Membership {
        user_id: user.id,
        project_id: project,
        role,
    };
    enroll(tx, &membership).await?;
    Ok(membership)
}

/// Members of a project in enrollment order, with their email.
pub(crate) async fn list_members(
    tx: &mut dyn StoreTx,
    project: ProjectId,
) -> Result<Vec<MemberEntry>, ServiceError> {
    Ok(tx.members_of(project).await?)
}

/// Every project the user belongs to, with their role in it.
pub(crate) async fn list_projects_for(
    tx: &mut dyn StoreTx,
    user: UserId,
) -> Result<Vec<ProjectSummary>, ServiceError> {
    Ok(tx.projects_of(user).await?)
}

/// The principal's standing in a project.
pub(crate) async fn project_access(
    tx: &mut dyn StoreTx,
    principal: &Principal,
    project: ProjectId,
) -> Result<ProjectAccess, ServiceError> {
    let role = get_role(tx, principal.id, project).await?;
    Ok(ProjectAccess::new(project, role))
}

/// Authorize or fail with `Forbidden`, logging the denial.
pub(crate) fn ensure(
    principal: &Principal,
    access: &ProjectAccess,
    action: &Action,
) -> Result<(), ServiceError> {
    match authorize(principal, access, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            warn!(
                user_id = %principal.id,
                project_id = %access.project_id,
                action = action.name(),
                reason = %reason,
                "authorization denied"
            );
            Err(ServiceError::Forbidden(reason))
        }
    }
}
