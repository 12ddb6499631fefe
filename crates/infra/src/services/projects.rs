use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use devtrack_auth::{Action, Principal, Role};
use devtrack_core::ProjectId;
use devtrack_projects::{MemberEntry, Membership, NewProject, Project, ProjectPatch, ProjectSummary};

use crate::store::Database;

use super::ServiceError;
use super::membership::{self, enroll, ensure, project_access};

/// Project lifecycle and role-gated member administration.
pub struct ProjectService {
    db: Arc<dyn Database>,
}

impl ProjectService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Create a project and enroll the creator as its ADMIN, atomically.
    #[instrument(skip(self, principal, input), fields(user_id = %principal.id), err)]
    pub async fn create(&self, principal: &Principal, input: NewProject) -> Result<Project, ServiceError> {
        let project = input.into_project(principal.id, Utc::now());

        let mut tx = self.db.begin().await?;
        tx.insert_project(&project).await?;
        enroll(
            tx.as_mut(),
            &Membership {
                user_id: principal.id,
                project_id: project.id,
                role: Role::Admin,
            },
        )
        .await?;
        tx.commit().await?;

        info!(project_id = %project.id, "project created");
        Ok(project)
    }

    /// Every project the principal belongs to, with their role in it.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<ProjectSummary>, ServiceError> {
        let mut tx = self.db.begin().await?;
        membership::list_projects_for(tx.as_mut(), principal.id).await
    }

    #[instrument(skip(self, principal), fields(user_id = %principal.id), err)]
    pub async fn get(&self, principal: &Principal, project_id: ProjectId) -> Result<Project, ServiceError> {
        let mut tx = self.db.begin().await?;
        let access = project_access(tx.as_mut(), principal, project_id).await?;
        ensure(principal, &access, &Action::ViewProject)?;
        tx.project_by_id(project_id)
            .await?
            .ok_or(ServiceError::NotFound("project"))
    }

    #[instrument(skip(self, principal, patch), fields(user_id = %principal.id), err)]
    pub async fn update(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Project, ServiceError> {
        let mut tx = self.db.begin().await?;
        let access = project_access(tx.as_mut(), principal, project_id).await?;
        ensure(principal, &access, &Action::UpdateProject)?;

        let mut project = tx
            .project_by_id(project_id)
            .await?
            .ok_or(ServiceError::NotFound("project"))?;
        patch.apply(&mut project)?;
        tx.update_project(&project).await?;
        tx.commit().await?;

        info!("project updated");
        Ok(project)
    }

    #[instrument(skip(self, principal), fields(user_id = %principal.id), err)]
    pub async fn delete(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;
        let access = project_access(tx.as_mut(), principal, project_id).await?;
        ensure(principal, &access, &Action::DeleteProject)?;

        if !tx.delete_project(project_id).await? {
            return Err(ServiceError::NotFound("project"));
        }
        tx.commit().await?;

        info!("project deleted");
        Ok(())
    }

    /// Enroll an existing user, found by email, with `role`. ADMIN only.
    #[instrument(skip(self, principal, email), fields(user_id = %principal.id), err)]
    pub async fn add_member(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        email: &str,
        role: Role,
    ) -> Result<Membership, ServiceError> {
        let mut tx = self.db.begin().await?;
        let access = project_access(tx.as_mut(), principal, project_id).await?;
        ensure(principal, &access, &Action::AddMember)?;

        let enrolled = membership::add_member(tx.as_mut(), project_id, email, role).await?;
        tx.commit().await?;
        Ok(enrolled)
    }

    pub async fn list_members(
        &self,
        principal: &Principal,
        project_id: ProjectId,
    ) -> Result<Vec<MemberEntry>, ServiceError> {
        let mut tx = self.db.begin().await?;
        let access = project_access(tx.as_mut(), principal, project_id).await?;
        ensure(principal, &access, &Action::ListMembers)?;
        membership::list_members(tx.as_mut(), project_id).await
    }
}
