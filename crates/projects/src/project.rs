use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devtrack_auth::Role;
use devtrack_core::{DomainResult, ProjectId, UserId, bounded_text};

pub const MAX_NAME_LEN: usize = 200;

/// A project: the unit of tenancy for tickets and memberships.
///
/// Ownership alone grants nothing; the creator is enrolled as an ADMIN
/// member when the project is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Validated input for project creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

impl NewProject {
    pub fn new(name: &str, description: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            name: bounded_text("name", name, MAX_NAME_LEN)?,
            description: description.unwrap_or_default().trim().to_string(),
        })
    }

    pub fn into_project(self, owner_id: UserId, created_at: DateTime<Utc>) -> Project {
        Project {
            id: ProjectId::new(),
            name: self.name,
            description: self.description,
            owner_id,
            created_at,
        }
    }
}

/// Partial update of project metadata; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ProjectPatch {
    /// Apply the patch, validating any new name.
    pub fn apply(&self, project: &mut Project) -> DomainResult<()> {
        if let Some(name) = &self.name {
            project.name = bounded_text("name", name, MAX_NAME_LEN)?;
        }
        if let Some(description) = &self.description {
            project.description = description.trim().to_string();
        }
        Ok(())
    }
}

/// A project as seen from one member's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project: Project,
    pub role: Role,
}
